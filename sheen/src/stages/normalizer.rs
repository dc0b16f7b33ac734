use glam::uvec3;

use crate::{
    gpu, Dispatch, Kernel, ProbeLayout, Resource, ResourceState, Result, Slot,
    Substrate,
};

/// Divides the final aggregate by its total weight.
///
/// The result is written into the slot opposite to parity (together with a
/// unit weight) and the parity is flipped, so that it designates the
/// normalized coefficients. An aggregate whose weight is not a positive number
/// is reported through [`Resource::Status`] (and, by substrates that can tell
/// it synchronously, as [`crate::Error::InvalidAggregate`]).
#[derive(Debug)]
pub struct Normalizer {
    group_size: u32,
}

impl Normalizer {
    pub fn new(layout: &ProbeLayout) -> Self {
        Self {
            group_size: layout.group_size,
        }
    }

    pub fn run<S>(
        &self,
        substrate: &mut S,
        order: u32,
        parity: &mut Slot,
    ) -> Result<()>
    where
        S: Substrate,
    {
        let src = *parity;
        let dst = src.flipped();
        let params = gpu::NormalizationPassParams::new(order);
        let groups = params.band_count().div_ceil(self.group_size);

        for res in [
            Resource::Coefficients(dst),
            Resource::Weights(dst),
            Resource::Status,
        ] {
            substrate.transition(res, ResourceState::ShaderWrite);
        }

        for res in [Resource::Coefficients(src), Resource::Weights(src)] {
            substrate.transition(res, ResourceState::ShaderRead);
        }

        substrate.dispatch(Dispatch {
            kernel: Kernel::ShNormalization,
            inputs: &[Resource::Coefficients(src), Resource::Weights(src)],
            outputs: &[
                Resource::Coefficients(dst),
                Resource::Weights(dst),
                Resource::Status,
            ],
            params: bytemuck::bytes_of(&params),
            groups: uvec3(groups, 1, 1),
        })?;

        parity.flip();

        Ok(())
    }
}
