use glam::uvec3;
use log::trace;

use crate::{
    gpu, Dispatch, Kernel, ProbeLayout, Resource, ResourceState, Result, Slot,
    Substrate,
};

/// Sums partial sums up, `G` at a time, until a single aggregate remains.
///
/// Each iteration reads from the slot designated by parity and writes into
/// the other one (never in place), then flips the parity. When the projection
/// produced just one group, no iteration happens and the aggregate stays in
/// slot zero.
#[derive(Debug)]
pub struct TreeReducer {
    layout: ProbeLayout,
}

impl TreeReducer {
    pub fn new(layout: &ProbeLayout) -> Self {
        Self { layout: *layout }
    }

    /// Runs the reduction, returning the number of iterations performed.
    pub fn run<S>(
        &self,
        substrate: &mut S,
        order: u32,
        parity: &mut Slot,
    ) -> Result<usize>
    where
        S: Substrate,
    {
        let mut iterations = 0;

        for count in self.layout.reduction_levels() {
            let src = *parity;
            let dst = src.flipped();
            let params = gpu::ReductionPassParams::new(order, count);
            let groups = count.div_ceil(self.layout.group_size);

            trace!("Reducing {count} partial sums; {src:?} -> {dst:?}");

            for res in [Resource::Coefficients(dst), Resource::Weights(dst)] {
                substrate.transition(res, ResourceState::ShaderWrite);
            }

            for res in [Resource::Coefficients(src), Resource::Weights(src)] {
                substrate.transition(res, ResourceState::ShaderRead);
            }

            substrate.dispatch(Dispatch {
                kernel: Kernel::ShReduction,
                inputs: &[Resource::Coefficients(src), Resource::Weights(src)],
                outputs: &[
                    Resource::Coefficients(dst),
                    Resource::Weights(dst),
                ],
                params: bytemuck::bytes_of(&params),
                groups: uvec3(groups, params.band_count(), 1),
            })?;

            parity.flip();
            iterations += 1;
        }

        Ok(iterations)
    }
}
