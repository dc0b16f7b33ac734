use glam::uvec3;

use crate::{
    gpu, Dispatch, Kernel, ProbeLayout, Resource, ResourceState, Result, Slot,
    Substrate,
};

/// Projects every texel of the radiance cubemap onto the SH basis, writing
/// one partial sum per texel group into slot zero.
#[derive(Debug)]
pub struct WeightedBasisProjector {
    face_size: u32,
    group_count: u32,
}

impl WeightedBasisProjector {
    pub fn new(layout: &ProbeLayout) -> Self {
        Self {
            face_size: layout.face_size,
            group_count: layout.group_count,
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
        let params = gpu::ProjectionPassParams::new(order, self.face_size);

        substrate.transition(Resource::Radiance, ResourceState::ShaderRead);

        for res in [
            Resource::Coefficients(Slot::Zero),
            Resource::Weights(Slot::Zero),
        ] {
            substrate.transition(res, ResourceState::ShaderWrite);
        }

        substrate.dispatch(Dispatch {
            kernel: Kernel::ShProjection,
            inputs: &[Resource::Radiance],
            outputs: &[
                Resource::Coefficients(Slot::Zero),
                Resource::Weights(Slot::Zero),
            ],
            params: bytemuck::bytes_of(&params),
            groups: uvec3(self.group_count, 1, 1),
        })?;

        *parity = Slot::Zero;

        Ok(())
    }
}
