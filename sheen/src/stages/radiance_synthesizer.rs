use glam::uvec3;
use log::trace;

use crate::{
    gpu, BlendState, Dispatch, Kernel, ProbeLayout, Resource, ResourceState,
    Result, Substrate,
};

/// Blends two environment sources into the radiance cubemap.
#[derive(Debug)]
pub struct RadianceSynthesizer {
    face_size: u32,
}

impl RadianceSynthesizer {
    pub fn new(layout: &ProbeLayout) -> Self {
        Self {
            face_size: layout.face_size,
        }
    }

    pub fn run<S>(&self, substrate: &mut S, state: BlendState) -> Result<()>
    where
        S: Substrate,
    {
        let [a, b] = state.sources(substrate.source_count());
        let params = gpu::RadiancePassParams::new(state.blend, self.face_size);
        let tiles = self.face_size.div_ceil(gpu::RADIANCE_TILE_SIZE);

        trace!(
            "Generating radiance; sources={a},{b}, blend={}",
            state.blend
        );

        substrate.transition(Resource::Radiance, ResourceState::ShaderWrite);

        substrate.dispatch(Dispatch {
            kernel: Kernel::GenerateRadiance,
            inputs: &[Resource::Source(a), Resource::Source(b)],
            outputs: &[Resource::Radiance],
            params: bytemuck::bytes_of(&params),
            groups: uvec3(tiles, tiles, gpu::CUBE_FACE_COUNT),
        })
    }
}
