use glam::Vec3;
use log::{debug, info};

use crate::{
    gpu, BlendState, CurrentCoefficients, Error, Normalizer, ProbeConfig,
    ProbeLayout, RadianceSynthesizer, Resource, ResourceState, Result,
    ShCoefficients, Slot, Substrate, TreeReducer, WeightedBasisProjector,
    FRAME_COUNT,
};

/// Light probe that turns a time-blended environment into SH irradiance
/// coefficients, once per frame.
///
/// Each [`Self::process()`] records, in this exact order:
///
/// - radiance synthesis (blend of two environment sources),
/// - weighted projection of each texel onto the SH basis,
/// - tree reduction of the per-group partial sums,
/// - normalization by the accumulated solid angle,
///
/// separating each pair of dependent dispatches with a transition. The result
/// stays on the substrate, in the slot designated by [`Self::parity()`].
#[derive(Debug)]
pub struct LightProbe<S>
where
    S: Substrate,
{
    config: ProbeConfig,
    layout: ProbeLayout,
    substrate: S,
    order: u32,
    frames: [BlendState; FRAME_COUNT],
    radiance_synthesizer: RadianceSynthesizer,
    projector: WeightedBasisProjector,
    reducer: TreeReducer,
    normalizer: Normalizer,
    parity: Slot,

    /// Order of the latest successfully processed frame, if any.
    completed: Option<u32>,
}

impl<S> LightProbe<S>
where
    S: Substrate,
{
    /// Creates a probe; `substrate` gets called with the validated layout, so
    /// that it can allocate resources of the right sizes.
    pub fn new(
        config: ProbeConfig,
        substrate: impl FnOnce(&ProbeLayout) -> Result<S>,
    ) -> Result<Self> {
        let layout = ProbeLayout::new(&config)?;
        let mut substrate = substrate(&layout)?;

        if substrate.source_count() == 0 {
            return Err(Error::NoSources);
        }

        if !substrate.supports_group_size(layout.group_size) {
            return Err(Error::UnsupportedGroupSize(layout.group_size));
        }

        // Sources are never written, so they can stay readable for good
        for id in 0..substrate.source_count() {
            substrate
                .transition(Resource::Source(id), ResourceState::ShaderRead);
        }

        info!(
            "Initializing light probe; {}, sources={}, reduction-iterations={}",
            config.describe(),
            substrate.source_count(),
            layout.reduction_iterations(),
        );

        Ok(Self {
            order: config.order,
            radiance_synthesizer: RadianceSynthesizer::new(&layout),
            projector: WeightedBasisProjector::new(&layout),
            reducer: TreeReducer::new(&layout),
            normalizer: Normalizer::new(&layout),
            config,
            layout,
            substrate,
            frames: Default::default(),
            parity: Slot::Zero,
            completed: None,
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn layout(&self) -> &ProbeLayout {
        &self.layout
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// Changes the number of SH bands computed by the following frames.
    pub fn set_order(&mut self, order: u32) -> Result<()> {
        self.config.validate_order(order)?;
        self.order = order;

        Ok(())
    }

    /// Returns the slot holding the latest aggregate.
    pub fn parity(&self) -> Slot {
        self.parity
    }

    pub fn frame(&self, frame_index: usize) -> Result<BlendState> {
        self.frames
            .get(frame_index)
            .copied()
            .ok_or(Error::FrameSlotOutOfRange(frame_index))
    }

    /// Derives the blend state for given frame slot at given time (in
    /// seconds).
    pub fn update_frame(
        &mut self,
        time: f64,
        frame_index: usize,
    ) -> Result<()> {
        let source_count = self.substrate.source_count();

        let frame = self
            .frames
            .get_mut(frame_index)
            .ok_or(Error::FrameSlotOutOfRange(frame_index))?;

        *frame = BlendState::at(time, self.config.period, source_count)?;

        debug!(
            "Frame {frame_index} updated; time={time}, probe={}, blend={}",
            frame.probe, frame.blend
        );

        Ok(())
    }

    /// Runs the whole pipeline for given frame slot and submits it.
    ///
    /// If any stage fails, the coefficients become unavailable until the next
    /// successfully processed frame.
    pub fn process(&mut self, frame_index: usize) -> Result<()> {
        let state = self.frame(frame_index)?;

        self.completed = None;

        #[cfg(feature = "metrics")]
        let result = crate::metrics::measure("Frame processed", || {
            self.run(state)
        });

        #[cfg(not(feature = "metrics"))]
        let result = self.run(state);

        self.substrate.submit();

        if result.is_ok() {
            self.completed = Some(self.order);
        }

        result
    }

    fn run(&mut self, state: BlendState) -> Result<()> {
        let order = self.order;

        self.radiance_synthesizer.run(&mut self.substrate, state)?;

        self.projector
            .run(&mut self.substrate, order, &mut self.parity)?;

        self.reducer
            .run(&mut self.substrate, order, &mut self.parity)?;

        self.normalizer
            .run(&mut self.substrate, order, &mut self.parity)?;

        // Hand the results over to consumers
        for res in [
            Resource::Radiance,
            Resource::Coefficients(self.parity),
            Resource::Weights(self.parity),
            Resource::Status,
        ] {
            self.substrate.transition(res, ResourceState::ShaderRead);
        }

        Ok(())
    }

    /// Returns the normalized coefficients of the latest frame, as they live
    /// on the substrate.
    pub fn coefficients(&self) -> Result<CurrentCoefficients<'_, S::Buffer>> {
        let order = self.completed.ok_or(Error::NotYetAvailable)?;

        Ok(CurrentCoefficients {
            buffer: self.substrate.coefficients(self.parity),
            slot: self.parity,
            order,
        })
    }

    /// Copies the normalized coefficients of the latest frame back to the
    /// host, blocking until they are available.
    pub fn read_coefficients(&mut self) -> Result<ShCoefficients> {
        let CurrentCoefficients { slot, order, .. } = self.coefficients()?;

        let status = self.substrate.read(Resource::Status, 4)?;

        if bytemuck::pod_read_unaligned::<u32>(&status)
            != gpu::AGGREGATE_VALID
        {
            // Normalization keeps the aggregate intact in the other slot
            let total_weight = self
                .substrate
                .read(Resource::Weights(slot.flipped()), 4)
                .map(|bytes| bytemuck::pod_read_unaligned(&bytes))
                .unwrap_or(f32::NAN);

            return Err(Error::InvalidAggregate { total_weight });
        }

        let len = (order * order) as usize;

        let bytes = self.substrate.read(
            Resource::Coefficients(slot),
            len * std::mem::size_of::<Vec3>(),
        )?;

        let values = bytes
            .chunks_exact(std::mem::size_of::<Vec3>())
            .map(|chunk| Vec3::from_array(bytemuck::pod_read_unaligned(chunk)))
            .collect();

        Ok(ShCoefficients::new(order, values))
    }

    pub fn radiance(&self) -> &S::Texture {
        self.substrate.radiance()
    }

    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    pub fn substrate_mut(&mut self) -> &mut S {
        &mut self.substrate
    }
}

impl<S> Drop for LightProbe<S>
where
    S: Substrate,
{
    fn drop(&mut self) {
        info!("Releasing light probe");
    }
}
