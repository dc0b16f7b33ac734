mod cubemap;
mod kernels;

use glam::{UVec3, Vec3};
use log::{debug, info};

pub use self::cubemap::*;
use crate::{
    gpu, Barrier, Dispatch, DoubleBuffered, Error, Kernel, ProbeLayout,
    Resource, ResourceState, ResourceTracker, Result, Slot, Substrate,
};

/// Entry of [`CpuSubstrate::journal()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Barrier(Barrier),
    Dispatch { kernel: Kernel, groups: UVec3 },
}

/// Host-side substrate that executes the kernels immediately, emulating their
/// workgroups lane by lane.
///
/// Apart from being a reference for the GPU kernels, it keeps a journal of
/// everything that has been recorded, which comes handy for inspecting the
/// pipeline's schedule.
#[derive(Debug)]
pub struct CpuSubstrate {
    layout: ProbeLayout,
    sources: Vec<CpuCubemap>,
    radiance: CpuCubemap,
    coefficients: DoubleBuffered<Vec<Vec3>>,
    weights: DoubleBuffered<Vec<f32>>,
    status: u32,
    tracker: ResourceTracker,
    journal: Vec<Command>,
}

impl CpuSubstrate {
    pub fn new(layout: &ProbeLayout, sources: Vec<CpuCubemap>) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::NoSources);
        }

        if let Some(source) = sources.iter().find(|s| s.size() == 0) {
            debug!("Rejecting source of size {}", source.size());

            return Err(Error::InvalidFaceSize);
        }

        info!(
            "Allocating CPU substrate; sources={}, coefficients={}, weights={}",
            sources.len(),
            layout.coefficient_capacity(),
            layout.weight_capacity(),
        );

        Ok(Self {
            layout: *layout,
            sources,
            radiance: CpuCubemap::new(layout.face_size),
            coefficients: DoubleBuffered::new(|_| {
                vec![Vec3::ZERO; layout.coefficient_capacity()]
            }),
            weights: DoubleBuffered::new(|_| {
                vec![0.0; layout.weight_capacity()]
            }),
            status: gpu::AGGREGATE_VALID,
            tracker: Default::default(),
            journal: Default::default(),
        })
    }

    pub fn sources(&self) -> &[CpuCubemap] {
        &self.sources
    }

    pub fn weights(&self, slot: Slot) -> &[f32] {
        self.weights.get(slot)
    }

    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn journal(&self) -> &[Command] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Returns the kernels dispatched so far, in order.
    pub fn dispatches(&self) -> impl Iterator<Item = (Kernel, UVec3)> + '_ {
        self.journal.iter().filter_map(|command| match *command {
            Command::Dispatch { kernel, groups } => Some((kernel, groups)),
            Command::Barrier(_) => None,
        })
    }

    fn params<T>(kernel: Kernel, params: &[u8]) -> Result<T>
    where
        T: bytemuck::AnyBitPattern,
    {
        bytemuck::try_pod_read_unaligned(params)
            .map_err(|_| Error::InvalidParams { kernel })
    }

    fn generate_radiance(
        &mut self,
        kernel: Kernel,
        inputs: &[Resource],
        outputs: &[Resource],
        params: &[u8],
        groups: UVec3,
    ) -> Result<()> {
        let ([Resource::Source(a), Resource::Source(b)], [Resource::Radiance]) =
            (inputs, outputs)
        else {
            return Err(Error::InvalidBindings { kernel });
        };

        let params: gpu::RadiancePassParams = Self::params(kernel, params)?;

        let tiles = self.layout.face_size.div_ceil(gpu::RADIANCE_TILE_SIZE);

        if params.face_size != self.layout.face_size
            || groups.x > tiles
            || groups.y > tiles
            || groups.z != gpu::CUBE_FACE_COUNT
        {
            return Err(Error::InvalidParams { kernel });
        }

        let invalid = || Error::InvalidBindings { kernel };
        let a = self.sources.get(*a).ok_or_else(invalid)?;
        let b = self.sources.get(*b).ok_or_else(invalid)?;

        kernels::generate_radiance(a, b, &mut self.radiance, params, groups);

        Ok(())
    }

    fn project(
        &mut self,
        kernel: Kernel,
        inputs: &[Resource],
        outputs: &[Resource],
        params: &[u8],
        groups: UVec3,
    ) -> Result<()> {
        let (
            [Resource::Radiance],
            [Resource::Coefficients(dst), Resource::Weights(dst_weights)],
        ) = (inputs, outputs)
        else {
            return Err(Error::InvalidBindings { kernel });
        };

        if dst != dst_weights {
            return Err(Error::InvalidBindings { kernel });
        }

        let params: gpu::ProjectionPassParams = Self::params(kernel, params)?;

        if params.face_size != self.layout.face_size
            || !(1..=self.layout.max_order).contains(&params.order)
            || groups.x > self.layout.group_count
        {
            return Err(Error::InvalidParams { kernel });
        }

        kernels::project(
            &self.radiance,
            self.coefficients.get_mut(*dst),
            self.weights.get_mut(*dst),
            params,
            self.layout.group_size,
            groups,
        );

        Ok(())
    }

    fn reduce(
        &mut self,
        kernel: Kernel,
        inputs: &[Resource],
        outputs: &[Resource],
        params: &[u8],
        groups: UVec3,
    ) -> Result<()> {
        let src = Self::pair(kernel, inputs)?;
        let dst = Self::pair(kernel, outputs)?;

        if src == dst {
            return Err(Error::InvalidBindings { kernel });
        }

        let params: gpu::ReductionPassParams = Self::params(kernel, params)?;

        if !(1..=self.layout.max_order).contains(&params.order)
            || params.count > self.layout.group_count
            || groups.x > params.count.div_ceil(self.layout.group_size)
            || groups.y > params.band_count()
        {
            return Err(Error::InvalidParams { kernel });
        }

        let (src_coefficients, dst_coefficients) =
            self.coefficients.split(src);

        let (src_weights, dst_weights) = self.weights.split(src);

        kernels::reduce(
            (src_coefficients, src_weights),
            (dst_coefficients, dst_weights),
            params,
            self.layout.group_size,
            groups,
        );

        Ok(())
    }

    fn normalize(
        &mut self,
        kernel: Kernel,
        inputs: &[Resource],
        outputs: &[Resource],
        params: &[u8],
        groups: UVec3,
    ) -> Result<()> {
        let src = Self::pair(kernel, inputs)?;

        let dst = match outputs {
            [coefficients, weights, Resource::Status] => {
                Self::pair(kernel, &[*coefficients, *weights])?
            }
            _ => return Err(Error::InvalidBindings { kernel }),
        };

        if src == dst {
            return Err(Error::InvalidBindings { kernel });
        }

        let params: gpu::NormalizationPassParams =
            Self::params(kernel, params)?;

        if !(1..=self.layout.max_order).contains(&params.order) {
            return Err(Error::InvalidParams { kernel });
        }

        let (src_coefficients, dst_coefficients) =
            self.coefficients.split(src);

        let (src_weights, dst_weights) = self.weights.split(src);

        kernels::normalize(
            (src_coefficients, src_weights),
            (dst_coefficients, dst_weights),
            &mut self.status,
            params,
            self.layout.group_size,
            groups,
        )
        .map(drop)
        .map_err(|total_weight| Error::InvalidAggregate { total_weight })
    }

    /// Extracts the slot out of a `[Coefficients(slot), Weights(slot)]` pair.
    fn pair(kernel: Kernel, resources: &[Resource]) -> Result<Slot> {
        match resources {
            [Resource::Coefficients(a), Resource::Weights(b)] if a == b => {
                Ok(*a)
            }
            _ => Err(Error::InvalidBindings { kernel }),
        }
    }
}

impl Substrate for CpuSubstrate {
    type Texture = CpuCubemap;
    type Buffer = Vec<Vec3>;

    fn dispatch(&mut self, dispatch: Dispatch<'_>) -> Result<()> {
        self.tracker.validate(&dispatch)?;

        if !dispatch.has_valid_bindings() {
            return Err(Error::InvalidBindings {
                kernel: dispatch.kernel,
            });
        }

        let Dispatch {
            kernel,
            inputs,
            outputs,
            params,
            groups,
        } = dispatch;

        self.journal.push(Command::Dispatch { kernel, groups });

        match kernel {
            Kernel::GenerateRadiance => {
                self.generate_radiance(kernel, inputs, outputs, params, groups)
            }
            Kernel::ShProjection => {
                self.project(kernel, inputs, outputs, params, groups)
            }
            Kernel::ShReduction => {
                self.reduce(kernel, inputs, outputs, params, groups)
            }
            Kernel::ShNormalization => {
                self.normalize(kernel, inputs, outputs, params, groups)
            }
        }
    }

    fn transition(&mut self, resource: Resource, state: ResourceState) {
        if let Some(barrier) = self.tracker.transition(resource, state) {
            self.journal.push(Command::Barrier(barrier));
        }
    }

    fn submit(&mut self) {
        //
    }

    fn read(&mut self, resource: Resource, len: usize) -> Result<Vec<u8>> {
        self.tracker.expect(resource, ResourceState::ShaderRead)?;

        let bytes: &[u8] = match resource {
            Resource::Coefficients(slot) => {
                bytemuck::cast_slice(self.coefficients.get(slot))
            }
            Resource::Weights(slot) => {
                bytemuck::cast_slice(self.weights.get(slot))
            }
            Resource::Status => bytemuck::bytes_of(&self.status),
            Resource::Source(_) | Resource::Radiance => {
                return Err(Error::Readback {
                    resource,
                    reason: "only buffers can be read back".into(),
                });
            }
        };

        bytes.get(..len).map(|bytes| bytes.to_vec()).ok_or_else(|| {
            Error::Readback {
                resource,
                reason: format!(
                    "requested {len} bytes, but the buffer has only {}",
                    bytes.len()
                ),
            }
        })
    }

    fn source_count(&self) -> usize {
        self.sources.len()
    }

    fn radiance(&self) -> &CpuCubemap {
        &self.radiance
    }

    fn coefficients(&self, slot: Slot) -> &Vec<Vec3> {
        self.coefficients.get(slot)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec3, vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::ProbeConfig;

    fn layout(face_size: u32) -> ProbeLayout {
        ProbeLayout::new(&ProbeConfig::default().with_face_size(face_size))
            .unwrap()
    }

    fn random_cubemap(rng: &mut StdRng, size: u32) -> CpuCubemap {
        CpuCubemap::from_fn(size, |_| {
            vec3(rng.gen(), rng.gen(), rng.gen()) * 4.0
        })
    }

    /// Runs projection followed by reductions, leaving the aggregate in the
    /// returned slot.
    fn aggregate(target: &mut CpuSubstrate, order: u32) -> Slot {
        let layout = target.layout;
        let params = gpu::ProjectionPassParams::new(order, layout.face_size);

        target.transition(Resource::Radiance, ResourceState::ShaderRead);
        target.transition(
            Resource::Coefficients(Slot::Zero),
            ResourceState::ShaderWrite,
        );
        target.transition(
            Resource::Weights(Slot::Zero),
            ResourceState::ShaderWrite,
        );

        target
            .dispatch(Dispatch {
                kernel: Kernel::ShProjection,
                inputs: &[Resource::Radiance],
                outputs: &[
                    Resource::Coefficients(Slot::Zero),
                    Resource::Weights(Slot::Zero),
                ],
                params: bytemuck::bytes_of(&params),
                groups: uvec3(layout.group_count, 1, 1),
            })
            .unwrap();

        let mut slot = Slot::Zero;

        for count in layout.reduction_levels() {
            slot = reduce(target, order, count, slot);
        }

        slot
    }

    fn reduce(
        target: &mut CpuSubstrate,
        order: u32,
        count: u32,
        src: Slot,
    ) -> Slot {
        let dst = src.flipped();
        let params = gpu::ReductionPassParams::new(order, count);
        let groups = count.div_ceil(target.layout.group_size);

        for res in [Resource::Coefficients(src), Resource::Weights(src)] {
            target.transition(res, ResourceState::ShaderRead);
        }

        for res in [Resource::Coefficients(dst), Resource::Weights(dst)] {
            target.transition(res, ResourceState::ShaderWrite);
        }

        target
            .dispatch(Dispatch {
                kernel: Kernel::ShReduction,
                inputs: &[Resource::Coefficients(src), Resource::Weights(src)],
                outputs: &[
                    Resource::Coefficients(dst),
                    Resource::Weights(dst),
                ],
                params: bytemuck::bytes_of(&params),
                groups: uvec3(groups, order * order, 1),
            })
            .unwrap();

        dst
    }

    fn normalize(
        target: &mut CpuSubstrate,
        order: u32,
        src: Slot,
    ) -> Result<Slot> {
        let dst = src.flipped();
        let params = gpu::NormalizationPassParams::new(order);

        for res in [Resource::Coefficients(src), Resource::Weights(src)] {
            target.transition(res, ResourceState::ShaderRead);
        }

        for res in [
            Resource::Coefficients(dst),
            Resource::Weights(dst),
            Resource::Status,
        ] {
            target.transition(res, ResourceState::ShaderWrite);
        }

        target.dispatch(Dispatch {
            kernel: Kernel::ShNormalization,
            inputs: &[Resource::Coefficients(src), Resource::Weights(src)],
            outputs: &[
                Resource::Coefficients(dst),
                Resource::Weights(dst),
                Resource::Status,
            ],
            params: bytemuck::bytes_of(&params),
            groups: uvec3(1, 1, 1),
        })?;

        Ok(dst)
    }

    #[test]
    fn reduction_conserves_sums() {
        let mut rng = StdRng::seed_from_u64(1234);
        let layout = layout(16);

        assert_eq!(
            Some(Error::NoSources),
            CpuSubstrate::new(&layout, vec![]).err()
        );

        let mut target =
            CpuSubstrate::new(&layout, vec![random_cubemap(&mut rng, 16)])
                .unwrap();

        target.radiance = random_cubemap(&mut rng, 16);

        let order = 3;
        let bands = (order * order) as usize;

        target.transition(Resource::Radiance, ResourceState::ShaderRead);
        target.transition(
            Resource::Coefficients(Slot::Zero),
            ResourceState::ShaderWrite,
        );
        target.transition(
            Resource::Weights(Slot::Zero),
            ResourceState::ShaderWrite,
        );

        let params = gpu::ProjectionPassParams::new(order, 16);

        target
            .dispatch(Dispatch {
                kernel: Kernel::ShProjection,
                inputs: &[Resource::Radiance],
                outputs: &[
                    Resource::Coefficients(Slot::Zero),
                    Resource::Weights(Slot::Zero),
                ],
                params: bytemuck::bytes_of(&params),
                groups: uvec3(layout.group_count, 1, 1),
            })
            .unwrap();

        let groups = layout.group_count as usize;
        let partials = target.coefficients(Slot::Zero).clone();

        let expected_weight: f32 =
            target.weights(Slot::Zero)[..groups].iter().sum();

        let expected: Vec<Vec3> = (0..bands)
            .map(|band| {
                (0..groups).map(|group| partials[group * bands + band]).sum()
            })
            .collect();

        let mut slot = Slot::Zero;

        for count in layout.reduction_levels() {
            slot = reduce(&mut target, order, count, slot);
        }

        assert_relative_eq!(
            expected_weight,
            target.weights(slot)[0],
            max_relative = 1e-4
        );

        assert_relative_eq!(
            4.0 * std::f32::consts::PI,
            target.weights(slot)[0],
            max_relative = 1e-3
        );

        for (band, expected) in expected.into_iter().enumerate() {
            let actual = target.coefficients(slot)[band];

            assert_relative_eq!(expected.x, actual.x, max_relative = 1e-3);
            assert_relative_eq!(expected.y, actual.y, max_relative = 1e-3);
            assert_relative_eq!(expected.z, actual.z, max_relative = 1e-3);
        }
    }

    #[test]
    fn total_weight_does_not_depend_on_order() {
        let layout = layout(8);
        let source = CpuCubemap::uniform(8, Vec3::ONE);
        let mut weights = Vec::new();

        for order in 1..=layout.max_order {
            let mut target =
                CpuSubstrate::new(&layout, vec![source.clone()]).unwrap();

            target.radiance = source.clone();

            let slot = aggregate(&mut target, order);

            weights.push(target.weights(slot)[0]);
        }

        for weight in &weights[1..] {
            assert_relative_eq!(weights[0], *weight, max_relative = 1e-6);
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(4321);
        let layout = layout(8);

        let mut target =
            CpuSubstrate::new(&layout, vec![random_cubemap(&mut rng, 8)])
                .unwrap();

        target.radiance = random_cubemap(&mut rng, 8);

        let order = 4;
        let bands = (order * order) as usize;
        let slot = aggregate(&mut target, order);
        let slot = normalize(&mut target, order, slot).unwrap();
        let once = target.coefficients(slot)[..bands].to_vec();

        assert_relative_eq!(1.0, target.weights(slot)[0]);

        let slot = normalize(&mut target, order, slot).unwrap();
        let twice = target.coefficients(slot)[..bands].to_vec();

        for (once, twice) in once.into_iter().zip(twice) {
            assert_relative_eq!(once.x, twice.x);
            assert_relative_eq!(once.y, twice.y);
            assert_relative_eq!(once.z, twice.z);
        }

        assert_eq!(gpu::AGGREGATE_VALID, target.status());
    }

    #[test]
    fn zero_weight_is_reported() {
        let layout = layout(8);

        let mut target =
            CpuSubstrate::new(&layout, vec![CpuCubemap::new(8)]).unwrap();

        let actual = normalize(&mut target, 2, Slot::One);

        assert_eq!(Err(Error::InvalidAggregate { total_weight: 0.0 }), actual);
        assert_eq!(gpu::AGGREGATE_INVALID, target.status());

        for value in &target.coefficients(Slot::Zero)[..4] {
            assert_eq!(Vec3::ZERO, *value);
        }
    }

    #[test]
    fn unsynchronized_dispatch_is_rejected() {
        let layout = layout(8);

        let mut target =
            CpuSubstrate::new(&layout, vec![CpuCubemap::new(8)]).unwrap();

        let params = gpu::RadiancePassParams::new(0.0, 8);

        let actual = target.dispatch(Dispatch {
            kernel: Kernel::GenerateRadiance,
            inputs: &[Resource::Source(0), Resource::Source(0)],
            outputs: &[Resource::Radiance],
            params: bytemuck::bytes_of(&params),
            groups: uvec3(1, 1, 6),
        });

        assert_eq!(
            Err(Error::Unsynchronized {
                resource: Resource::Source(0),
                expected: ResourceState::ShaderRead,
                actual: None,
            }),
            actual
        );

        assert_eq!(0, target.dispatches().count());
    }

    #[test]
    fn malformed_dispatch_is_rejected() {
        let layout = layout(8);

        let mut target =
            CpuSubstrate::new(&layout, vec![CpuCubemap::new(8)]).unwrap();

        target.transition(Resource::Radiance, ResourceState::ShaderRead);
        target.transition(Resource::Status, ResourceState::ShaderWrite);

        let actual = target.dispatch(Dispatch {
            kernel: Kernel::ShProjection,
            inputs: &[Resource::Radiance],
            outputs: &[Resource::Status],
            params: &[],
            groups: uvec3(1, 1, 1),
        });

        assert_eq!(
            Err(Error::InvalidBindings {
                kernel: Kernel::ShProjection
            }),
            actual
        );
    }

    #[test]
    fn radiance_dispatch_out_of_bounds_is_rejected() {
        let layout = layout(8);

        let mut target =
            CpuSubstrate::new(&layout, vec![CpuCubemap::new(8)]).unwrap();

        target.transition(Resource::Source(0), ResourceState::ShaderRead);
        target.transition(Resource::Radiance, ResourceState::ShaderWrite);

        let params = gpu::RadiancePassParams::new(0.0, 8);

        for groups in [uvec3(1, 1, 7), uvec3(2, 1, 6), uvec3(1, 2, 6)] {
            let actual = target.dispatch(Dispatch {
                kernel: Kernel::GenerateRadiance,
                inputs: &[Resource::Source(0), Resource::Source(0)],
                outputs: &[Resource::Radiance],
                params: bytemuck::bytes_of(&params),
                groups,
            });

            assert_eq!(
                Err(Error::InvalidParams {
                    kernel: Kernel::GenerateRadiance
                }),
                actual,
                "groups={groups}"
            );
        }

        target
            .dispatch(Dispatch {
                kernel: Kernel::GenerateRadiance,
                inputs: &[Resource::Source(0), Resource::Source(0)],
                outputs: &[Resource::Radiance],
                params: bytemuck::bytes_of(&params),
                groups: uvec3(1, 1, 6),
            })
            .unwrap();
    }

    #[test]
    fn readback() {
        let layout = layout(8);

        let mut target =
            CpuSubstrate::new(&layout, vec![CpuCubemap::new(8)]).unwrap();

        assert!(matches!(
            target.read(Resource::Status, 4),
            Err(Error::Unsynchronized { .. })
        ));

        target.transition(Resource::Status, ResourceState::ShaderRead);

        assert_eq!(
            bytemuck::bytes_of(&gpu::AGGREGATE_VALID).to_vec(),
            target.read(Resource::Status, 4).unwrap()
        );

        assert!(matches!(
            target.read(Resource::Status, 8),
            Err(Error::Readback { .. })
        ));
    }
}
