mod bind_group;
mod bindable;
mod compute_pass;
mod cube_texture;
mod shaders;
mod storage_buffer;

use std::mem;
use std::sync::{mpsc, Arc};

use derivative::Derivative;
use fxhash::FxHashMap;
use log::{debug, info, trace};

pub use self::bind_group::*;
pub use self::bindable::*;
pub use self::compute_pass::*;
pub use self::cube_texture::*;
pub use self::shaders::*;
pub use self::storage_buffer::*;
use crate::{
    gpu, Dispatch, DoubleBuffered, Error, Kernel, ProbeLayout, Resource,
    ResourceState, ResourceTracker, Result, Slot, Substrate,
};

/// Substrate that records kernels into wgpu command encoders.
///
/// The device has to be created with [`Self::required_features()`] and
/// [`Self::required_limits()`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DeviceSubstrate {
    #[derivative(Debug = "ignore")]
    device: Arc<wgpu::Device>,

    #[derivative(Debug = "ignore")]
    queue: Arc<wgpu::Queue>,

    resources: DeviceResources,
    kernels: KernelCache,

    #[derivative(Debug = "ignore")]
    encoder: Option<wgpu::CommandEncoder>,

    tracker: ResourceTracker,
}

impl DeviceSubstrate {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        layout: &ProbeLayout,
        sources: Vec<CubeTexture>,
    ) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::NoSources);
        }

        info!(
            "Initializing device substrate; sources={}, face_size={}",
            sources.len(),
            layout.face_size
        );

        let radiance = CubeTexture::new(
            &device,
            "sheen_radiance",
            layout.face_size,
            wgpu::TextureUsages::STORAGE_BINDING,
        );

        let coefficients = DoubleBuffered::new(|slot| {
            StorageBuffer::new(
                &device,
                format!("sheen_coefficients_{}", slot.index()),
                layout.coefficient_buffer_size(),
            )
        });

        let weights = DoubleBuffered::new(|slot| {
            StorageBuffer::new(
                &device,
                format!("sheen_weights_{}", slot.index()),
                layout.weight_buffer_size(),
            )
        });

        let status =
            StorageBuffer::new(&device, "sheen_status", mem::size_of::<u32>());

        let kernels = KernelCache::new(&device);

        Ok(Self {
            resources: DeviceResources {
                sources,
                radiance,
                coefficients,
                weights,
                status,
            },
            kernels,
            encoder: None,
            tracker: Default::default(),
            device,
            queue,
        })
    }

    pub fn required_features() -> wgpu::Features {
        wgpu::Features::PUSH_CONSTANTS
    }

    pub fn required_limits() -> wgpu::Limits {
        let params_size = Kernel::ALL
            .into_iter()
            .map(params_size)
            .max()
            .unwrap_or_default();

        wgpu::Limits {
            max_push_constant_size: params_size as u32,
            ..Default::default()
        }
    }

    pub fn weights(&self, slot: Slot) -> &StorageBuffer {
        self.resources.weights.get(slot)
    }

    pub fn status(&self) -> &StorageBuffer {
        &self.resources.status
    }
}

impl Substrate for DeviceSubstrate {
    type Texture = CubeTexture;
    type Buffer = StorageBuffer;

    fn dispatch(&mut self, dispatch: Dispatch<'_>) -> Result<()> {
        self.tracker.validate(&dispatch)?;

        let Dispatch {
            kernel,
            inputs,
            outputs,
            params,
            groups,
        } = dispatch;

        if !dispatch.has_valid_bindings() {
            return Err(Error::InvalidBindings { kernel });
        }

        if params.len() != params_size(kernel) {
            return Err(Error::InvalidParams { kernel });
        }

        trace!("Dispatching {kernel:?}; groups={groups}");

        let resources: Vec<_> =
            inputs.iter().chain(outputs).copied().collect();

        if !self.kernels.is_prepared(kernel, &resources) {
            let binders = inputs
                .iter()
                .map(|&res| (res, ResourceState::ShaderRead))
                .chain(
                    outputs
                        .iter()
                        .map(|&res| (res, ResourceState::ShaderWrite)),
                )
                .map(|(res, state)| self.resources.binder(res, state))
                .collect::<Option<Vec<_>>>()
                .ok_or(Error::InvalidBindings { kernel })?;

            let bind_group = binders.iter().fold(
                BindGroup::builder(format!("{}_bg", kernel.label())),
                |bind_group, binder| bind_group.add(binder.as_ref()),
            );

            self.kernels
                .prepare(&self.device, kernel, resources.clone(), bind_group);
        }

        let device = &self.device;

        let encoder = self
            .encoder
            .get_or_insert_with(|| create_encoder(device));

        self.kernels
            .run(encoder, kernel, &resources, params, groups)
    }

    fn transition(&mut self, resource: Resource, state: ResourceState) {
        // wgpu inserts the actual barriers on its own, between passes
        self.tracker.transition(resource, state);
    }

    fn submit(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            trace!("Submitting");

            self.queue.submit([encoder.finish()]);
        }
    }

    fn read(&mut self, resource: Resource, len: usize) -> Result<Vec<u8>> {
        self.tracker.expect(resource, ResourceState::ShaderRead)?;

        let readback_err =
            |reason: String| Error::Readback { resource, reason };

        let buffer = self.resources.buffer(resource).ok_or_else(|| {
            readback_err("only buffers can be read back".into())
        })?;

        if len > buffer.size() {
            return Err(readback_err(format!(
                "requested {len} bytes, but the buffer has only {}",
                buffer.size()
            )));
        }

        debug!("Reading {resource:?} back; len={len}");

        let size = pad_size(len);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sheen_readback"),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            size: size as _,
            mapped_at_creation: false,
        });

        // Pending work goes together with the copy, so that it's visible
        let mut encoder = self
            .encoder
            .take()
            .unwrap_or_else(|| create_encoder(&self.device));

        encoder.copy_buffer_to_buffer(
            buffer.buffer(),
            0,
            &staging,
            0,
            size as _,
        );

        self.queue.submit([encoder.finish()]);

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();

        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|err| readback_err(err.to_string()))?
            .map_err(|err| readback_err(err.to_string()))?;

        let bytes = slice.get_mapped_range()[..len].to_vec();

        staging.unmap();

        Ok(bytes)
    }

    fn source_count(&self) -> usize {
        self.resources.sources.len()
    }

    fn radiance(&self) -> &CubeTexture {
        &self.resources.radiance
    }

    fn coefficients(&self, slot: Slot) -> &StorageBuffer {
        self.resources.coefficients.get(slot)
    }

    fn supports_group_size(&self, group_size: u32) -> bool {
        group_size == gpu::SH_GROUP_SIZE
    }
}

impl Drop for DeviceSubstrate {
    fn drop(&mut self) {
        debug!("Deleting device substrate");
    }
}

#[derive(Debug)]
struct DeviceResources {
    sources: Vec<CubeTexture>,
    radiance: CubeTexture,
    coefficients: DoubleBuffered<StorageBuffer>,
    weights: DoubleBuffered<StorageBuffer>,
    status: StorageBuffer,
}

impl DeviceResources {
    fn binder(
        &self,
        resource: Resource,
        state: ResourceState,
    ) -> Option<Box<dyn Bindable + '_>> {
        let writable = state == ResourceState::ShaderWrite;

        let binder: Box<dyn Bindable + '_> = match resource {
            Resource::Source(id) => Box::new(self.sources.get(id)?.readable()),

            Resource::Radiance if writable => {
                Box::new(self.radiance.writable())
            }
            Resource::Radiance => Box::new(self.radiance.readable()),

            Resource::Coefficients(slot) if writable => {
                Box::new(self.coefficients.get(slot).as_rw_bind())
            }
            Resource::Coefficients(slot) => {
                Box::new(self.coefficients.get(slot).as_ro_bind())
            }

            Resource::Weights(slot) if writable => {
                Box::new(self.weights.get(slot).as_rw_bind())
            }
            Resource::Weights(slot) => {
                Box::new(self.weights.get(slot).as_ro_bind())
            }

            Resource::Status => Box::new(self.status.as_rw_bind()),
        };

        Some(binder)
    }

    fn buffer(&self, resource: Resource) -> Option<&StorageBuffer> {
        match resource {
            Resource::Coefficients(slot) => Some(self.coefficients.get(slot)),
            Resource::Weights(slot) => Some(self.weights.get(slot)),
            Resource::Status => Some(&self.status),
            Resource::Source(_) | Resource::Radiance => None,
        }
    }
}

/// Compiled kernels, owned by the substrate and released together with it.
#[derive(Debug)]
struct KernelCache {
    shaders: Shaders,
    passes: FxHashMap<Kernel, ComputePass>,
}

impl KernelCache {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            shaders: Shaders::new(device),
            passes: Default::default(),
        }
    }

    fn is_prepared(&self, kernel: Kernel, resources: &[Resource]) -> bool {
        self.passes
            .get(&kernel)
            .map_or(false, |pass| pass.bind_group(resources).is_some())
    }

    /// Makes sure there's a pipeline for given kernel and a bind group for
    /// given resources.
    fn prepare(
        &mut self,
        device: &wgpu::Device,
        kernel: Kernel,
        resources: Vec<Resource>,
        bind_group: BindGroupBuilder<'_>,
    ) {
        if let Some(pass) = self.passes.get_mut(&kernel) {
            pass.add_bind_group(device, resources, bind_group);
        } else {
            let pass = ComputePass::builder(kernel.label())
                .params_size(params_size(kernel))
                .build(device, self.shaders.get(kernel), resources, bind_group);

            self.passes.insert(kernel, pass);
        }
    }

    fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        kernel: Kernel,
        resources: &[Resource],
        params: &[u8],
        groups: glam::UVec3,
    ) -> Result<()> {
        let pass = self
            .passes
            .get(&kernel)
            .ok_or(Error::InvalidBindings { kernel })?;

        let bind_group = pass
            .bind_group(resources)
            .ok_or(Error::InvalidBindings { kernel })?;

        pass.run(encoder, bind_group, params, groups);

        Ok(())
    }
}

impl Drop for KernelCache {
    fn drop(&mut self) {
        info!("Releasing {} compiled kernel(s)", self.passes.len());
    }
}

fn create_encoder(device: &wgpu::Device) -> wgpu::CommandEncoder {
    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("sheen_commands"),
    })
}

fn params_size(kernel: Kernel) -> usize {
    match kernel {
        Kernel::GenerateRadiance => mem::size_of::<gpu::RadiancePassParams>(),
        Kernel::ShProjection => mem::size_of::<gpu::ProjectionPassParams>(),
        Kernel::ShReduction => mem::size_of::<gpu::ReductionPassParams>(),
        Kernel::ShNormalization => {
            mem::size_of::<gpu::NormalizationPassParams>()
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{vec3, Vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::cpu::{CpuCubemap, CpuSubstrate};
    use crate::{LightProbe, ProbeConfig};

    fn device() -> (Arc<wgpu::Device>, Arc<wgpu::Queue>) {
        let instance = wgpu::Instance::default();

        let adapter = pollster::block_on(
            instance.request_adapter(&wgpu::RequestAdapterOptions::default()),
        )
        .expect("no adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("sheen_test"),
                features: DeviceSubstrate::required_features(),
                limits: DeviceSubstrate::required_limits(),
            },
            None,
        ))
        .expect("couldn't create device");

        (Arc::new(device), Arc::new(queue))
    }

    #[test]
    fn required_limits() {
        let limits = DeviceSubstrate::required_limits();

        assert_eq!(16, limits.max_push_constant_size);
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn matches_cpu_substrate() {
        let mut rng = StdRng::seed_from_u64(1234);

        let sources: Vec<_> = (0..2)
            .map(|_| {
                CpuCubemap::from_fn(16, |_| {
                    vec3(rng.gen(), rng.gen(), rng.gen())
                })
            })
            .collect();

        let config = ProbeConfig::default().with_face_size(32).with_order(4);
        let (device, queue) = device();

        let mut expected = LightProbe::new(config.clone(), |layout| {
            CpuSubstrate::new(layout, sources.clone())
        })
        .unwrap();

        let mut actual = LightProbe::new(config, |layout| {
            let sources = sources
                .iter()
                .enumerate()
                .map(|(id, source)| {
                    CubeTexture::from_cubemap(
                        &device,
                        &queue,
                        format!("sheen_source_{id}"),
                        source,
                    )
                })
                .collect();

            DeviceSubstrate::new(device.clone(), queue.clone(), layout, sources)
        })
        .unwrap();

        expected.update_frame(1.25, 0).unwrap();
        expected.process(0).unwrap();

        actual.update_frame(1.25, 0).unwrap();
        actual.process(0).unwrap();

        assert_eq!(expected.parity(), actual.parity());

        let expected = expected.read_coefficients().unwrap();
        let actual = actual.read_coefficients().unwrap();

        assert_eq!(16, actual.len());
        assert!(actual.values()[0].cmpgt(Vec3::ZERO).all());

        for (expected, actual) in expected.values().iter().zip(actual.values())
        {
            assert_relative_eq!(expected.x, actual.x, epsilon = 1e-3);
            assert_relative_eq!(expected.y, actual.y, epsilon = 1e-3);
            assert_relative_eq!(expected.z, actual.z, epsilon = 1e-3);
        }
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn rejects_other_group_sizes() {
        let (device, queue) = device();
        let config =
            ProbeConfig::default().with_face_size(8).with_group_size(64);

        let actual = LightProbe::new(config, |layout| {
            let source = CubeTexture::from_cubemap(
                &device,
                &queue,
                "sheen_source",
                &CpuCubemap::uniform(8, Vec3::ONE),
            );

            DeviceSubstrate::new(
                device.clone(),
                queue.clone(),
                layout,
                vec![source],
            )
        });

        assert_eq!(Some(Error::UnsupportedGroupSize(64)), actual.err());
    }
}
