use glam::Vec4;
use log::debug;

use crate::cpu::CpuCubemap;
use crate::device::Bindable;
use crate::gpu;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Size of a single texel of [`FORMAT`], in bytes.
const TEXEL_SIZE: u32 = 16;

/// Cubemap stored as a six-layer texture.
///
/// Kernels see it as a 2D array (so that it can be bound for storage), while
/// consumers can sample it through [`Self::cube_view()`].
#[derive(Debug)]
pub struct CubeTexture {
    tex: wgpu::Texture,
    array_view: wgpu::TextureView,
    cube_view: wgpu::TextureView,
    size: u32,
}

impl CubeTexture {
    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        size: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let label = label.as_ref();

        debug!("Allocating cube texture `{label}`; size={size}");

        assert!(size > 0);

        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label}_tex")),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: gpu::CUBE_FACE_COUNT,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | usage,
            view_formats: &[],
        });

        let array_view = tex.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label}_array_view")),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        let cube_view = tex.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label}_cube_view")),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self {
            tex,
            array_view,
            cube_view,
            size,
        }
    }

    /// Creates a texture with contents of given host-side cubemap.
    pub fn from_cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: impl AsRef<str>,
        cubemap: &CpuCubemap,
    ) -> Self {
        let size = cubemap.size();

        let this =
            Self::new(device, label, size, wgpu::TextureUsages::COPY_DST);

        let texels: Vec<Vec4> = cubemap
            .texels()
            .iter()
            .map(|texel| texel.extend(1.0))
            .collect();

        queue.write_texture(
            this.tex.as_image_copy(),
            bytemuck::cast_slice(&texels),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(size * TEXEL_SIZE),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: gpu::CUBE_FACE_COUNT,
            },
        );

        this
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.tex
    }

    pub fn cube_view(&self) -> &wgpu::TextureView {
        &self.cube_view
    }

    pub fn readable(&self) -> ReadableCubeTexture {
        ReadableCubeTexture { parent: self }
    }

    pub fn writable(&self) -> WritableCubeTexture {
        WritableCubeTexture { parent: self }
    }
}

pub struct ReadableCubeTexture<'a> {
    parent: &'a CubeTexture,
}

impl Bindable for ReadableCubeTexture<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2Array,
                sample_type: wgpu::TextureSampleType::Float {
                    filterable: false,
                },
            },
            count: None,
        };

        let resource =
            wgpu::BindingResource::TextureView(&self.parent.array_view);

        vec![(layout, resource)]
    }
}

pub struct WritableCubeTexture<'a> {
    parent: &'a CubeTexture,
}

impl Bindable for WritableCubeTexture<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2Array,
            },
            count: None,
        };

        let resource =
            wgpu::BindingResource::TextureView(&self.parent.array_view);

        vec![(layout, resource)]
    }
}
