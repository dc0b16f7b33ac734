use std::borrow::Cow;

use log::debug;

use crate::Kernel;

macro_rules! kernel_source {
    ($name:literal) => {
        concat!(
            include_str!("shaders/common.wgsl"),
            include_str!(concat!("shaders/", $name, ".wgsl")),
        )
    };
}

#[derive(Debug)]
pub struct Shaders {
    pub generate_radiance: wgpu::ShaderModule,
    pub sh_projection: wgpu::ShaderModule,
    pub sh_reduction: wgpu::ShaderModule,
    pub sh_normalization: wgpu::ShaderModule,
}

impl Shaders {
    pub fn new(device: &wgpu::Device) -> Self {
        debug!("Compiling shaders");

        Self {
            generate_radiance: Self::load(
                device,
                Kernel::GenerateRadiance,
                kernel_source!("generate_radiance"),
            ),
            sh_projection: Self::load(
                device,
                Kernel::ShProjection,
                kernel_source!("sh_projection"),
            ),
            sh_reduction: Self::load(
                device,
                Kernel::ShReduction,
                kernel_source!("sh_reduction"),
            ),
            sh_normalization: Self::load(
                device,
                Kernel::ShNormalization,
                kernel_source!("sh_normalization"),
            ),
        }
    }

    /// Returns module and entry point of given kernel.
    pub fn get(&self, kernel: Kernel) -> (&wgpu::ShaderModule, &'static str) {
        let module = match kernel {
            Kernel::GenerateRadiance => &self.generate_radiance,
            Kernel::ShProjection => &self.sh_projection,
            Kernel::ShReduction => &self.sh_reduction,
            Kernel::ShNormalization => &self.sh_normalization,
        };

        (module, "main")
    }

    fn load(
        device: &wgpu::Device,
        kernel: Kernel,
        source: &'static str,
    ) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("sheen_{}", kernel.label())),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        })
    }
}
