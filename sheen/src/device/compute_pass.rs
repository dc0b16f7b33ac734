use std::ops::Range;

use fxhash::FxHashMap;
use glam::UVec3;
use log::debug;

use crate::device::{BindGroup, BindGroupBuilder};
use crate::Resource;

/// Pipeline of a single kernel, together with bind groups for the resource
/// combinations it has been dispatched with so far.
#[derive(Debug)]
pub struct ComputePass {
    label: String,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_groups: FxHashMap<Vec<Resource>, wgpu::BindGroup>,
    pipeline: wgpu::ComputePipeline,
}

impl ComputePass {
    pub fn builder(label: impl ToString) -> ComputePassBuilder {
        ComputePassBuilder {
            label: label.to_string(),
            params_size: 0,
        }
    }

    pub fn bind_group(
        &self,
        resources: &[Resource],
    ) -> Option<&wgpu::BindGroup> {
        self.bind_groups.get(resources)
    }

    pub fn add_bind_group(
        &mut self,
        device: &wgpu::Device,
        resources: Vec<Resource>,
        bind_group: BindGroupBuilder<'_>,
    ) {
        debug!("Binding pass {}: {resources:?}", self.label);

        let bind_group =
            bind_group.build_with(device, &self.bind_group_layout);

        self.bind_groups.insert(resources, bind_group);
    }

    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        params: &[u8],
        groups: UVec3,
    ) {
        let label = format!("sheen_{}_pass", self.label);

        let mut pass =
            encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&label),
            });

        pass.set_pipeline(&self.pipeline);

        if !params.is_empty() {
            pass.set_push_constants(0, params);
        }

        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(groups.x, groups.y, groups.z);
    }
}

pub struct ComputePassBuilder {
    label: String,
    params_size: u32,
}

impl ComputePassBuilder {
    pub fn params_size(mut self, size: usize) -> Self {
        self.params_size = size as u32;
        self
    }

    /// Builds the pass, deriving its layout from the first bind group it's
    /// going to be used with.
    pub fn build(
        self,
        device: &wgpu::Device,
        (module, entry_point): (&wgpu::ShaderModule, &'static str),
        resources: Vec<Resource>,
        bind_group: BindGroupBuilder<'_>,
    ) -> ComputePass {
        debug!("Initializing pass: {}:{}", self.label, entry_point);

        let BindGroup {
            bind_group,
            bind_group_layout,
        } = bind_group.build(device);

        let push_constant_ranges = if self.params_size > 0 {
            vec![wgpu::PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: Range {
                    start: 0,
                    end: self.params_size,
                },
            }]
        } else {
            vec![]
        };

        let pipeline_layout_label =
            format!("sheen_{}_pipeline_layout", self.label);

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&pipeline_layout_label),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &push_constant_ranges,
            });

        let pipeline_label = format!("sheen_{}_pipeline", self.label);

        let pipeline =
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&pipeline_label),
                layout: Some(&pipeline_layout),
                module,
                entry_point,
            });

        let mut bind_groups = FxHashMap::default();

        bind_groups.insert(resources, bind_group);

        ComputePass {
            label: self.label,
            bind_group_layout,
            bind_groups,
            pipeline,
        }
    }
}
