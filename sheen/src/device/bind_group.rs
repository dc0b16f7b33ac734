use crate::device::Bindable;

#[derive(Debug)]
pub struct BindGroup {
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl BindGroup {
    pub fn builder<'ctx>(label: impl ToString) -> BindGroupBuilder<'ctx> {
        BindGroupBuilder {
            label: label.to_string(),
            layouts: Default::default(),
            resources: Default::default(),
        }
    }
}

pub struct BindGroupBuilder<'a> {
    label: String,
    layouts: Vec<wgpu::BindGroupLayoutEntry>,
    resources: Vec<wgpu::BindingResource<'a>>,
}

impl<'a> BindGroupBuilder<'a> {
    pub fn add(mut self, item: &'a dyn Bindable) -> Self {
        for (layout, resource) in item.bind(self.resources.len() as u32) {
            self.layouts.push(layout);
            self.resources.push(resource);
        }

        self
    }

    /// Builds the bind group together with a fresh layout.
    pub fn build(self, device: &wgpu::Device) -> BindGroup {
        let label = format!("sheen_{}", self.label);

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label}_layout")),
                entries: &self.layouts,
            });

        let bind_group =
            Self::create(device, &label, &bind_group_layout, self.resources);

        BindGroup {
            bind_group,
            bind_group_layout,
        }
    }

    /// Builds just the bind group, against a layout created before by
    /// [`Self::build()`] for the same kinds of resources.
    pub fn build_with(
        self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        let label = format!("sheen_{}", self.label);

        Self::create(device, &label, layout, self.resources)
    }

    fn create(
        device: &wgpu::Device,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        resources: Vec<wgpu::BindingResource<'a>>,
    ) -> wgpu::BindGroup {
        let entries: Vec<_> = resources
            .into_iter()
            .enumerate()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: binding as _,
                resource,
            })
            .collect();

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &entries,
        })
    }
}
