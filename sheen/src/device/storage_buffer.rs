use log::info;

use crate::device::Bindable;

/// Storage buffer that exists only in VRAM; its contents can be copied out
/// for readback.
#[derive(Debug)]
pub struct StorageBuffer {
    buffer: wgpu::Buffer,
    size: usize,
}

impl StorageBuffer {
    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        size: usize,
    ) -> Self {
        let label = label.as_ref();
        let size = pad_size(size);

        info!("Allocating storage buffer `{label}`; size={size}");

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            size: size as _,
            mapped_at_creation: false,
        });

        Self { buffer, size }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_ro_bind(&self) -> impl Bindable + '_ {
        StorageBufferBinder {
            parent: self,
            read_only: true,
        }
    }

    pub fn as_rw_bind(&self) -> impl Bindable + '_ {
        StorageBufferBinder {
            parent: self,
            read_only: false,
        }
    }
}

pub struct StorageBufferBinder<'a> {
    parent: &'a StorageBuffer,
    read_only: bool,
}

impl Bindable for StorageBufferBinder<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage {
                    read_only: self.read_only,
                },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let resource = self.parent.buffer.as_entire_binding();

        vec![(layout, resource)]
    }
}

/// Rounds size up, so that the buffer can be copied from as a whole.
pub fn pad_size(size: usize) -> usize {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;

    size.max(align).div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding() {
        assert_eq!(4, pad_size(0));
        assert_eq!(4, pad_size(3));
        assert_eq!(12, pad_size(12));
        assert_eq!(16, pad_size(13));
    }
}
