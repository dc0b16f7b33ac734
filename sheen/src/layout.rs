use std::mem;

use glam::Vec3;

use crate::{gpu, ProbeConfig, Result};

/// Sizes derived from a validated [`ProbeConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeLayout {
    pub face_size: u32,
    pub group_size: u32,
    pub max_order: u32,

    /// Number of texels in the radiance cubemap (`T = 6·S·S`).
    pub texel_count: u32,

    /// Number of projection workgroups (`⌈T / G⌉`).
    pub group_count: u32,
}

impl ProbeLayout {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        config.validate()?;

        let texel_count = gpu::texel_count(config.face_size);
        let group_count = texel_count.div_ceil(config.group_size);

        Ok(Self {
            face_size: config.face_size,
            group_size: config.group_size,
            max_order: config.max_order,
            texel_count,
            group_count,
        })
    }

    /// Number of entries in each coefficient buffer.
    ///
    /// Both slots are allocated for the level-0 partial sums, so that either
    /// of them can act as the destination of any reduction level.
    pub fn coefficient_capacity(&self) -> usize {
        let bands = (self.max_order * self.max_order) as usize;

        bands * self.group_count as usize
    }

    /// Number of entries in each weight buffer (one weight per group,
    /// regardless of the order).
    pub fn weight_capacity(&self) -> usize {
        self.group_count as usize
    }

    pub fn coefficient_buffer_size(&self) -> usize {
        self.coefficient_capacity() * mem::size_of::<Vec3>()
    }

    pub fn weight_buffer_size(&self) -> usize {
        self.weight_capacity() * mem::size_of::<f32>()
    }

    /// Number of partial sums entering each reduction iteration.
    pub fn reduction_levels(&self) -> ReductionLevels {
        ReductionLevels::new(self.group_count, self.group_size)
    }

    pub fn reduction_iterations(&self) -> usize {
        self.reduction_levels().count()
    }
}

/// Sequence `n₀ = groups, nₖ₊₁ = ⌈nₖ / G⌉`, yielding every `nₖ > 1`.
#[derive(Clone, Debug)]
pub struct ReductionLevels {
    count: u32,
    group_size: u32,
}

impl ReductionLevels {
    pub fn new(group_count: u32, group_size: u32) -> Self {
        assert!(group_size >= 2);

        Self {
            count: group_count,
            group_size,
        }
    }
}

impl Iterator for ReductionLevels {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.count <= 1 {
            return None;
        }

        let count = self.count;

        self.count = count.div_ceil(self.group_size);

        Some(count)
    }
}
