use bytemuck::{Pod, Zeroable};

use crate::texel_count;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RadiancePassParams {
    /// Interpolation factor between the two bound sources, `0.0 ..= 1.0`.
    pub blend: f32,
    pub face_size: u32,
    pub _padding: [u32; 2],
}

impl RadiancePassParams {
    pub fn new(blend: f32, face_size: u32) -> Self {
        Self {
            blend,
            face_size,
            _padding: Default::default(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ProjectionPassParams {
    pub order: u32,
    pub face_size: u32,
    pub _padding: [u32; 2],
}

impl ProjectionPassParams {
    pub fn new(order: u32, face_size: u32) -> Self {
        Self {
            order,
            face_size,
            _padding: Default::default(),
        }
    }

    pub fn band_count(&self) -> u32 {
        self.order * self.order
    }

    pub fn texel_count(&self) -> u32 {
        texel_count(self.face_size)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ReductionPassParams {
    pub order: u32,

    /// Number of partial sums present in the source slot.
    pub count: u32,

    pub _padding: [u32; 2],
}

impl ReductionPassParams {
    pub fn new(order: u32, count: u32) -> Self {
        Self {
            order,
            count,
            _padding: Default::default(),
        }
    }

    pub fn band_count(&self) -> u32 {
        self.order * self.order
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct NormalizationPassParams {
    pub order: u32,
    pub _padding: [u32; 3],
}

impl NormalizationPassParams {
    pub fn new(order: u32) -> Self {
        Self {
            order,
            _padding: Default::default(),
        }
    }

    pub fn band_count(&self) -> u32 {
        self.order * self.order
    }
}

/// Value of the status word written by the normalization kernel.
pub const AGGREGATE_VALID: u32 = 0;

/// See: [`AGGREGATE_VALID`].
pub const AGGREGATE_INVALID: u32 = 1;

/// Returns whether given total weight can be used to normalize an aggregate.
pub fn is_valid_weight(weight: f32) -> bool {
    weight.is_finite() && weight > 0.0
}

#[cfg(test)]
mod tests {
    use std::mem;

    use super::*;

    #[test]
    fn params_fit_push_constants() {
        // 16 bytes is what we request from the device
        assert_eq!(16, mem::size_of::<RadiancePassParams>());
        assert_eq!(16, mem::size_of::<ProjectionPassParams>());
        assert_eq!(16, mem::size_of::<ReductionPassParams>());
        assert_eq!(16, mem::size_of::<NormalizationPassParams>());
    }

    #[test]
    fn weight_validity() {
        assert!(is_valid_weight(1.0));
        assert!(is_valid_weight(1e-12));
        assert!(!is_valid_weight(0.0));
        assert!(!is_valid_weight(-1.0));
        assert!(!is_valid_weight(f32::NAN));
        assert!(!is_valid_weight(f32::INFINITY));
    }
}
