//! Common structs, constants and per-texel math used by Sheen's kernels and
//! by its host-side reference implementation.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod cube;
mod passes;
mod sh;

pub use self::cube::*;
pub use self::passes::*;
pub use self::sh::*;

pub mod prelude {
    pub use core::f32::consts::PI;

    pub use glam::*;

    pub use crate::*;
}

/// Maximum number of spherical-harmonic bands the kernels are compiled for.
pub const SH_MAX_ORDER: u32 = 6;

/// Maximum number of coefficients (`SH_MAX_ORDER²`).
pub const SH_MAX_COEFFS: usize = (SH_MAX_ORDER * SH_MAX_ORDER) as usize;

/// Number of lanes in a single projection / reduction workgroup.
pub const SH_GROUP_SIZE: u32 = 32;

/// Default edge length of a single face of the radiance cubemap.
pub const SH_FACE_SIZE: u32 = 256;

/// Edge length of the tile processed by a single radiance-generation
/// workgroup.
pub const RADIANCE_TILE_SIZE: u32 = 8;

/// Number of faces in a cubemap.
pub const CUBE_FACE_COUNT: u32 = 6;

/// Solid angle of the whole sphere; projected partial sums are scaled by it so
/// that dividing by the accumulated texel solid angle yields `∫ L·Y dω`.
pub const SPHERE_SOLID_ANGLE: f32 = 4.0 * core::f32::consts::PI;
