//! Sheen: spherical-harmonic irradiance probe.
//!
//! Each frame the probe blends two environment sources into a radiance
//! cubemap, projects that cubemap onto the SH basis, sums the projection up
//! through a ping-pong reduction tree and normalizes the result by the
//! accumulated solid angle. Kernels run on a [`Substrate`], either on the GPU
//! ([`device::DeviceSubstrate`]) or on the host ([`cpu::CpuSubstrate`]).

#![allow(clippy::len_without_is_empty)]

mod blend;
mod coefficients;
mod config;
pub mod cpu;
pub mod device;
mod double_buffered;
mod error;
mod layout;
#[cfg(feature = "metrics")]
mod metrics;
mod probe;
mod stages;
mod substrate;
mod tracker;

pub use sheen_gpu as gpu;

pub use self::blend::*;
pub use self::coefficients::*;
pub use self::config::*;
pub use self::double_buffered::*;
pub use self::error::*;
pub use self::layout::*;
pub use self::probe::*;
pub use self::stages::*;
pub use self::substrate::*;
pub use self::tracker::*;

/// Number of frames that can be in flight at once, each with its own blend
/// state.
pub const FRAME_COUNT: usize = 3;
