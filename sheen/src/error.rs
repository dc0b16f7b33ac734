use thiserror::Error;

use crate::{Kernel, Resource, ResourceState, FRAME_COUNT};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("face size must be positive")]
    InvalidFaceSize,

    #[error("face size {0} is too large to be addressed")]
    FaceSizeTooLarge(u32),

    #[error("group size must be at least 2, got {0}")]
    InvalidGroupSize(u32),

    #[error("group size {0} is not supported by this substrate")]
    UnsupportedGroupSize(u32),

    #[error("maximum SH order must be within 1..={limit}, got {max_order}")]
    InvalidMaxOrder { max_order: u32, limit: u32 },

    #[error("SH order must be within 1..={max_order}, got {order}")]
    OrderOutOfRange { order: u32, max_order: u32 },

    #[error("blend period must be positive and finite, got {0}")]
    InvalidPeriod(f64),

    #[error("at least one environment source is required")]
    NoSources,

    #[error("frame slot {0} is out of range 0..{FRAME_COUNT}")]
    FrameSlotOutOfRange(usize),

    #[error("time must be non-negative and finite, got {0}")]
    InvalidTime(f64),

    #[error("aggregate has an invalid total weight ({total_weight})")]
    InvalidAggregate { total_weight: f32 },

    #[error("coefficients are not available yet")]
    NotYetAvailable,

    #[error(
        "{resource:?} is accessed as {expected:?}, but it's in state {actual:?}"
    )]
    Unsynchronized {
        resource: Resource,
        expected: ResourceState,
        actual: Option<ResourceState>,
    },

    #[error("{0:?} is both read and written by the same dispatch")]
    Aliased(Resource),

    #[error("{kernel:?} can't be dispatched with given resources")]
    InvalidBindings { kernel: Kernel },

    #[error("{kernel:?} can't be dispatched with given parameters")]
    InvalidParams { kernel: Kernel },

    #[error("couldn't read {resource:?} back: {reason}")]
    Readback { resource: Resource, reason: String },
}
