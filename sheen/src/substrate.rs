use glam::UVec3;

use crate::{Result, Slot};

/// Kernels the pipeline is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Blends two environment sources into the radiance cubemap.
    GenerateRadiance,

    /// Projects each texel of the radiance cubemap onto the SH basis,
    /// producing per-group partial sums.
    ShProjection,

    /// Folds up to `G` partial sums into one.
    ShReduction,

    /// Divides the final aggregate by its total weight.
    ShNormalization,
}

impl Kernel {
    pub const ALL: [Kernel; 4] = [
        Kernel::GenerateRadiance,
        Kernel::ShProjection,
        Kernel::ShReduction,
        Kernel::ShNormalization,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Kernel::GenerateRadiance => "generate_radiance",
            Kernel::ShProjection => "sh_projection",
            Kernel::ShReduction => "sh_reduction",
            Kernel::ShNormalization => "sh_normalization",
        }
    }
}

/// Logical resource owned by a substrate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    /// N-th environment source.
    Source(usize),

    /// The synthesized radiance cubemap.
    Radiance,

    /// One half of the double-buffered SH coefficients (RGB per band per
    /// partial sum).
    Coefficients(Slot),

    /// One half of the double-buffered SH weights (one scalar per partial
    /// sum).
    Weights(Slot),

    /// Word written by the normalization kernel, see
    /// [`crate::gpu::AGGREGATE_INVALID`].
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    ShaderRead,
    ShaderWrite,
}

/// Single kernel dispatch.
///
/// Resources are bound in order: first `inputs`, then `outputs`.
#[derive(Clone, Copy, Debug)]
pub struct Dispatch<'a> {
    pub kernel: Kernel,
    pub inputs: &'a [Resource],
    pub outputs: &'a [Resource],

    /// Bytes of kernel's parameters (e.g. [`crate::gpu::ReductionPassParams`]).
    pub params: &'a [u8],

    /// Number of workgroups along each axis.
    pub groups: UVec3,
}

impl Dispatch<'_> {
    /// Checks whether bound resources are of the kinds the kernel expects,
    /// with coefficients and weights always coming from the same slot.
    pub fn has_valid_bindings(&self) -> bool {
        use Resource::*;

        match (self.kernel, self.inputs, self.outputs) {
            (
                Kernel::GenerateRadiance,
                [Source(_), Source(_)],
                [Radiance],
            ) => true,

            (
                Kernel::ShProjection,
                [Radiance],
                [Coefficients(a), Weights(b)],
            ) => a == b,

            (
                Kernel::ShReduction,
                [Coefficients(a), Weights(b)],
                [Coefficients(c), Weights(d)],
            ) => a == b && c == d && a != c,

            (
                Kernel::ShNormalization,
                [Coefficients(a), Weights(b)],
                [Coefficients(c), Weights(d), Status],
            ) => a == b && c == d && a != c,

            _ => false,
        }
    }
}

/// Something that executes the pipeline's kernels: a GPU queue or a host-side
/// emulation of one.
///
/// Dispatches are ordered as they are issued; a dispatch reading a resource
/// written by an earlier one must be separated from it by a
/// [`Self::transition()`] into [`ResourceState::ShaderRead`].
pub trait Substrate {
    /// How the radiance cubemap is exposed to consumers.
    type Texture;

    /// How buffers are exposed to consumers.
    type Buffer;

    fn dispatch(&mut self, dispatch: Dispatch<'_>) -> Result<()>;

    /// Moves resource into given state, making all of the preceding writes to
    /// it visible to the following dispatches.
    fn transition(&mut self, resource: Resource, state: ResourceState);

    /// Hands recorded work over for execution.
    fn submit(&mut self);

    /// Blocks until the first `len` bytes of given buffer resource are
    /// available on the host and returns them.
    fn read(&mut self, resource: Resource, len: usize) -> Result<Vec<u8>>;

    fn source_count(&self) -> usize;

    fn radiance(&self) -> &Self::Texture;

    fn coefficients(&self, slot: Slot) -> &Self::Buffer;

    /// Whether kernels can run with given group size.
    fn supports_group_size(&self, group_size: u32) -> bool {
        group_size >= 2
    }
}
