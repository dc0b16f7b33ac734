mod normalizer;
mod radiance_synthesizer;
mod tree_reducer;
mod weighted_basis_projector;

pub use self::normalizer::*;
pub use self::radiance_synthesizer::*;
pub use self::tree_reducer::*;
pub use self::weighted_basis_projector::*;
