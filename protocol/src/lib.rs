//! Shared types and error aggregation for the PBX simulator: every other
//! crate in the workspace depends on this one for its vocabulary.

pub mod error;
pub mod notify;
pub mod state;

pub use error::{PbxError, PbxResult};
pub use state::TuState;

/// An extension number, assigned by the PBX at registration time and
/// unique while registered. Only uniqueness is required, not any
/// particular numbering scheme -- `core-server`'s `ExtensionAllocator`
/// hands these out with a monotonic counter.
pub type Extension = u32;

/// Default capacity of the PBX registry, overridable via
/// `PbxConfig::max_extensions`.
pub const DEFAULT_MAX_EXTENSIONS: usize = 1024;
