use std::error::Error as StdError;
use std::io;

use derive_more::{Display, From};

use common_config_parser::ParseError;

/// Aggregated error type for the PBX simulator: every crate in the
/// workspace converts its local failures into this one type at its
/// public boundary.
#[derive(Debug, Display, From)]
pub enum PbxError {
    #[display(fmt = "registry is full, cannot register a new extension")]
    RegistryFull,

    #[display(fmt = "extension {} is not registered", _0)]
    UnknownExtension(u32),

    #[display(fmt = "failed to parse configuration: {}", _0)]
    ConfigParse(ParseError),

    #[display(fmt = "i/o error: {}", _0)]
    Io(io::Error),

    #[display(fmt = "invalid port: must be an integer >= 1024")]
    InvalidPort,
}

impl StdError for PbxError {}

pub type PbxResult<T> = Result<T, PbxError>;
