use serde_derive::Deserialize;

/// Configuration loaded from an optional TOML file via `-c`/`--config`.
/// The listen port stays a required `-p` flag; everything else the
/// registry needs is either a sane default or lives here, as one
/// deserializable struct loaded by `common_config_parser::parse`.
#[derive(Debug, Clone, Deserialize)]
pub struct PbxConfig {
    #[serde(default = "default_max_extensions")]
    pub max_extensions: usize,
}

fn default_max_extensions() -> usize {
    pbx_protocol::DEFAULT_MAX_EXTENSIONS
}

impl Default for PbxConfig {
    fn default() -> Self {
        PbxConfig {
            max_extensions: default_max_extensions(),
        }
    }
}
