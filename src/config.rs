use crate::error::ServerResult;
use serde::Deserialize;

/// Engine and listener settings.
///
/// Every field has a default, so a JSON document only needs the keys it
/// changes:
///
/// ```rust
/// use trellis::config::Config;
///
/// let config = Config::from_json(r#"{ "max_connections": 64 }"#).unwrap();
/// assert_eq!(config.max_connections, 64);
/// assert_eq!(config.context_pool_capacity, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Connections served at the same time by the listener.
    pub max_connections: usize,
    /// Idle contexts kept around for reuse.
    pub context_pool_capacity: usize,
    /// Largest accepted request body, in bytes.
    pub max_body_size: usize,
    pub max_header_count: usize,
    /// Longest accepted request line or header line, in bytes.
    pub max_line_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_connections: 256,
            context_pool_capacity: 1024,
            max_body_size: 4 * 1024 * 1024,
            max_header_count: 100,
            max_line_length: 8 * 1024,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> ServerResult<Config> {
        Ok(serde_json::from_str(json)?)
    }
}
