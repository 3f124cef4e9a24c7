//! Configuration module for scope-rs
//!
//! A scope configuration describes where records come from, how many channels
//! each record carries, and how the window is displayed. Files are JSON by
//! default; a `.toml` extension selects TOML.
//!
//! # Format
//!
//! ```json
//! {
//!     "source": {
//!         "type": "udp",
//!         "params": { "port": 9000 },
//!         "regex": "(.+)"
//!     },
//!     "channels": {
//!         "voltage": { "unit": "V" },
//!         "current": { "unit": "A" }
//!     },
//!     "scope": { "x_depth": 500, "width": 800, "height": 480, "y_min": -5, "y_max": 15 }
//! }
//! ```
//!
//! Source types and their parameters:
//!
//! - `udp`: `port`, optional `bind_address` and `max_datagram`
//! - `serial`: `port` (device path), `baudrate`
//! - `program_output` (alias `process_output`): `command`, optional `args`
//!
//! `channels` may also be a list of `{ "name": ..., "unit": ... }` objects.
//! Either way, channel order is the order in the file.
//!
//! # Default Location
//!
//! When no path is given, the configuration is read from the platform config
//! directory, e.g. `~/.config/dev.scope-rs/scope.json` on Linux.

pub mod settings;

pub use settings::*;

use crate::acquisition::parser::{compile_pattern, DEFAULT_PATTERN};
use crate::error::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "dev.scope-rs";

/// Default config filename
pub const CONFIG_FILE: &str = "scope.json";

/// Default timeout for a single transport read in milliseconds.
///
/// Bounds how long `stop()` can wait on an idle transport.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// Default UDP receive buffer size in bytes
pub const DEFAULT_MAX_DATAGRAM: usize = 1024;

/// Default UDP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Path of the default configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

// ==================== Transport ====================

/// Transport selection with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum TransportConfig {
    /// Datagram socket bound to a local port
    Udp {
        port: u16,
        bind_address: String,
        max_datagram: usize,
    },
    /// Serial device
    Serial { port: String, baudrate: u32 },
    /// Standard output of a spawned command
    ProgramOutput { command: String, args: Vec<String> },
}

impl TransportConfig {
    /// Config name of the transport kind
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Udp { .. } => "udp",
            TransportConfig::Serial { .. } => "serial",
            TransportConfig::ProgramOutput { .. } => "program_output",
        }
    }
}

/// Record source: transport plus record matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSourceConfig", into = "RawSourceConfig")]
pub struct SourceConfig {
    /// Where records come from
    pub transport: TransportConfig,
    /// Pattern applied to each record; its first capture group is the payload
    pub regex: String,
    /// Upper bound on a single blocking read
    pub read_timeout_ms: u64,
}

impl SourceConfig {
    /// Source with the default pattern and read timeout
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            regex: DEFAULT_PATTERN.to_string(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }

    /// Replace the record pattern
    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = regex.into();
        self
    }

    /// Read timeout as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// `port` is a number for UDP and a device path for serial
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PortParam {
    Number(u16),
    Name(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawSourceParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<PortParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bind_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_datagram: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    baudrate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    args: Option<Vec<String>>,
}

/// On-disk shape of the `source` section
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSourceConfig {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    read_timeout_ms: Option<u64>,
    // Last, so TOML output keeps plain values ahead of the params table
    #[serde(default)]
    params: RawSourceParams,
}

fn missing(kind: &str, param: &str) -> String {
    format!("{} source requires parameter '{}'", kind, param)
}

impl TryFrom<RawSourceConfig> for SourceConfig {
    type Error = String;

    fn try_from(raw: RawSourceConfig) -> std::result::Result<Self, Self::Error> {
        let params = raw.params;
        let transport = match raw.kind.as_str() {
            "udp" => {
                let port = match params.port {
                    Some(PortParam::Number(port)) => port,
                    Some(PortParam::Name(name)) => name
                        .parse()
                        .map_err(|_| format!("udp port must be a number, got {:?}", name))?,
                    None => return Err(missing("udp", "port")),
                };
                TransportConfig::Udp {
                    port,
                    bind_address: params
                        .bind_address
                        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
                    max_datagram: params.max_datagram.unwrap_or(DEFAULT_MAX_DATAGRAM),
                }
            }
            "serial" => TransportConfig::Serial {
                port: match params.port {
                    Some(PortParam::Name(name)) => name,
                    Some(PortParam::Number(n)) => {
                        return Err(format!("serial port must be a device path, got {}", n))
                    }
                    None => return Err(missing("serial", "port")),
                },
                baudrate: params.baudrate.ok_or_else(|| missing("serial", "baudrate"))?,
            },
            "program_output" | "process_output" => TransportConfig::ProgramOutput {
                command: params
                    .command
                    .ok_or_else(|| missing("program_output", "command"))?,
                args: params.args.unwrap_or_default(),
            },
            other => return Err(format!("Unknown source type {:?}", other)),
        };

        Ok(SourceConfig {
            transport,
            regex: raw.regex.unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
            read_timeout_ms: raw.read_timeout_ms.unwrap_or(DEFAULT_READ_TIMEOUT_MS),
        })
    }
}

impl From<SourceConfig> for RawSourceConfig {
    fn from(source: SourceConfig) -> Self {
        let mut params = RawSourceParams::default();
        let kind = source.transport.kind().to_string();
        match source.transport {
            TransportConfig::Udp {
                port,
                bind_address,
                max_datagram,
            } => {
                params.port = Some(PortParam::Number(port));
                params.bind_address = Some(bind_address);
                params.max_datagram = Some(max_datagram);
            }
            TransportConfig::Serial { port, baudrate } => {
                params.port = Some(PortParam::Name(port));
                params.baudrate = Some(baudrate);
            }
            TransportConfig::ProgramOutput { command, args } => {
                params.command = Some(command);
                params.args = Some(args);
            }
        }
        RawSourceConfig {
            kind,
            params,
            regex: Some(source.regex),
            read_timeout_ms: Some(source.read_timeout_ms),
        }
    }
}

// ==================== Channels ====================

/// One channel of the record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Display name
    pub name: String,
    /// Unit shown next to the name
    #[serde(default)]
    pub unit: String,
}

impl ChannelConfig {
    /// Create a channel description
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }

    /// Label used by the display, e.g. `voltage (V)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.unit)
    }
}

/// Accepts either a list of channels or a `name -> { unit }` map, keeping file order
mod channel_list {
    use super::ChannelConfig;
    use serde::de::{MapAccess, SeqAccess, Visitor};
    use serde::{Deserialize, Deserializer};
    use std::fmt;

    #[derive(Deserialize)]
    struct UnitOnly {
        #[serde(default)]
        unit: String,
    }

    struct ChannelsVisitor;

    impl<'de> Visitor<'de> for ChannelsVisitor {
        type Value = Vec<ChannelConfig>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of channels or a map of channel name to unit")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut channels = Vec::new();
            while let Some(channel) = seq.next_element::<ChannelConfig>()? {
                channels.push(channel);
            }
            Ok(channels)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut channels = Vec::new();
            while let Some((name, spec)) = map.next_entry::<String, UnitOnly>()? {
                channels.push(ChannelConfig {
                    name,
                    unit: spec.unit,
                });
            }
            Ok(channels)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ChannelConfig>, D::Error> {
        d.deserialize_any(ChannelsVisitor)
    }
}

// ==================== Logging ====================

/// Logging options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// `EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

// ==================== Scope Config ====================

/// Complete scope configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Record source
    pub source: SourceConfig,

    /// Channels, in record field order
    #[serde(deserialize_with = "channel_list::deserialize")]
    pub channels: Vec<ChannelConfig>,

    /// Display settings; `x_depth` is also the buffer depth
    #[serde(default)]
    pub scope: ScopeSettings,

    /// Logging options
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScopeConfig {
    /// Create a config with default display and logging settings
    pub fn new(source: SourceConfig, channels: Vec<ChannelConfig>) -> Self {
        Self {
            source,
            channels,
            scope: ScopeSettings::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Set the buffer depth
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.scope.x_depth = depth;
        self
    }

    /// Number of channels per record
    pub fn dimension(&self) -> usize {
        self.channels.len()
    }

    /// Samples kept per channel
    pub fn depth(&self) -> usize {
        self.scope.x_depth
    }

    /// Display labels, one per channel
    pub fn channel_labels(&self) -> Vec<String> {
        self.channels.iter().map(ChannelConfig::label).collect()
    }

    /// Parse a config from a string; `toml` selects the TOML format
    pub fn from_str_with_format(content: &str, toml: bool) -> Result<Self> {
        let config: Self = if toml {
            toml::from_str(content)
                .map_err(|e| ScopeError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            serde_json::from_str(content)
                .map_err(|e| ScopeError::Config(format!("Failed to parse config: {}", e)))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScopeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_str_with_format(&content, is_toml(path))
            .map_err(|e| e.with_context(format!("Loading {}", path.display())))
    }

    /// Save the config, format chosen by extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self).map_err(|e| ScopeError::Serialization(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| ScopeError::Serialization(e.to_string()))?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check everything that must hold before acquisition starts
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.channels.is_empty() {
            problems.push("at least one channel is required".to_string());
        }
        problems.extend(self.scope.problems());

        if let Err(e) = compile_pattern(&self.source.regex) {
            problems.push(e.to_string());
        }
        if self.source.read_timeout_ms == 0 {
            problems.push("source.read_timeout_ms must be non-zero".to_string());
        }

        match &self.source.transport {
            TransportConfig::Udp { max_datagram, .. } if *max_datagram == 0 => {
                problems.push("udp max_datagram must be non-zero".to_string());
            }
            TransportConfig::Serial { port, baudrate } => {
                if port.is_empty() {
                    problems.push("serial port path is empty".to_string());
                }
                if *baudrate == 0 {
                    problems.push("serial baudrate must be non-zero".to_string());
                }
            }
            TransportConfig::ProgramOutput { command, .. } if command.trim().is_empty() => {
                problems.push("program_output command is empty".to_string());
            }
            _ => {}
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ScopeError::Config(problems.join("; ")))
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}
