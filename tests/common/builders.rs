//! Builders for test configurations

use scope_rs::config::{ChannelConfig, ScopeConfig, SourceConfig, TransportConfig};

/// Builder for scope configs used in tests
pub struct ConfigBuilder {
    transport: TransportConfig,
    channels: usize,
    depth: usize,
    regex: Option<String>,
    read_timeout_ms: u64,
}

impl ConfigBuilder {
    /// UDP source on localhost
    pub fn udp(port: u16) -> Self {
        Self::with_transport(TransportConfig::Udp {
            port,
            bind_address: "127.0.0.1".to_string(),
            max_datagram: 1024,
        })
    }

    /// `sh -c <script>` as the source
    pub fn shell(script: &str) -> Self {
        Self::with_transport(TransportConfig::ProgramOutput {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        })
    }

    fn with_transport(transport: TransportConfig) -> Self {
        Self {
            transport,
            channels: 1,
            depth: 8,
            regex: None,
            read_timeout_ms: 20,
        }
    }

    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn regex(mut self, regex: &str) -> Self {
        self.regex = Some(regex.to_string());
        self
    }

    pub fn build(self) -> ScopeConfig {
        let mut source = SourceConfig::new(self.transport);
        source.read_timeout_ms = self.read_timeout_ms;
        if let Some(regex) = self.regex {
            source = source.with_regex(regex);
        }
        let channels = (0..self.channels)
            .map(|i| ChannelConfig::new(format!("ch{}", i), "V"))
            .collect();
        ScopeConfig::new(source, channels).with_depth(self.depth)
    }
}
