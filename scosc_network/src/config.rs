//! Configuration for the OSC bridge.
//!
//! Loaded from a TOML file; every field has a default, so an empty file (or no file)
//! is a valid configuration.
//!
//! ```toml
//! udp_port = 57120
//! tcp_port = 57121
//! use_doubles = false
//!
//! [server]
//! num_output_bus_channels = 2
//! sample_rate = 48000
//! ```

use core::net::Ipv4Addr;
use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default language-side UDP port.
pub const DEFAULT_UDP_PORT: u16 = 57120;

/// Listener and transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface the listening sockets bind to.
    pub bind_address: Ipv4Addr,
    /// UDP port for receiving (and sending) OSC. `0` picks a free port.
    pub udp_port: u16,
    /// Optional TCP port accepting length-prefixed OSC streams.
    pub tcp_port: Option<u16>,
    /// How often listener threads wake up to check for shutdown.
    pub recv_timeout_ms: u64,
    /// Inbound TCP frames larger than this close the connection.
    pub max_tcp_frame_bytes: usize,
    /// Initial state of the double-precision encoding flag.
    pub use_doubles: bool,
    /// Options used when booting the in-process server.
    pub server: ServerOptions,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: Ipv4Addr::UNSPECIFIED,
            udp_port: DEFAULT_UDP_PORT,
            tcp_port: None,
            recv_timeout_ms: 100,
            max_tcp_frame_bytes: 1024 * 1024,
            use_doubles: false,
            server: ServerOptions::default(),
        }
    }
}

impl NetworkConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    #[inline(always)]
    pub fn recv_timeout(&self) -> Duration {
        // a zero timeout would make the sockets block forever
        Duration::from_millis(self.recv_timeout_ms.max(1))
    }
}

/// Options record for booting an in-process synthesis server.
///
/// All fields are plain numbers or flags; `None` means "let the engine decide".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    pub num_audio_bus_channels: u32,
    pub num_control_bus_channels: u32,
    pub num_input_bus_channels: u32,
    pub num_output_bus_channels: u32,
    pub num_buffers: u32,
    pub max_nodes: u32,
    pub max_synth_defs: u32,
    /// Control block size, in frames.
    pub block_size: u32,
    pub hardware_buffer_size: Option<u32>,
    /// Real-time memory pool, in kilobytes.
    pub real_time_memory_kb: u32,
    pub num_rgens: u32,
    pub max_wire_bufs: u32,
    pub sample_rate: Option<u32>,
    pub load_synth_defs: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            num_audio_bus_channels: 128,
            num_control_bus_channels: 4096,
            num_input_bus_channels: 8,
            num_output_bus_channels: 8,
            num_buffers: 1024,
            max_nodes: 1024,
            max_synth_defs: 1024,
            block_size: 64,
            hardware_buffer_size: None,
            real_time_memory_kb: 8192,
            num_rgens: 64,
            max_wire_bufs: 64,
            sample_rate: None,
            load_synth_defs: true,
        }
    }
}
