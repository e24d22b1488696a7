//! Bridge configuration
//!
//! Loaded once from TOML at startup and validated before the node starts.
//! Nothing here changes while the bridge runs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::channel::{ChannelBinding, ChannelRole};
use crate::constants::{ARTNET_PORT, DEFAULT_FLUSH_PERIOD_MS, DEFAULT_HTTP_PORT};
use crate::dmx::BusId;
use crate::error::ConfigError;
use crate::routing::{Direction, NodeAddress, Route, RouteTable};
use crate::scheduler::OutputAddress;

/// Node identity used to filter inbound frames
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub net: u8,
    pub subnet: u8,
    pub universe: u8,
}

/// Outbound transmission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Unicast target; broadcast when absent
    pub address: Option<Ipv4Addr>,
    pub net: u8,
    pub subnet: u8,
    pub flush_period_ms: u64,
    pub continuous: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            address: None,
            net: 0,
            subnet: 0,
            flush_period_ms: DEFAULT_FLUSH_PERIOD_MS,
            continuous: false,
        }
    }
}

/// UDP socket settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: IpAddr,
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: ARTNET_PORT,
        }
    }
}

impl NetworkConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// Status API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub enabled: bool,
    pub bind_address: IpAddr,
    pub http_port: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

/// A configured route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub bus: BusId,
    pub universe: u8,
    pub direction: Direction,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl RouteConfig {
    pub fn to_route(&self) -> Route {
        Route::new(self.bus, self.universe, self.direction, self.enabled)
    }
}

/// A configured channel binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub universe: u8,
    pub channel: u16,
    pub role: ChannelRole,
}

impl ChannelConfig {
    pub fn binding(&self) -> Result<ChannelBinding, ConfigError> {
        ChannelBinding::new(self.universe, self.channel)
    }
}

fn default_true() -> bool {
    true
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub node: NodeConfig,
    pub output: OutputConfig,
    pub network: NetworkConfig,
    pub ui: UiConfig,
    pub routes: Vec<RouteConfig>,
    pub channels: Vec<ChannelConfig>,
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Platform config location, e.g. `~/.config/artnet-bridge/bridge.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "artnet-bridge")
            .map(|dirs| dirs.config_dir().join("bridge.toml"))
    }

    pub fn node_address(&self) -> Result<NodeAddress, ConfigError> {
        NodeAddress::new(self.node.net, self.node.subnet, self.node.universe)
    }

    pub fn output_address(&self) -> Result<OutputAddress, ConfigError> {
        OutputAddress::new(
            self.output.address,
            self.output.net,
            self.output.subnet,
            Duration::from_millis(self.output.flush_period_ms),
            self.output.continuous,
        )
    }

    /// Check every range and uniqueness rule without building the node
    pub fn validate(&self) -> crate::Result<()> {
        self.node_address()?;
        self.output_address()?;
        RouteTable::from_routes(self.routes.iter().map(RouteConfig::to_route))?;

        let mut names = HashSet::new();
        for channel in &self.channels {
            channel.binding()?;
            if !names.insert(channel.name.as_str()) {
                return Err(ConfigError::DuplicateChannelName(channel.name.clone()).into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RouteError};

    const SAMPLE: &str = r#"
        [node]
        net = 1
        subnet = 2
        universe = 0

        [output]
        address = "192.168.1.50"
        net = 1
        subnet = 3
        flush_period_ms = 50
        continuous = true

        [[routes]]
        bus = 1
        universe = 0
        direction = "to_dmx"

        [[routes]]
        bus = 2
        universe = 4
        direction = "to_artnet"
        enabled = false

        [[channels]]
        name = "dimmer"
        universe = 0
        channel = 1
        role = "output"

        [[channels]]
        name = "fader"
        universe = 0
        channel = 2
        role = "sensor"
    "#;

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.node.net, 1);
        assert_eq!(config.output.address, Some(Ipv4Addr::new(192, 168, 1, 50)));
        assert!(config.output.continuous);
        assert_eq!(config.routes.len(), 2);
        assert!(config.routes[0].enabled);
        assert!(!config.routes[1].enabled);
        assert_eq!(config.routes[1].direction, Direction::ToArtnet);
        assert_eq!(config.channels[1].role, ChannelRole::Sensor);
        assert_eq!(config.network.port, 6454);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = AppConfig::from_toml_str(include_str!("../config/bridge.toml")).unwrap();

        assert_eq!(config.routes.len(), 3);
        assert_eq!(config.output.subnet, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            AppConfig::load("/nonexistent/bridge.toml"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config.output.flush_period_ms, 100);
        assert!(config.output.address.is_none());
        assert!(!config.output.continuous);
        assert_eq!(config.ui.http_port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut config = AppConfig::default();
        config.node.net = 128;
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::NetOutOfRange(128)))
        ));

        let mut config = AppConfig::default();
        config.output.subnet = 16;
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::SubnetOutOfRange(16)))
        ));

        let mut config = AppConfig::default();
        config.channels.push(ChannelConfig {
            name: "bad".into(),
            universe: 0,
            channel: 600,
            role: ChannelRole::Output,
        });
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::ChannelOutOfRange(600)))
        ));
    }

    #[test]
    fn test_duplicate_bus_rejected() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.routes.push(RouteConfig {
            bus: BusId(1),
            universe: 9,
            direction: Direction::ToArtnet,
            enabled: true,
        });

        assert!(matches!(
            config.validate(),
            Err(Error::Route(RouteError::DuplicateRoute(BusId(1))))
        ));
    }

    #[test]
    fn test_duplicate_channel_name_rejected() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.channels.push(ChannelConfig {
            name: "dimmer".into(),
            universe: 1,
            channel: 1,
            role: ChannelRole::Output,
        });

        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::DuplicateChannelName(_)))
        ));
    }

    #[test]
    fn test_unknown_direction_is_parse_error() {
        let source = r#"
            [[routes]]
            bus = 1
            universe = 0
            direction = "sideways"
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(source),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_round_trip_keeps_routes() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        let reparsed = AppConfig::from_toml_str(&text).unwrap();

        assert_eq!(reparsed.routes.len(), 2);
        assert_eq!(reparsed.channels[0].name, "dimmer");
    }
}
