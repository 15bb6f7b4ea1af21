use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Cap on concurrent sessions joined to one item.
    pub max_sessions_per_item: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9620".parse().expect("static addr"),
            max_sessions_per_item: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:9620".parse::<SocketAddr>().unwrap());
        assert_eq!(c.max_sessions_per_item, 128);
    }

    #[test]
    fn config_roundtrips_through_json() {
        let c = ServerConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bind_addr, c.bind_addr);
    }
}
