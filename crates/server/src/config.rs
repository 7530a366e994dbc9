use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server settings, read from `server.{toml,yaml,json}` and
/// `LIVEPREVIEW_SERVER__*` environment variables. Missing keys fall back to
/// [`ServerConfig::default`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Upper bound for one request, a whole bootstrap run included.
    pub timeout_secs: u64,
    /// Render requests carry full page data.
    pub max_body_size_mb: usize,
    pub enable_cors: bool,
    /// `EnvFilter` directive for the JSON subscriber.
    pub log_level: String,
    /// YAML file listing the previewable repositories.
    pub preview_config: PathBuf,
    /// Add `Secure` to access-token cookies.
    pub cookie_secure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 8787,
            timeout_secs: 60,
            max_body_size_mb: 10,
            enable_cors: true,
            log_level: "info".into(),
            preview_config: PathBuf::from("preview.yaml"),
            cookie_secure: false,
        }
    }
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config: ServerConfig = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("LIVEPREVIEW_SERVER").separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.max_body_size_mb == 0 {
            anyhow::bail!("max_body_size_mb must be greater than zero");
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind_addr, self.port).parse()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
        assert_eq!(cfg.max_body_size(), 10 * 1024 * 1024);
        assert_eq!(cfg.preview_config, PathBuf::from("preview.yaml"));
        assert!(!cfg.cookie_secure);
        assert!(cfg.validate().is_ok());

        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8787);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn partial_settings_keep_defaults() {
        let cfg: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "cookie_secure": true}"#).unwrap();
        assert_eq!(cfg.port, 9000);
        assert!(cfg.cookie_secure);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let zero = ServerConfig {
            timeout_secs: 0,
            ..ServerConfig::default()
        };
        assert!(zero.validate().is_err());

        let bad_addr = ServerConfig {
            bind_addr: "not an address".into(),
            ..ServerConfig::default()
        };
        assert!(bad_addr.validate().is_err());
    }
}
