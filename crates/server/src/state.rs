use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use engine::PreviewEngine;
use livepreview::{engine_from_config, LivePreviewConfig};
use std::sync::Arc;
use store::SnapshotOptions;
use tokio_util::sync::CancellationToken;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Preview engine shared by every request
    pub engine: Arc<PreviewEngine>,

    /// Snapshot options used when rendering preview nodes
    pub snapshot: SnapshotOptions,

    /// Cancelled on shutdown; every preview run gets a child token
    pub shutdown: CancellationToken,
}

impl ServerState {
    /// Create server state from the preview configuration file named in `config`
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let preview = LivePreviewConfig::from_file(&config.preview_config)
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let engine =
            engine_from_config(&preview).map_err(|err| ServerError::Config(err.to_string()))?;
        Ok(Self::with_engine(config, engine, preview.snapshot))
    }

    /// Create server state around an already built engine
    pub fn with_engine(config: ServerConfig, engine: PreviewEngine, snapshot: SnapshotOptions) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            snapshot,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token for one preview run, cancelled with the server
    pub fn run_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// `requested`, or the only configured repository when none is named
    pub fn repository(&self, requested: Option<&str>) -> ServerResult<String> {
        let registry = self.engine.repositories();
        match requested {
            Some(name) => {
                registry
                    .get(name)
                    .ok_or_else(|| engine::PreviewError::UnknownRepository(name.to_owned()))?;
                Ok(name.to_owned())
            }
            None => match registry.names().as_slice() {
                [only] => Ok(only.to_string()),
                _ => Err(ServerError::BadRequest(
                    "'repository' is required when several repositories are configured".into(),
                )),
            },
        }
    }
}
