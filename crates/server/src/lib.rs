//! Live preview server - HTTP API between the preview UI and the engine
//!
//! The UI layer (toolbar, access-token prompt, preview page) talks to this
//! server; the server owns one [`engine::PreviewEngine`] built from the
//! repository configuration file and keeps preview documents in memory.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /health`, `GET /ready`
//! - `POST /api/v1/preview/bootstrap` - bootstrap from the preview cookie
//! - `POST /api/v1/preview/resolve` - resolve `{documentId, token}` to a path
//! - `POST /api/v1/preview/render` - merge preview nodes into page data
//! - `GET /api/v1/preview/state/{repository}` - bootstrap status
//! - `DELETE /api/v1/preview/session[?repository=]` - drop preview documents
//! - `GET /api/v1/repositories/{repository}/documents/{id}` - one rendered node
//! - `GET|PUT|DELETE /api/v1/repositories/{repository}/access-token`
//!
//! Auth failures answer 401 with code `ACCESS_TOKEN_REQUIRED`; the UI then
//! prompts for a token and `PUT`s it, which also sets the
//! `{repository}.accessToken` cookie.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
