//! Preview session orchestration.
//!
//! [`PreviewEngine`] ties together the repository registry, the shared
//! [`store::DocumentStore`], a [`ClientFactory`] and a
//! [`client::ManifestSource`]. It drives two state machines:
//!
//! - **bootstrap**: a full repository preview started from the preview
//!   cookie. Fetches every document at the preview ref (or only what a
//!   release changes), then the linked-document closure.
//! - **resolve**: a single-document preview started from `documentId` and
//!   `token` query parameters. Fetches one document and yields the path to
//!   navigate to.
//!
//! Neither machine returns `Err`: failures end in a `Failed` state whose
//! [`PreviewError::kind`] tells the UI what to do.
mod bootstrap;
mod closure;
mod engine;
mod error;
mod factory;
mod resolver;
mod session;

pub use crate::bootstrap::{BootstrapEvent, BootstrapState, BootstrapSummary};
pub use crate::closure::{ClosureConfig, ClosureFetcher, ClosureReport};
pub use crate::engine::PreviewEngine;
pub use crate::error::{ErrorKind, PreviewError};
pub use crate::factory::{ClientFactory, HttpClientFactory};
pub use crate::resolver::{Resolution, ResolverEvent, ResolverState};
pub use crate::session::{
    access_token_cookie_name, cookie_value, PreviewSession, ResolverParams,
    ACCESS_TOKEN_COOKIE_SUFFIX, PREVIEW_COOKIE,
};
