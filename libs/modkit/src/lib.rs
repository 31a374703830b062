//! # ModKit - Module System
//!
//! Building blocks for applications assembled from modules:
//!
//! - **Contracts**: `Module`, `RestfulModule`, `RestHostModule`, `StatefulModule`
//! - **Explicit registry**: modules are registered by the binary, in order
//! - **Phase-based lifecycle**: init → REST → start → stop
//! - **REST helpers**: typed operation builder, RFC 9457 problems, error boundary
//! - **Traced HTTP client** for calls to other services
//!
//! ## Example
//!
//! ```rust,ignore
//! let registry = ModuleRegistry::builder()
//!     .register_core("api_ingress", ingress.clone())
//!     .register_rest_host("api_ingress", ingress.clone())
//!     .register_stateful("api_ingress", ingress)
//!     .register_core("book_owners", owners.clone())
//!     .register_rest("book_owners", owners)
//!     .build()?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod context;
pub use context::{ConfigError, ConfigProvider, ModuleCtx, ModuleCtxBuilder};

pub mod contracts;
pub use crate::contracts::*;

pub mod registry;
pub use registry::{ModuleRegistry, RegistryBuilder, RegistryError};

pub mod api;
pub use api::{
    ApiError, ApiResult, OpenApiRegistry, OperationBuilder, Problem, ProblemResponse,
};

pub mod http;
pub use http::client::TracedClient;

pub mod runtime;
pub use runtime::{run, RunOptions, ShutdownOptions};
