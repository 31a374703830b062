use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Provider of module-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    /// Returns raw JSON section for the module, if any.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

impl ConfigProvider for runtime::AppConfigProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        runtime::AppConfigProvider::get_module_config(self, module_name)
    }
}

/// Errors from strict module config lookups.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("context is not scoped to a module")]
    Unscoped,
    #[error("no config provider attached")]
    NoProvider,
    #[error("missing config section for module '{module}'")]
    MissingConfigSection { module: String },
    #[error("invalid config for module '{module}': {source}")]
    InvalidConfig {
        module: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone)]
pub struct ModuleCtx {
    pub(crate) config_provider: Option<Arc<dyn ConfigProvider>>,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) module_name: Option<Arc<str>>,
}

pub struct ModuleCtxBuilder {
    inner: ModuleCtx,
}

impl ModuleCtxBuilder {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            inner: ModuleCtx {
                config_provider: None,
                cancellation_token: token,
                module_name: None,
            },
        }
    }

    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }

    /// Scope the context to `name`; the registry does this per module.
    pub fn for_module(mut self, name: &str) -> Self {
        self.inner.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn build(self) -> ModuleCtx {
        self.inner
    }
}

impl ModuleCtx {
    pub(crate) fn for_module(mut self, name: &str) -> Self {
        self.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Strict: deserialize the module's config into `T`, failing with a typed error.
    pub fn module_config_required<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let name = self.module_name.as_deref().ok_or(ConfigError::Unscoped)?;
        let prov = self
            .config_provider
            .as_ref()
            .ok_or(ConfigError::NoProvider)?;
        let val = prov
            .get_module_config(name)
            .ok_or_else(|| ConfigError::MissingConfigSection {
                module: name.to_string(),
            })?;

        serde_json::from_value(val.clone()).map_err(|source| ConfigError::InvalidConfig {
            module: name.to_string(),
            source,
        })
    }
}
