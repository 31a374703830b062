use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use thiserror::Error;

use crate::context;
use crate::contracts;

pub struct ModuleEntry {
    pub name: &'static str,
    pub core: Arc<dyn contracts::Module>,
    pub rest: Option<Arc<dyn contracts::RestfulModule>>,
    pub rest_host: Option<Arc<dyn contracts::RestHostModule>>,
    pub stateful: Option<Arc<dyn contracts::StatefulModule>>,
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("has_rest", &self.rest.is_some())
            .field("is_rest_host", &self.rest_host.is_some())
            .field("has_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// Modules in registration order; every phase walks them in that order
/// (stop walks it in reverse).
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    pub async fn run_init_phase(&self, base_ctx: &context::ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            let ctx = base_ctx.clone().for_module(e.name);
            e.core
                .init(&ctx)
                .await
                .map_err(|source| RegistryError::Init {
                    module: e.name,
                    source,
                })?;
            tracing::debug!(module = e.name, "module initialized");
        }
        Ok(())
    }

    pub fn run_rest_phase(
        &self,
        base_ctx: &context::ModuleCtx,
        mut router: Router,
    ) -> Result<Router, RegistryError> {
        let mut hosts = self
            .modules
            .iter()
            .filter_map(|e| e.rest_host.as_ref().map(|h| (e.name, h)));

        let Some((host_name, host)) = hosts.next() else {
            return if self.modules.iter().any(|e| e.rest.is_some()) {
                Err(RegistryError::RestRequiresHost)
            } else {
                Ok(router)
            };
        };
        if hosts.next().is_some() {
            return Err(RegistryError::MultipleRestHosts);
        }

        let host_ctx = base_ctx.clone().for_module(host_name);
        let registry: &dyn contracts::OpenApiRegistry = host.as_registry();

        router = host
            .rest_prepare(&host_ctx, router)
            .map_err(|source| RegistryError::RestPrepare {
                module: host_name,
                source,
            })?;

        for e in &self.modules {
            if let Some(rest) = &e.rest {
                let ctx = base_ctx.clone().for_module(e.name);
                router = rest
                    .register_rest(&ctx, router, registry)
                    .map_err(|source| RegistryError::RestRegister {
                        module: e.name,
                        source,
                    })?;
            }
        }

        host.rest_finalize(&host_ctx, router)
            .map_err(|source| RegistryError::RestFinalize {
                module: host_name,
                source,
            })
    }

    pub async fn run_start_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(s) = &e.stateful {
                s.start(cancel.clone())
                    .await
                    .map_err(|source| RegistryError::Start {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Stops stateful modules in reverse order; failures are logged, not returned.
    pub async fn run_stop_phase(&self, cancel: CancellationToken) {
        for e in self.modules.iter().rev() {
            if let Some(s) = &e.stateful {
                if let Err(err) = s.stop(cancel.clone()).await {
                    tracing::warn!(module = e.name, error = %err, "Failed to stop module");
                }
            }
        }
    }
}

/// Collects modules and their capabilities. Keys are module names; the
/// core (`Module`) must be registered before any capability of the same name.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<ModuleEntry>,
    errors: Vec<String>,
}

impl RegistryBuilder {
    fn entry_mut(&mut self, name: &'static str, capability: &str) -> Option<&mut ModuleEntry> {
        let found = self.entries.iter_mut().find(|e| e.name == name);
        if found.is_none() {
            self.errors.push(format!(
                "Capability '{capability}' registered for unknown module '{name}'"
            ));
        }
        found
    }

    pub fn register_core(mut self, name: &'static str, m: Arc<dyn contracts::Module>) -> Self {
        if self.entries.iter().any(|e| e.name == name) {
            self.errors
                .push(format!("Module '{name}' is already registered"));
            return self;
        }
        self.entries.push(ModuleEntry {
            name,
            core: m,
            rest: None,
            rest_host: None,
            stateful: None,
        });
        self
    }

    pub fn register_rest(mut self, name: &'static str, m: Arc<dyn contracts::RestfulModule>) -> Self {
        if let Some(e) = self.entry_mut(name, "rest") {
            e.rest = Some(m);
        }
        self
    }

    pub fn register_rest_host(
        mut self,
        name: &'static str,
        m: Arc<dyn contracts::RestHostModule>,
    ) -> Self {
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.rest_host.is_some())
            .map(|e| e.name)
        {
            self.errors.push(format!(
                "Multiple REST host modules detected: '{existing}' and '{name}'. Only one REST host is allowed."
            ));
            return self;
        }
        if let Some(e) = self.entry_mut(name, "rest_host") {
            e.rest_host = Some(m);
        }
        self
    }

    pub fn register_stateful(
        mut self,
        name: &'static str,
        m: Arc<dyn contracts::StatefulModule>,
    ) -> Self {
        if let Some(e) = self.entry_mut(name, "stateful") {
            e.stateful = Some(m);
        }
        self
    }

    pub fn build(self) -> Result<ModuleRegistry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration {
                errors: self.errors,
            });
        }

        tracing::info!(
            modules = ?self.entries.iter().map(|e| e.name).collect::<Vec<_>>(),
            "Module order resolved"
        );

        Ok(ModuleRegistry {
            modules: self.entries,
        })
    }
}

/// Structured errors for the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for '{module}'")]
    Start {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST prepare failed for host module '{module}'")]
    RestPrepare {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST finalize failed for host module '{module}'")]
    RestFinalize {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST phase requires an ingress host: modules with capability 'rest' found, but no module with capability 'rest_host'")]
    RestRequiresHost,
    #[error("multiple 'rest_host' modules detected; exactly one is allowed")]
    MultipleRestHosts,
    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}
