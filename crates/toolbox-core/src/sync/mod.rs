//! Toolbox re-sync
//!
//! Hosts notify when their toolbox is first used and whenever installed content
//! must be refreshed. `ToolboxSync` keeps the last installed result on the host's
//! behalf so a refresh can remove exactly what was added before.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::{DiscoveryConfig, ModuleRoot};
use crate::engine::{DiscoveryEngine, DiscoveryResult, EngineResult};
use crate::logging::SharedLogger;
use crate::registry::{RegistryReport, ToolRegistry};
use crate::types::CancellationToken;
use crate::{log_debug, log_error, log_info};

/// What one sync did to the registry
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    /// Removal of the previously installed result, if there was one
    pub removed: Option<RegistryReport>,
    pub installed: RegistryReport,
    pub diagnostics: usize,
    /// Discovery was cancelled; only part of the content was installed
    pub partial: bool,
}

/// Keeps a host registry in step with the modules under a set of roots
pub struct ToolboxSync {
    engine: Arc<DiscoveryEngine>,
    registry: Arc<dyn ToolRegistry>,
    roots: Vec<ModuleRoot>,
    content_version: u32,
    token: CancellationToken,
    installed: Mutex<Option<DiscoveryResult>>,
    logger: SharedLogger,
}

impl ToolboxSync {
    pub fn new(
        engine: Arc<DiscoveryEngine>,
        registry: Arc<dyn ToolRegistry>,
        config: &DiscoveryConfig,
        logger: SharedLogger,
    ) -> Self {
        Self {
            engine,
            registry,
            roots: config.roots.clone(),
            content_version: config.content_version,
            token: CancellationToken::new(),
            installed: Mutex::new(None),
            logger,
        }
    }

    /// Use `token` to cancel discovery started by this sync
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Content version the installed items correspond to
    ///
    /// The host compares it with the version it last saw and calls
    /// `on_upgraded` when they differ.
    pub fn content_version(&self) -> u32 {
        self.content_version
    }

    pub fn roots(&self) -> &[ModuleRoot] {
        &self.roots
    }

    /// Snapshot of the result currently installed
    pub async fn installed(&self) -> Option<DiscoveryResult> {
        self.installed.lock().await.clone()
    }

    /// First use of the toolbox: discover and install
    ///
    /// Does nothing and returns `None` when content is already installed.
    pub async fn on_initialized(&self) -> EngineResult<Option<SyncOutcome>> {
        let mut installed = self.installed.lock().await;
        if installed.is_some() {
            log_debug!(self.logger, "[ToolboxSync] Already initialized");
            return Ok(None);
        }

        log_info!(
            self.logger,
            "[ToolboxSync] Initializing content version {}",
            self.content_version
        );
        let (result, outcome) = self.discover_and_install(None).await?;
        *installed = Some(result);
        Ok(Some(outcome))
    }

    /// Content changed: remove what was installed, rediscover, install again
    ///
    /// The previous content stays removed when rediscovery fails.
    pub async fn on_upgraded(&self) -> EngineResult<SyncOutcome> {
        let mut installed = self.installed.lock().await;

        log_info!(
            self.logger,
            "[ToolboxSync] Upgrading to content version {}",
            self.content_version
        );
        let removed = match installed.take() {
            Some(previous) => Some(self.engine.uninstall(&previous, self.registry.as_ref()).await),
            None => None,
        };

        let (result, outcome) = self
            .discover_and_install(removed)
            .await
            .inspect_err(|e| log_error!(self.logger, "[ToolboxSync] Rediscovery failed: {}", e))?;
        *installed = Some(result);
        Ok(outcome)
    }

    async fn discover_and_install(
        &self,
        removed: Option<RegistryReport>,
    ) -> EngineResult<(DiscoveryResult, SyncOutcome)> {
        let result = Arc::clone(&self.engine)
            .discover_concurrent(self.roots.clone(), self.token.clone())
            .await?;
        let report = self.engine.install(&result, self.registry.as_ref()).await;

        let outcome = SyncOutcome {
            removed,
            installed: report,
            diagnostics: result.diagnostics().len(),
            partial: result.is_cancelled(),
        };
        Ok((result, outcome))
    }
}

impl std::fmt::Debug for ToolboxSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolboxSync")
            .field("engine", &self.engine)
            .field("registry", &self.registry.name())
            .field("roots", &self.roots)
            .field("content_version", &self.content_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Logger, NoOpLogger};
    use crate::registry::MemoryToolRegistry;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_module(path: &Path, names: &[&str]) {
        let types: Vec<_> = names
            .iter()
            .map(|name| {
                json!({
                    "full_name": name,
                    "implements": ["component"],
                    "constructors": ["parameterless"]
                })
            })
            .collect();
        let manifest = json!({"format": 1, "types": types});
        fs::write(path, serde_json::to_vec(&manifest).unwrap()).unwrap();
    }

    fn setup(root: &Path) -> (ToolboxSync, Arc<MemoryToolRegistry>) {
        let config = DiscoveryConfig::default().with_root(root);
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let engine = Arc::new(DiscoveryEngine::new(&config, logger.clone()));
        let registry = Arc::new(MemoryToolRegistry::new());
        let sync = ToolboxSync::new(engine, registry.clone(), &config, logger);
        (sync, registry)
    }

    #[tokio::test]
    async fn test_initialize_once() {
        let dir = tempdir().unwrap();
        write_module(&dir.path().join("A.tmod"), &["Acme.Grid", "Acme.Chart"]);
        let (sync, registry) = setup(dir.path());

        let outcome = sync.on_initialized().await.unwrap().unwrap();
        assert_eq!(outcome.installed.attempted, 2);
        assert!(outcome.removed.is_none());
        assert_eq!(registry.len(), 2);

        assert!(sync.on_initialized().await.unwrap().is_none());
        assert_eq!(registry.len(), 2);
        assert_eq!(sync.installed().await.unwrap().len(), 2);
        assert_eq!(sync.content_version(), 1);
    }

    #[tokio::test]
    async fn test_upgrade_replaces_content() {
        let dir = tempdir().unwrap();
        write_module(&dir.path().join("A.tmod"), &["Acme.Grid", "Acme.Chart"]);
        let (sync, registry) = setup(dir.path());
        sync.on_initialized().await.unwrap();

        write_module(&dir.path().join("A.tmod"), &["Acme.Grid", "Acme.Pivot"]);
        let outcome = sync.on_upgraded().await.unwrap();

        assert_eq!(outcome.removed.unwrap().succeeded(), 2);
        assert!(outcome.installed.is_clean());
        assert!(registry.contains("Acme.Pivot"));
        assert!(!registry.contains("Acme.Chart"));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_upgrade_without_previous_install() {
        let dir = tempdir().unwrap();
        write_module(&dir.path().join("A.tmod"), &["Acme.Grid"]);
        let (sync, registry) = setup(dir.path());

        let outcome = sync.on_upgraded().await.unwrap();
        assert!(outcome.removed.is_none());
        assert_eq!(registry.len(), 1);
    }
}
