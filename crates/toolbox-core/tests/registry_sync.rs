//! Install and uninstall against a host registry

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tempfile::tempdir;
use toolbox_core::{
    Descriptor, DiscoveryConfig, DiscoveryEngine, DiscoveryResult, Logger, NoOpLogger,
    RegistryError, RegistryResult, ToolRegistry, ToolboxSync,
};

/// Registry that only counts; the count returns to zero after a full uninstall
#[derive(Default)]
struct CountingRegistry {
    live: AtomicI64,
    adds: AtomicUsize,
    removes: AtomicUsize,
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ToolRegistry for CountingRegistry {
    fn name(&self) -> &str {
        "counting"
    }

    async fn add(&self, descriptor: &Descriptor, group: &str) -> RegistryResult<()> {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .push((descriptor.tool_type.clone(), group.to_string()));
        Ok(())
    }

    async fn remove(&self, descriptor: &Descriptor) -> RegistryResult<()> {
        if descriptor.tool_type.ends_with("Sticky") {
            return Err(RegistryError::rejected(&descriptor.tool_type, "pinned by user"));
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.removes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn write_module(path: &Path, types: serde_json::Value) {
    let manifest = json!({ "format": 1, "types": types });
    fs::write(path, serde_json::to_vec(&manifest).unwrap()).unwrap();
}

fn tool(name: &str, group: Option<&str>) -> serde_json::Value {
    let mut ty = json!({
        "full_name": name,
        "implements": ["component"],
        "constructors": ["parameterless"]
    });
    if let Some(group) = group {
        ty["attributes"] = json!([{"type": "ToolboxTabName", "args": [group]}]);
    }
    ty
}

fn discover(root: &Path) -> (DiscoveryEngine, DiscoveryResult) {
    let config = DiscoveryConfig::default().with_root(root);
    let engine = DiscoveryEngine::new(&config, Arc::new(NoOpLogger::new()));
    let result = engine.discover(&config.roots).unwrap();
    (engine, result)
}

#[tokio::test]
async fn test_install_then_uninstall_returns_to_baseline() {
    let dir = tempdir().unwrap();
    write_module(
        &dir.path().join("a.tmod"),
        json!([tool("Acme.Grid", Some("Data")), tool("Acme.Label", None)]),
    );
    write_module(&dir.path().join("b.tmod"), json!([tool("Acme.Chart", Some("Charts"))]));

    let (engine, result) = discover(dir.path());
    let registry = CountingRegistry::default();

    let installed = engine.install(&result, &registry).await;
    assert!(installed.is_clean());
    assert_eq!(registry.live.load(Ordering::SeqCst), 3);
    assert_eq!(
        *registry.calls.lock(),
        vec![
            ("Acme.Grid".to_string(), "Data".to_string()),
            ("Acme.Label".to_string(), "General".to_string()),
            ("Acme.Chart".to_string(), "Charts".to_string()),
        ]
    );

    let removed = engine.uninstall(&result, &registry).await;
    assert!(removed.is_clean());
    assert_eq!(registry.live.load(Ordering::SeqCst), 0);
    assert_eq!(registry.adds.load(Ordering::SeqCst), 3);
    assert_eq!(registry.removes.load(Ordering::SeqCst), 3);

    // The result itself is untouched
    assert_eq!(result.len(), 3);
}

#[tokio::test]
async fn test_failures_do_not_stop_other_items() {
    let dir = tempdir().unwrap();
    write_module(
        &dir.path().join("a.tmod"),
        json!([tool("Acme.Sticky", None), tool("Acme.Grid", None), tool("Acme.Chart", None)]),
    );

    let (engine, result) = discover(dir.path());
    let registry = CountingRegistry::default();
    engine.install(&result, &registry).await;

    let report = engine.uninstall(&result, &registry).await;
    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failures[0].tool_type, "Acme.Sticky");
    assert_eq!(registry.live.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sync_upgrade_cycle() {
    let dir = tempdir().unwrap();
    write_module(&dir.path().join("a.tmod"), json!([tool("Acme.Grid", None)]));

    let config = DiscoveryConfig::default().with_root(dir.path());
    let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
    let engine = Arc::new(DiscoveryEngine::new(&config, logger.clone()));
    let registry = Arc::new(CountingRegistry::default());
    let sync = ToolboxSync::new(engine, registry.clone(), &config, logger);

    sync.on_initialized().await.unwrap();
    assert_eq!(registry.live.load(Ordering::SeqCst), 1);

    write_module(&dir.path().join("b.tmod"), json!([tool("Acme.Chart", None)]));
    let outcome = sync.on_upgraded().await.unwrap();

    assert_eq!(outcome.removed.unwrap().succeeded(), 1);
    assert_eq!(outcome.installed.succeeded(), 2);
    assert_eq!(registry.live.load(Ordering::SeqCst), 2);
    assert_eq!(sync.installed().await.unwrap().tool_types(), vec!["Acme.Grid", "Acme.Chart"]);
}
