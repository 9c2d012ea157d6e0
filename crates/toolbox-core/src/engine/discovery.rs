//! Discovery engine
//!
//! Drives scanner, loader, filter and resolver over every root and folds the
//! per-module outcomes into one ordered, deduplicated result. Install and
//! uninstall replay a result against a host registry.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;

use super::result::{Diagnostic, DiscoveryResult, ModuleOutcome};
use crate::config::{DiscoveryConfig, ModuleRoot};
use crate::filter::CapabilityPredicate;
use crate::loader::{load_guarded, ManifestModuleLoader, ModuleLoader};
use crate::logging::Logger;
use crate::packaging::PackagingRegistry;
use crate::registry::{RegistryOperation, RegistryReport, ToolRegistry};
use crate::resolver::{DescriptorResolver, ResolverSettings};
use crate::scanner::{ModulePathScanner, ScanError};
use crate::types::{CancellationToken, Descriptor, ModuleId, TypeInfo};
use crate::{log_debug, log_info, log_warn};

/// Failures that abort a whole pass
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A background task died before reporting its module
    #[error("discovery task failed: {0}")]
    Task(String),
}

pub type EngineResult<T> = Result<T, DiscoveryError>;

/// Phases of one pass, logged at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    Scanning,
    Loading,
    Filtering,
    Resolving,
    Aggregated,
    Done,
}

impl fmt::Display for DiscoveryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscoveryPhase::Scanning => "scanning",
            DiscoveryPhase::Loading => "loading",
            DiscoveryPhase::Filtering => "filtering",
            DiscoveryPhase::Resolving => "resolving",
            DiscoveryPhase::Aggregated => "aggregated",
            DiscoveryPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Module paths queued by the concurrent pass
struct QueuedPaths {
    paths: Vec<PathBuf>,
    skipped: Vec<ScanError>,
    cancelled: bool,
}

/// Orchestrates discovery and registry sync
pub struct DiscoveryEngine {
    scanner: ModulePathScanner,
    loader: Arc<dyn ModuleLoader>,
    filter: CapabilityPredicate,
    resolver: DescriptorResolver,
    logger: Arc<dyn Logger>,
    concurrency: usize,
}

impl DiscoveryEngine {
    /// Create an engine reading manifest modules, with no registered packaging types
    pub fn new(config: &DiscoveryConfig, logger: Arc<dyn Logger>) -> Self {
        let filter = CapabilityPredicate::from_config(config);
        let loader: Arc<dyn ModuleLoader> = Arc::new(ManifestModuleLoader::new());
        let resolver = DescriptorResolver::new(
            filter.clone(),
            ResolverSettings::from(config),
            Arc::new(PackagingRegistry::new()),
            logger.clone(),
        )
        .with_dependency_loader(loader.clone());
        Self {
            scanner: ModulePathScanner::new(config.extension()).with_policy(config.traversal),
            loader,
            filter,
            resolver,
            logger,
            concurrency: config.concurrency.max(1),
        }
    }

    /// Read modules with `loader`; dependency modules are read with it too
    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.resolver = self.resolver.with_dependency_loader(loader.clone());
        self.loader = loader;
        self
    }

    /// Use `packaging` to construct override packaging types
    pub fn with_packaging(mut self, packaging: PackagingRegistry) -> Self {
        self.resolver = DescriptorResolver::new(
            self.filter.clone(),
            self.resolver.settings().clone(),
            Arc::new(packaging),
            self.logger.clone(),
        )
        .with_dependency_loader(self.loader.clone());
        self
    }

    pub fn scanner(&self) -> &ModulePathScanner {
        &self.scanner
    }

    pub fn resolver(&self) -> &DescriptorResolver {
        &self.resolver
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn phase(&self, phase: DiscoveryPhase, subject: &Path) {
        log_debug!(self.logger, "[DiscoveryEngine] {} {}", phase, subject.display());
    }

    /// Directories the roots stand for, in root order
    pub fn expand_roots(&self, roots: &[ModuleRoot]) -> EngineResult<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for root in roots {
            dirs.extend(self.scanner.expand_root(root)?);
        }
        Ok(dirs)
    }

    /// Discover every descriptor under `roots`
    ///
    /// Roots are visited in order and files in scan order. Only failures to read
    /// a root (or, under the propagate policy, a subdirectory) abort the pass.
    pub fn discover(&self, roots: &[ModuleRoot]) -> EngineResult<DiscoveryResult> {
        self.discover_with_cancel(roots, &CancellationToken::new())
    }

    /// Like `discover`, stopping at the next module boundary once `token` fires
    pub fn discover_with_cancel(
        &self,
        roots: &[ModuleRoot],
        token: &CancellationToken,
    ) -> EngineResult<DiscoveryResult> {
        let mut result = DiscoveryResult::new();

        for dir in self.expand_roots(roots)? {
            self.phase(DiscoveryPhase::Scanning, &dir);
            let mut scan = self.scanner.scan(&dir)?;

            while let Some(path) = scan.next() {
                let path = path?;
                if token.is_cancelled() {
                    for skipped in scan.skipped() {
                        result.push_diagnostic(Diagnostic::traversal(skipped));
                    }
                    return Ok(self.cancelled(result));
                }
                let outcome = self.process_module(&path);
                self.aggregate(&mut result, outcome);
            }

            for skipped in scan.into_skipped() {
                log_warn!(self.logger, "[DiscoveryEngine] Skipped {}", skipped);
                result.push_diagnostic(Diagnostic::traversal(&skipped));
            }
        }

        Ok(self.done(result))
    }

    /// Discover on the blocking pool, loading up to `concurrency` modules at once
    ///
    /// Outcomes are aggregated in scan order, so the result matches `discover`.
    pub async fn discover_concurrent(
        self: Arc<Self>,
        roots: Vec<ModuleRoot>,
        token: CancellationToken,
    ) -> EngineResult<DiscoveryResult> {
        let engine = Arc::clone(&self);
        let scan_token = token.clone();
        let queued = tokio::task::spawn_blocking(move || engine.collect_paths(&roots, &scan_token))
            .await
            .map_err(|e| DiscoveryError::Task(e.to_string()))??;

        let mut result = DiscoveryResult::new();
        if queued.cancelled {
            for error in &queued.skipped {
                result.push_diagnostic(Diagnostic::traversal(error));
            }
            return Ok(self.cancelled(result));
        }

        log_debug!(
            self.logger,
            "[DiscoveryEngine] {} modules queued, concurrency {}",
            queued.paths.len(),
            self.concurrency
        );

        let mut outcomes = stream::iter(queued.paths)
            .map(|path| {
                let engine = Arc::clone(&self);
                tokio::task::spawn_blocking(move || engine.process_module(&path))
            })
            .buffered(self.concurrency);

        let mut cancelled = false;
        loop {
            let joined = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = outcomes.next() => match next {
                    Some(joined) => joined,
                    None => break,
                },
            };
            let outcome = joined.map_err(|e| DiscoveryError::Task(e.to_string()))?;
            self.aggregate(&mut result, outcome);
        }

        for error in &queued.skipped {
            log_warn!(self.logger, "[DiscoveryEngine] Skipped {}", error);
            result.push_diagnostic(Diagnostic::traversal(error));
        }

        if cancelled {
            return Ok(self.cancelled(result));
        }
        Ok(self.done(result))
    }

    fn collect_paths(
        &self,
        roots: &[ModuleRoot],
        token: &CancellationToken,
    ) -> EngineResult<QueuedPaths> {
        let mut queued = QueuedPaths {
            paths: Vec::new(),
            skipped: Vec::new(),
            cancelled: false,
        };
        for dir in self.expand_roots(roots)? {
            if token.is_cancelled() {
                queued.cancelled = true;
                break;
            }
            self.phase(DiscoveryPhase::Scanning, &dir);
            let mut scan = self.scanner.scan(&dir)?;
            for path in scan.by_ref() {
                queued.paths.push(path?);
            }
            queued.skipped.extend(scan.into_skipped());
        }
        Ok(queued)
    }

    /// Load one module and resolve its eligible types
    ///
    /// Load and resolution failures are contained in the outcome.
    pub fn process_module(&self, path: &Path) -> ModuleOutcome {
        let mut outcome = ModuleOutcome::new(path);

        self.phase(DiscoveryPhase::Loading, path);
        let module = match load_guarded(self.loader.as_ref(), path) {
            Ok(module) => module,
            Err(e) => {
                log_warn!(self.logger, "[DiscoveryEngine] Skipping module: {}", e);
                outcome.diagnostics.push(Diagnostic::module_load(&e));
                return outcome;
            }
        };
        outcome.module = Some(module.id().clone());

        self.phase(DiscoveryPhase::Filtering, path);
        let candidates: Vec<&TypeInfo> = self.filter.select(module.types()).collect();

        self.phase(DiscoveryPhase::Resolving, path);
        for ty in candidates {
            match self.resolver.try_resolve(ty, &module) {
                Ok(Some(descriptor)) => outcome.descriptors.push(descriptor),
                Ok(None) => {
                    log_debug!(
                        self.logger,
                        "[DiscoveryEngine] No descriptor for {}",
                        ty.full_name
                    );
                }
                Err(e) => {
                    log_warn!(
                        self.logger,
                        "[DiscoveryEngine] Skipping {}: {}",
                        ty.full_name,
                        e
                    );
                    outcome
                        .diagnostics
                        .push(Diagnostic::resolution(path, &ty.full_name, &e));
                }
            }
        }

        log_debug!(
            self.logger,
            "[DiscoveryEngine] {} yielded {} descriptors from {} types",
            module.id(),
            outcome.descriptors.len(),
            module.types().len()
        );
        outcome
    }

    fn aggregate(&self, result: &mut DiscoveryResult, outcome: ModuleOutcome) {
        let path = outcome.path.clone();
        let dropped = result.merge(outcome);
        if dropped > 0 {
            log_debug!(
                self.logger,
                "[DiscoveryEngine] Dropped {} duplicate descriptors from {}",
                dropped,
                path.display()
            );
        }
    }

    fn cancelled(&self, mut result: DiscoveryResult) -> DiscoveryResult {
        result.mark_cancelled();
        log_info!(
            self.logger,
            "[DiscoveryEngine] Cancelled after {} descriptors",
            result.len()
        );
        result
    }

    fn done(&self, result: DiscoveryResult) -> DiscoveryResult {
        log_debug!(self.logger, "[DiscoveryEngine] {}", DiscoveryPhase::Aggregated);
        log_info!(
            self.logger,
            "[DiscoveryEngine] Discovered {} descriptors ({} diagnostics)",
            result.len(),
            result.diagnostics().len()
        );
        log_debug!(self.logger, "[DiscoveryEngine] {}", DiscoveryPhase::Done);
        result
    }

    /// Add every descriptor of `result` to `registry` under its group label
    pub async fn install(
        &self,
        result: &DiscoveryResult,
        registry: &dyn ToolRegistry,
    ) -> RegistryReport {
        self.apply(RegistryOperation::Install, result.iter(), registry).await
    }

    /// Remove every descriptor of `result` from `registry`
    pub async fn uninstall(
        &self,
        result: &DiscoveryResult,
        registry: &dyn ToolRegistry,
    ) -> RegistryReport {
        self.apply(RegistryOperation::Uninstall, result.iter(), registry).await
    }

    /// Remove only the descriptors `module` contributed
    pub async fn uninstall_module(
        &self,
        result: &DiscoveryResult,
        module: &ModuleId,
        registry: &dyn ToolRegistry,
    ) -> RegistryReport {
        self.apply(RegistryOperation::Uninstall, result.from_module(module), registry)
            .await
    }

    async fn apply<'a, I>(
        &self,
        operation: RegistryOperation,
        descriptors: I,
        registry: &dyn ToolRegistry,
    ) -> RegistryReport
    where
        I: IntoIterator<Item = &'a Descriptor>,
    {
        let mut report = RegistryReport::new(operation);
        for descriptor in descriptors {
            let outcome = match operation {
                RegistryOperation::Install => {
                    registry.add(descriptor, descriptor.group_label()).await
                }
                RegistryOperation::Uninstall => registry.remove(descriptor).await,
            };
            if let Err(e) = &outcome {
                log_warn!(
                    self.logger,
                    "[DiscoveryEngine] {} of {} failed on {}: {}",
                    operation,
                    descriptor.tool_type,
                    registry.name(),
                    e
                );
            }
            report.record(&descriptor.tool_type, outcome);
        }
        log_info!(self.logger, "[DiscoveryEngine] {} on {}", report, registry.name());
        report
    }
}

impl fmt::Debug for DiscoveryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryEngine")
            .field("scanner", &self.scanner)
            .field("loader", &self.loader.name())
            .field("filter", &self.filter)
            .field("resolver", &self.resolver)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
