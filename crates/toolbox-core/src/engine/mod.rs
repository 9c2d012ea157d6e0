//! Discovery orchestration
//!
//! The engine runs scanner, loader, filter and resolver over a set of roots. The
//! result it returns belongs to the caller and is what gets installed into, and
//! later removed from, the host registry.

mod discovery;
mod result;

pub use discovery::{DiscoveryEngine, DiscoveryError, DiscoveryPhase, EngineResult};
pub use result::{Diagnostic, DiagnosticKind, DiscoveryResult, ModuleOutcome};
