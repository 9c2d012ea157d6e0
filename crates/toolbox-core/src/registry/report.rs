//! Per-item outcome of a registry sync

use std::fmt;

use serde::Serialize;

use super::traits::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryOperation {
    Install,
    Uninstall,
}

impl fmt::Display for RegistryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryOperation::Install => write!(f, "install"),
            RegistryOperation::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// One descriptor the registry did not accept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryFailure {
    pub tool_type: String,
    #[serde(serialize_with = "error_message")]
    pub error: RegistryError,
}

fn error_message<S: serde::Serializer>(
    error: &RegistryError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Result of an install or uninstall pass
///
/// Every descriptor is attempted; failures are collected rather than aborting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryReport {
    pub operation: RegistryOperation,
    pub attempted: usize,
    pub failures: Vec<RegistryFailure>,
}

impl RegistryReport {
    pub fn new(operation: RegistryOperation) -> Self {
        Self {
            operation,
            attempted: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, tool_type: &str, outcome: Result<(), RegistryError>) {
        self.attempted += 1;
        if let Err(error) = outcome {
            self.failures.push(RegistryFailure {
                tool_type: tool_type.to_string(),
                error,
            });
        }
    }

    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RegistryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} of {} succeeded",
            self.operation,
            self.succeeded(),
            self.attempted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let mut report = RegistryReport::new(RegistryOperation::Install);
        report.record("Acme.A", Ok(()));
        report.record("Acme.B", Err(RegistryError::rejected("Acme.B", "locked")));
        report.record("Acme.C", Ok(()));

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded(), 2);
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].tool_type, "Acme.B");
        assert_eq!(report.to_string(), "install: 2 of 3 succeeded");
    }

    #[test]
    fn test_serialize_failure_as_message() {
        let mut report = RegistryReport::new(RegistryOperation::Uninstall);
        report.record("Acme.A", Err(RegistryError::NotInstalled { tool_type: "Acme.A".into() }));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["operation"], "uninstall");
        assert_eq!(json["failures"][0]["error"], "Acme.A is not installed");
    }
}
