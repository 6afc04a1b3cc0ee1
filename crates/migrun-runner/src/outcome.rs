use std::fmt;

/// Result of sending one statement through the remote SQL gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    /// The gateway function is not installed server-side. Not a migration
    /// failure; the manual path applies.
    UnsupportedOperation,
    Failed(String),
}

/// Whether the migration's effect is visible on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Confirmed,
    NotYetApplied,
    Indeterminate(String),
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::UnsupportedOperation => write!(f, "unsupported"),
            Self::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::NotYetApplied => write!(f, "not yet applied"),
            Self::Indeterminate(message) => write!(f, "indeterminate: {message}"),
        }
    }
}

/// Outcomes of a full pass, in statement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<ExecutionOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, ExecutionOutcome::Succeeded))
    }

    pub fn unsupported(&self) -> usize {
        self.count(|o| matches!(o, ExecutionOutcome::UnsupportedOperation))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ExecutionOutcome::Failed(_)))
    }

    pub fn all_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == self.outcomes.len()
    }

    pub fn all_unsupported(&self) -> bool {
        !self.outcomes.is_empty() && self.unsupported() == self.outcomes.len()
    }

    fn count(&self, pred: impl Fn(&ExecutionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}
