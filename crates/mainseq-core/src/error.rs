use thiserror::Error;

use crate::types::ComponentId;

/// Fatal analysis failures. Recoverable conditions travel as
/// `AnalysisWarning`s inside the result instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A dependency edge references a component the registry never saw.
    /// The graph would be incomplete, so the run aborts.
    #[error("dependency edge '{origin}' -> '{target}' references an unregistered component")]
    DanglingEdge {
        origin: ComponentId,
        target: ComponentId,
    },

    /// An internal cross-check failed; indicates a classifier or graph bug.
    #[error("integrity violation for '{identifier}': {detail}")]
    Integrity {
        identifier: ComponentId,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_edge_names_both_endpoints() {
        let err = AnalysisError::DanglingEdge {
            origin: ComponentId::new("pkg.a"),
            target: ComponentId::new("pkg.gone"),
        };
        let msg = err.to_string();
        assert!(msg.contains("pkg.a"), "message should name the origin: {msg}");
        assert!(msg.contains("pkg.gone"), "message should name the target: {msg}");
    }

    #[test]
    fn test_integrity_carries_detail() {
        let err = AnalysisError::Integrity {
            identifier: ComponentId::new("pkg.a"),
            detail: "metric entry without registry entry".to_string(),
        };
        assert!(err.to_string().contains("metric entry without registry entry"));
    }
}
