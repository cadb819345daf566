use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a component: a dotted module path like "pkg.sub.module".
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub String);

impl ComponentId {
    pub fn new(path: &str) -> Self {
        Self(path.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of analyzable unit, as declared by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Module,
    Package,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Module => write!(f, "module"),
            ComponentKind::Package => write!(f, "package"),
        }
    }
}

/// One analyzable unit with its class and dependency statistics.
///
/// Counters are append-only while classification runs; the registry snapshot
/// is frozen before the graph and metrics phases read it. `abstractness` and
/// `instability` stay `None` until the pipeline writes the computed values
/// back onto its own snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub abstract_classes: usize,
    pub concrete_classes: usize,
    pub internal_dependencies: usize,
    pub external_dependencies: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstractness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instability: Option<f64>,
}

impl Component {
    pub fn new(id: ComponentId, kind: ComponentKind) -> Self {
        Self {
            id,
            kind,
            abstract_classes: 0,
            concrete_classes: 0,
            internal_dependencies: 0,
            external_dependencies: 0,
            abstractness: None,
            instability: None,
        }
    }

    /// Tally one class declaration.
    pub fn add_class(&mut self, kind: ClassKind) {
        match kind {
            ClassKind::Abstract => self.abstract_classes += 1,
            ClassKind::Concrete => self.concrete_classes += 1,
        }
    }

    /// Tally one outgoing dependency reference.
    pub fn add_dependency(&mut self, classification: &Classification) {
        match classification {
            Classification::Internal(_) => self.internal_dependencies += 1,
            Classification::External => self.external_dependencies += 1,
        }
    }

    /// Total declared classes.
    pub fn class_count(&self) -> usize {
        self.abstract_classes + self.concrete_classes
    }

    /// Total outgoing dependency references.
    pub fn dependency_count(&self) -> usize {
        self.internal_dependencies + self.external_dependencies
    }

    /// True when the component carries any class or dependency data.
    /// Components without data are excluded from aggregate statistics.
    pub fn has_data(&self) -> bool {
        self.class_count() > 0 || self.dependency_count() > 0
    }
}

/// Abstract vs. concrete decision for one class declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Abstract,
    Concrete,
}

/// Internal vs. external decision for one dependency reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Internal(ComponentId),
    External,
}

/// A directed internal dependency reference. One edge per raw reference;
/// collapsing repeated references is the graph's concern, not the classifier's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub origin: ComponentId,
    pub target: ComponentId,
}

/// A component announced by the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub identifier: ComponentId,
    pub kind: ComponentKind,
}

/// Raw signals about one class declaration, emitted by the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassFact {
    pub owner: ComponentId,
    pub has_unimplemented_members: bool,
    pub explicit_abstract_marker: bool,
    pub has_public_constructor: bool,
}

/// One raw dependency reference, already resolved by the scanner.
/// `target: None` means the reference could not be resolved inside the
/// analyzed tree and is treated as external.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyFact {
    pub origin: ComponentId,
    pub target: Option<ComponentId>,
}

/// Recoverable condition surfaced alongside the result instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisWarning {
    /// Same identifier registered twice with conflicting kinds; the first
    /// registration wins.
    DuplicateConflict {
        identifier: ComponentId,
        kept: ComponentKind,
        rejected: ComponentKind,
    },
    /// Graph out-degree disagrees with the stored internal dependency count.
    /// Fatal in debug builds, surfaced here in release builds.
    DegreeMismatch {
        identifier: ComponentId,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisWarning::DuplicateConflict {
                identifier,
                kept,
                rejected,
            } => write!(
                f,
                "'{identifier}' registered as {rejected} but already known as {kept}; kept {kept}"
            ),
            AnalysisWarning::DegreeMismatch {
                identifier,
                expected,
                actual,
            } => write!(
                f,
                "'{identifier}' stores {expected} internal dependencies but the graph has {actual} outgoing edges"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_id_display() {
        let id = ComponentId::new("pkg.sub.module");
        assert_eq!(id.to_string(), "pkg.sub.module");
        assert_eq!(id.as_str(), "pkg.sub.module");
    }

    #[test]
    fn test_component_tallies() {
        let mut c = Component::new(ComponentId::new("pkg.mod"), ComponentKind::Module);
        c.add_class(ClassKind::Abstract);
        c.add_class(ClassKind::Concrete);
        c.add_class(ClassKind::Concrete);
        c.add_dependency(&Classification::Internal(ComponentId::new("pkg.other")));
        c.add_dependency(&Classification::External);

        assert_eq!(c.abstract_classes, 1);
        assert_eq!(c.concrete_classes, 2);
        assert_eq!(c.class_count(), 3);
        assert_eq!(c.internal_dependencies, 1);
        assert_eq!(c.external_dependencies, 1);
        assert_eq!(c.dependency_count(), 2);
        assert!(c.has_data());
    }

    #[test]
    fn test_empty_component_has_no_data() {
        let c = Component::new(ComponentId::new("pkg.empty"), ComponentKind::Module);
        assert!(!c.has_data());
        assert!(c.abstractness.is_none());
        assert!(c.instability.is_none());
    }

    #[test]
    fn test_repeated_reference_counts_twice() {
        let mut c = Component::new(ComponentId::new("pkg.mod"), ComponentKind::Module);
        let target = Classification::Internal(ComponentId::new("pkg.other"));
        c.add_dependency(&target);
        c.add_dependency(&target);
        assert_eq!(c.internal_dependencies, 2, "raw references are counted, not unique edges");
    }
}
