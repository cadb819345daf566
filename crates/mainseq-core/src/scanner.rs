use std::path::Path;

use anyhow::Result;

use crate::types::{ClassFact, ComponentDescriptor, DependencyFact};

/// Everything a scanner learned about one source tree: the discovered
/// components plus the raw class and dependency facts for the pipeline to
/// classify. Import resolution has already happened; the core never sees
/// source syntax.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub descriptors: Vec<ComponentDescriptor>,
    pub class_facts: Vec<ClassFact>,
    pub dependency_facts: Vec<DependencyFact>,
}

/// Trait that each source scanner must implement.
pub trait SourceScanner: Send + Sync {
    /// Language name (e.g., "python")
    fn language(&self) -> &'static str;

    /// Enumerate components and extract class/dependency facts from the
    /// tree rooted at `root`.
    fn scan(&self, root: &Path) -> Result<ScanOutput>;
}
