use crate::classify;
use crate::config::Config;
use crate::error::AnalysisError;
use crate::graph::DependencyGraph;
use crate::metrics;
use crate::registry::ComponentRegistry;
use crate::result::{self, MetricsResult};
use crate::scanner::ScanOutput;
use crate::types::{ClassFact, ComponentDescriptor, DependencyFact};

/// Runs one full, stateless analysis pass over a scanner's fact stream:
/// register, classify, freeze, build the graph, compute metrics, assemble.
pub struct AnalysisPipeline {
    config: Config,
}

impl AnalysisPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the engine over pre-materialized facts. Deterministic: identical
    /// facts yield an identical result. Returns either a complete result
    /// (possibly carrying warnings) or a single terminal error.
    pub fn run(&self, facts: ScanOutput) -> Result<MetricsResult, AnalysisError> {
        let mut registry = ComponentRegistry::new();
        for descriptor in &facts.descriptors {
            registry.register(descriptor);
        }

        let tallies = classify::classify_all(&facts.class_facts, &facts.dependency_facts);
        let edges = classify::apply_tallies(&mut registry, tallies);

        // Classification is done; from here the registry is a frozen
        // snapshot that graph and metrics phases only read.
        let mut warnings = registry.warnings().to_vec();

        let graph = DependencyGraph::build(&registry, &edges, &self.config.graph)?;
        warnings.extend(graph.verify_degrees(&registry));

        let cycles = graph.detect_cycles();
        let computed = metrics::compute(registry.components(), &cycles, &self.config.metrics);

        // Record the computed values on the pipeline's own snapshot; the
        // engine itself never mutates components.
        for entry in &computed.components {
            if let Some(component) = registry.get_mut(&entry.identifier) {
                component.abstractness = Some(entry.abstractness);
                component.instability = Some(entry.instability);
            }
        }

        let dependency_count = registry
            .components()
            .iter()
            .map(|c| c.dependency_count())
            .sum();

        result::assemble(
            registry.components(),
            computed,
            cycles,
            graph.policy(),
            dependency_count,
            warnings,
        )
    }
}

/// Convenience entry point for callers that hold loose fact lists instead of
/// a `ScanOutput`.
pub fn run(
    descriptors: Vec<ComponentDescriptor>,
    class_facts: Vec<ClassFact>,
    dependency_facts: Vec<DependencyFact>,
    config: Config,
) -> Result<MetricsResult, AnalysisError> {
    AnalysisPipeline::new(config).run(ScanOutput {
        descriptors,
        class_facts,
        dependency_facts,
    })
}
