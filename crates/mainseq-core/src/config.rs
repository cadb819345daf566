use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration from `.mainseq.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Settings consumed by the source scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/.venv/**".to_string(),
        "**/__pycache__/**".to_string(),
        "**/.tox/**".to_string(),
    ]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// Graph construction and cycle reporting settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Report a component depending on itself as a single-member cycle.
    #[serde(default)]
    pub include_self_loops_in_cycles: bool,
    /// Merge repeated references between the same pair into one weighted edge.
    #[serde(default)]
    pub collapse_multi_edges: bool,
}

/// Metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Distance above which a component is flagged as an offender.
    /// Only drives the flag, never the metric values themselves.
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,
}

fn default_distance_threshold() -> f64 {
    0.1
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            distance_threshold: default_distance_threshold(),
        }
    }
}

impl Config {
    /// Load configuration from a `.mainseq.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `mainseq init` to create a valid config file",
                path.display()
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `.mainseq.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(".mainseq.toml");
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        eprintln!(
                            "Warning: failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    fn validate(&self) -> Result<()> {
        let t = self.metrics.distance_threshold;
        if !(0.0..=1.0).contains(&t) {
            anyhow::bail!("metrics.distance_threshold must be in [0, 1], got {t}");
        }
        Ok(())
    }

    /// Generate default TOML content for `mainseq init`.
    pub fn default_toml() -> String {
        r#"# Mainseq - Component Coupling and Abstraction Metrics
# See https://github.com/rebelopsio/mainseq for documentation

[project]
# Glob patterns for files the scanner should skip
exclude_patterns = ["**/.venv/**", "**/__pycache__/**", "**/.tox/**"]

[graph]
# Report self-dependencies as single-member cycles
include_self_loops_in_cycles = false
# Merge repeated references between the same pair into one weighted edge
collapse_multi_edges = false

[metrics]
# Distance from the main sequence above which a component is flagged
distance_threshold = 0.1
"#
        .to_string()
    }
}
