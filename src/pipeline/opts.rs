use crate::diff::engine::DEFAULT_DIFF_MAX_DEPTH;
use crate::foundation::error::{ChartkitError, ChartkitResult};
use crate::patch::efficiency::EfficiencyPolicy;
use crate::template::registry::RegistryPolicy;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOpts {
    /// Maximum rendered outputs kept in the generation cache.
    pub max_cache_entries: usize,
    /// Maximum data trees kept as diff baselines.
    pub max_data_entries: usize,
    /// Maximum snapshots (one per template/theme pair).
    pub max_snapshots: usize,
    /// Maximum patches kept in the patch history.
    pub max_patches: usize,
    /// Nesting depth beyond which the differ reports a subtree as one structure change.
    pub diff_max_depth: usize,
    /// Patch-or-rebuild thresholds.
    pub efficiency: EfficiencyPolicy,
    /// Template registration rules.
    pub templates: RegistryPolicy,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            max_cache_entries: 100,
            max_data_entries: 100,
            max_snapshots: 50,
            max_patches: 100,
            diff_max_depth: DEFAULT_DIFF_MAX_DEPTH,
            efficiency: EfficiencyPolicy::default(),
            templates: RegistryPolicy::default(),
        }
    }
}

impl PipelineOpts {
    /// Parse options from a JSON reader. Missing fields take their defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> ChartkitResult<Self> {
        let opts: Self = serde_json::from_reader(r)
            .map_err(|e| ChartkitError::serde(format!("parse pipeline options JSON: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Parse options from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ChartkitResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ChartkitError::validation(format!("open pipeline options '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Reject thresholds that can never be met.
    pub fn validate(&self) -> ChartkitResult<()> {
        let e = &self.efficiency;
        if !(e.max_size_ratio.is_finite() && e.max_size_ratio >= 0.0) {
            return Err(ChartkitError::validation(
                "efficiency.max_size_ratio must be finite and >= 0",
            ));
        }
        if !(e.max_complexity.is_finite() && e.max_complexity >= 0.0) {
            return Err(ChartkitError::validation(
                "efficiency.max_complexity must be finite and >= 0",
            ));
        }
        if self.diff_max_depth == 0 {
            return Err(ChartkitError::validation("diff_max_depth must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/opts.rs"]
mod tests;
