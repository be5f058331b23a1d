use crate::patch::plan::{Operation, OperationKind};
use serde::{Deserialize, Serialize};

/// Thresholds for choosing a patch over a full render. A patch is applied only when all three
/// hold: relative size, absolute operation count and mean structural complexity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyPolicy {
    /// Upper bound (exclusive) on `estimated_size / prior_output_size`.
    pub max_size_ratio: f64,
    /// Upper bound (exclusive) on the operation count.
    pub max_operations: usize,
    /// Upper bound (exclusive) on the complexity score.
    pub max_complexity: f64,
}

impl Default for EfficiencyPolicy {
    fn default() -> Self {
        Self {
            max_size_ratio: 0.3,
            max_operations: 20,
            max_complexity: 0.7,
        }
    }
}

/// Outcome of an efficiency evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchDecision {
    /// Apply the patch to the prior output.
    Incremental,
    /// Re-render from scratch.
    FullRebuild,
}

/// Decision inputs and result for one patch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatchEfficiency {
    /// Estimated patch size in bytes.
    pub estimated_size: usize,
    /// Number of operations.
    pub operation_count: usize,
    /// Mean per-operation complexity weight, `0` for an empty patch.
    pub complexity: f64,
    /// Length of the output the patch would be applied to.
    pub prior_size: usize,
    /// `estimated_size / prior_size` (infinite when there is no prior output).
    pub size_ratio: f64,
    /// Result.
    pub decision: PatchDecision,
}

impl OperationKind {
    /// Fixed byte estimate for one operation of this kind.
    pub fn estimated_bytes(self) -> usize {
        match self {
            Self::UpdateAttribute => 60,
            Self::AddAttribute => 80,
            Self::RemoveAttribute => 40,
            Self::UpdateAttributes => 40,
            Self::AddElement => 240,
            Self::RemoveElement => 120,
            Self::RebuildSection => 2000,
        }
    }

    /// Fixed structural complexity weight, `0.1` (attribute update) to `1.0` (rebuild).
    pub fn complexity_weight(self) -> f64 {
        match self {
            Self::UpdateAttribute => 0.1,
            Self::AddAttribute | Self::RemoveAttribute | Self::UpdateAttributes => 0.15,
            Self::AddElement => 0.4,
            Self::RemoveElement => 0.3,
            Self::RebuildSection => 1.0,
        }
    }
}

/// Sum of per-operation byte estimates; merged updates add 30 bytes per attribute.
pub fn estimate_size(ops: &[Operation]) -> usize {
    ops.iter()
        .map(|op| {
            let base = op.kind().estimated_bytes();
            match op {
                Operation::UpdateAttributes { changes, .. } => base + 30 * changes.len(),
                _ => base,
            }
        })
        .sum()
}

/// Mean complexity weight of `ops`.
pub fn complexity_score(ops: &[Operation]) -> f64 {
    if ops.is_empty() {
        return 0.0;
    }
    let total: f64 = ops.iter().map(|op| op.kind().complexity_weight()).sum();
    total / ops.len() as f64
}

impl EfficiencyPolicy {
    /// Score `ops` against an output of `prior_size` bytes.
    pub fn evaluate(&self, ops: &[Operation], prior_size: usize) -> PatchEfficiency {
        let estimated_size = estimate_size(ops);
        let complexity = complexity_score(ops);
        let size_ratio = if prior_size == 0 {
            f64::INFINITY
        } else {
            estimated_size as f64 / prior_size as f64
        };
        let efficient = size_ratio < self.max_size_ratio
            && ops.len() < self.max_operations
            && complexity < self.max_complexity;
        PatchEfficiency {
            estimated_size,
            operation_count: ops.len(),
            complexity,
            prior_size,
            size_ratio,
            decision: if efficient {
                PatchDecision::Incremental
            } else {
                PatchDecision::FullRebuild
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/patch/efficiency.rs"]
mod tests;
