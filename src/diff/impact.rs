use crate::diff::change::Impact;
use crate::foundation::path::DataPath;

const HIGH_IMPACT: &[&str] = &[
    "width",
    "height",
    "viewBox",
    "dimensions",
    "layout",
    "theme.colors.background",
    "theme.borders",
];

const MEDIUM_IMPACT: &[&str] = &["sections", "items", "theme"];

/// Prefix table mapping changed paths to an [`Impact`]. High prefixes are checked first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactClassifier {
    high: Vec<DataPath>,
    medium: Vec<DataPath>,
}

impl Default for ImpactClassifier {
    fn default() -> Self {
        Self {
            high: parse_all(HIGH_IMPACT),
            medium: parse_all(MEDIUM_IMPACT),
        }
    }
}

fn parse_all(prefixes: &[&str]) -> Vec<DataPath> {
    prefixes
        .iter()
        .filter_map(|p| DataPath::parse(p).ok())
        .collect()
}

impl ImpactClassifier {
    /// Classifier with explicit prefix lists.
    pub fn new(high: Vec<DataPath>, medium: Vec<DataPath>) -> Self {
        Self { high, medium }
    }

    /// Impact of a change at `path` (segment-aware prefix match).
    pub fn classify(&self, path: &DataPath) -> Impact {
        if self.high.iter().any(|p| path.starts_with(p)) {
            Impact::High
        } else if self.medium.iter().any(|p| path.starts_with(p)) {
            Impact::Medium
        } else {
            Impact::Low
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/diff/impact.rs"]
mod tests;
