use crate::foundation::path::{DataPath, PathSeg};
use crate::patch::plan::Target;

/// How a rule recognizes a changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathMatcher {
    Exact(DataPath),
    Prefix(DataPath),
    /// Any path with an index segment (`sections[i].items[j].field`).
    Indexed,
}

impl PathMatcher {
    fn matches(&self, path: &DataPath) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Prefix(p) => path.starts_with(p),
            Self::Indexed => path
                .segments()
                .iter()
                .any(|s| matches!(s, PathSeg::Index(_))),
        }
    }
}

/// What a matching rule resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    RootAttribute,
    ThemeVariable,
    Section,
    /// Deepest indexed collection item.
    Item,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TargetRule {
    pub(crate) matcher: PathMatcher,
    pub(crate) resolution: Resolution,
}

/// Ordered rule list mapping data paths to markup targets; the first matching rule wins and
/// unmatched paths address the node bound to them directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TargetResolver {
    rules: Vec<TargetRule>,
}

fn rule(matcher: PathMatcher, resolution: Resolution) -> TargetRule {
    TargetRule {
        matcher,
        resolution,
    }
}

impl Default for TargetResolver {
    fn default() -> Self {
        let mut rules = Vec::new();
        for attr in ["width", "height", "viewBox"] {
            rules.push(rule(
                PathMatcher::Exact(DataPath::root().key(attr)),
                Resolution::RootAttribute,
            ));
        }
        rules.push(rule(
            PathMatcher::Prefix(DataPath::root().key("theme")),
            Resolution::ThemeVariable,
        ));
        rules.push(rule(
            PathMatcher::Prefix(DataPath::root().key("layout")),
            Resolution::Section,
        ));
        rules.push(rule(PathMatcher::Indexed, Resolution::Item));
        Self { rules }
    }
}

impl TargetResolver {
    #[cfg(test)]
    pub(crate) fn with_rules(rules: Vec<TargetRule>) -> Self {
        Self { rules }
    }

    pub(crate) fn resolve(&self, path: &DataPath) -> Target {
        for r in &self.rules {
            if !r.matcher.matches(path) {
                continue;
            }
            if let Some(target) = apply(r, path) {
                return target;
            }
        }
        Target::Path { path: path.clone() }
    }
}

fn apply(r: &TargetRule, path: &DataPath) -> Option<Target> {
    match r.resolution {
        Resolution::RootAttribute => match path.last()? {
            PathSeg::Key(k) => Some(Target::Root {
                attribute: k.clone(),
            }),
            PathSeg::Index(_) => None,
        },
        Resolution::ThemeVariable => {
            let variable = path.to_string();
            let variable = variable
                .strip_prefix("theme.")
                .unwrap_or(&variable)
                .to_owned();
            Some(Target::Theme { variable })
        }
        Resolution::Section => {
            let section = match &r.matcher {
                PathMatcher::Exact(p) | PathMatcher::Prefix(p) => p.clone(),
                PathMatcher::Indexed => path.clone(),
            };
            Some(Target::Section { path: section })
        }
        Resolution::Item => {
            let (collection, index) = path.deepest_index()?;
            Some(Target::Item { collection, index })
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/patch/target.rs"]
mod tests;
