use crate::foundation::error::{ChartkitError, ChartkitResult};
use crate::theme::color::parse_color;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Leaf paths every theme must define.
pub const REQUIRED_THEME_PATHS: &[&str] = &[
    "colors.primary",
    "colors.background",
    "colors.text",
    "typography.fontFamily",
];

/// Flattened theme variables: dotted path -> leaf value.
pub type ThemeVariables = BTreeMap<String, Value>;

/// A named bundle of style groups.
///
/// Groups are free-form nested objects; validation only enforces [`REQUIRED_THEME_PATHS`] and the
/// syntax of color-typed values (anything under `colors`, or any leaf whose key ends in `color`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Theme {
    /// Registry id. Overwritten by the registry on registration.
    #[serde(default)]
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Color palette.
    #[serde(default)]
    pub colors: Map<String, Value>,
    /// Font families, sizes and weights.
    #[serde(default)]
    pub typography: Map<String, Value>,
    /// Margins, paddings and gaps.
    #[serde(default)]
    pub spacing: Map<String, Value>,
    /// Stroke widths, radii and border colors.
    #[serde(default)]
    pub borders: Map<String, Value>,
    /// Drop shadow definitions.
    #[serde(default)]
    pub shadows: Map<String, Value>,
    /// Animation timings.
    #[serde(default)]
    pub animation: Map<String, Value>,
}

impl Theme {
    /// Parse a theme from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ChartkitResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ChartkitError::serde(format!("parse theme JSON: {e}")))
    }

    /// Parse a theme from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ChartkitResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ChartkitError::validation(format!("open theme JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    fn groups(&self) -> [(&'static str, &Map<String, Value>); 6] {
        [
            ("colors", &self.colors),
            ("typography", &self.typography),
            ("spacing", &self.spacing),
            ("borders", &self.borders),
            ("shadows", &self.shadows),
            ("animation", &self.animation),
        ]
    }

    /// Flatten every style group into dotted-path variables.
    ///
    /// Nested objects are walked depth-first; arrays stay intact as a single leaf.
    pub fn flatten(&self) -> ThemeVariables {
        let mut out = ThemeVariables::new();
        for (name, group) in self.groups() {
            flatten_into(name, group, &mut out);
        }
        out
    }

    /// Check required leaves and color syntax. Returns every violation as `path: reason`.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push("name: must be non-empty".to_owned());
        }

        let vars = self.flatten();
        for req in REQUIRED_THEME_PATHS {
            if !vars.contains_key(*req) {
                violations.push(format!("{req}: required field is missing"));
            }
        }

        for (path, value) in &vars {
            if !is_color_path(path) {
                continue;
            }
            match value {
                Value::String(s) => {
                    if let Err(e) = parse_color(s) {
                        violations.push(format!("{path}: {e}"));
                    }
                }
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        let res = match item {
                            Value::String(s) => parse_color(s).map(|_| ()),
                            other => Err(format!("expected color string, got {other}")),
                        };
                        if let Err(e) = res {
                            violations.push(format!("{path}[{i}]: {e}"));
                        }
                    }
                }
                other => violations.push(format!("{path}: expected color string, got {other}")),
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Nested, fully owned JSON form injected into data trees as the `theme` field.
    pub fn to_bundle(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("id".to_owned(), Value::String(self.id.clone()));
        obj.insert("name".to_owned(), Value::String(self.name.clone()));
        for (name, group) in self.groups() {
            obj.insert(name.to_owned(), Value::Object(group.clone()));
        }
        Value::Object(obj)
    }
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut ThemeVariables) {
    for (k, v) in map {
        let path = format!("{prefix}.{k}");
        match v {
            Value::Object(inner) => flatten_into(&path, inner, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

fn is_color_path(path: &str) -> bool {
    if path.starts_with("colors.") {
        return true;
    }
    let last = path.rsplit('.').next().unwrap_or(path);
    last.to_ascii_lowercase().ends_with("color")
}

#[cfg(test)]
#[path = "../../tests/unit/theme/model.rs"]
mod tests;
