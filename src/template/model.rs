use crate::foundation::error::{ChartkitError, ChartkitResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Registration payload for a template.
///
/// `variables` lists the data paths the body expects (`sections`, `theme.colors.primary`, ...).
/// A trailing `.*` only requires the prefix object to exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Markup with `{{...}}` placeholders and blocks.
    pub body: String,
    /// Template-local partials, consulted before the registry's shared partials.
    pub partials: BTreeMap<String, String>,
    /// Declared variable contract.
    pub variables: Vec<String>,
    /// Free-form grouping label.
    pub category: String,
}

impl TemplateConfig {
    /// Config with just a body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Builder-style partial.
    pub fn with_partial(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.partials.insert(name.into(), body.into());
        self
    }

    /// Builder-style declared variables.
    pub fn with_variables<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = vars.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Parse a template config from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ChartkitResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ChartkitError::serde(format!("parse template JSON: {e}")))
    }

    /// Parse a template config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ChartkitResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ChartkitError::validation(format!("open template JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }
}

/// A registered template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Registry id.
    pub id: String,
    /// Registration payload.
    pub config: TemplateConfig,
}
