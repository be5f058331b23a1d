use crate::foundation::error::{ChartkitError, ChartkitResult};
use crate::theme::builtin::{DEFAULT_THEME_ID, dark_theme, default_theme};
use crate::theme::model::{Theme, ThemeVariables};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct ActiveTheme {
    id: String,
    variables: Arc<ThemeVariables>,
}

/// Registry of named themes plus the currently active one.
///
/// The active theme's flattened variables are cached and recomputed on every `set_active` and on
/// re-registration of the active id, so a stale map is never handed out after a switch.
#[derive(Debug, Clone, Default)]
pub struct ThemeRegistry {
    themes: HashMap<String, Arc<Theme>>,
    active: Option<ActiveTheme>,
}

impl ThemeRegistry {
    /// Empty registry with no active theme.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the `default` and `dark` themes, `default` active.
    pub fn with_builtin() -> Self {
        let mut reg = Self::new();
        for theme in [default_theme(), dark_theme()] {
            let id = theme.id.clone();
            reg.themes.insert(id, Arc::new(theme));
        }
        reg.activate(DEFAULT_THEME_ID);
        reg
    }

    /// Validate and store a theme under `id`.
    ///
    /// Invalid themes are rejected as a whole with every violated path; nothing is written.
    pub fn register(&mut self, id: impl Into<String>, mut theme: Theme) -> ChartkitResult<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ChartkitError::registration("theme id must be non-empty"));
        }
        theme.id = id.clone();
        theme
            .validate()
            .map_err(|violations| ChartkitError::InvalidTheme {
                id: id.clone(),
                violations,
            })?;

        tracing::debug!(theme = %id, "registered theme");
        self.themes.insert(id.clone(), Arc::new(theme));
        if self.active.as_ref().is_some_and(|a| a.id == id) {
            self.activate(&id);
        }
        Ok(())
    }

    /// Look up a registered theme.
    pub fn get(&self, id: &str) -> ChartkitResult<Arc<Theme>> {
        self.themes
            .get(id)
            .cloned()
            .ok_or_else(|| ChartkitError::not_found(format!("theme '{id}'")))
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.themes.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.themes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Make `id` the active theme.
    pub fn set_active(&mut self, id: &str) -> ChartkitResult<()> {
        if !self.themes.contains_key(id) {
            return Err(ChartkitError::not_found(format!("theme '{id}'")));
        }
        self.activate(id);
        Ok(())
    }

    fn activate(&mut self, id: &str) {
        let Some(theme) = self.themes.get(id) else {
            return;
        };
        self.active = Some(ActiveTheme {
            id: id.to_owned(),
            variables: Arc::new(theme.flatten()),
        });
    }

    /// Id of the active theme, if any.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.id.as_str())
    }

    /// Flattened variables of the active theme.
    pub fn active_variables(&self) -> Option<Arc<ThemeVariables>> {
        self.active.as_ref().map(|a| Arc::clone(&a.variables))
    }

    /// Flattened variables of any registered theme.
    pub fn variables(&self, id: &str) -> ChartkitResult<ThemeVariables> {
        Ok(self.get(id)?.flatten())
    }

    /// Resolve `theme_id` (or the active theme when `None`).
    pub fn resolve(&self, theme_id: Option<&str>) -> ChartkitResult<Arc<Theme>> {
        match theme_id {
            Some(id) => self.get(id),
            None => {
                let id = self
                    .active_id()
                    .ok_or_else(|| ChartkitError::not_found("no active theme"))?;
                self.get(id)
            }
        }
    }

    /// Deep copy of `data` with a `theme` field holding the resolved theme bundle.
    pub fn apply_to_data(&self, data: &Value, theme_id: Option<&str>) -> ChartkitResult<Value> {
        let theme = self.resolve(theme_id)?;
        apply_theme(data, &theme)
    }
}

/// Deep copy of `data` with its `theme` field set to an owned copy of `theme`'s nested bundle
/// (`{ "colors": { "primary": .. }, .. }`), not the flattened variable map.
///
/// The nesting mirrors the flattened keys, so every variable `k` of [`Theme::flatten`] resolves
/// as the dotted path `theme.k` in the result.
pub fn apply_theme(data: &Value, theme: &Theme) -> ChartkitResult<Value> {
    let Value::Object(map) = data else {
        return Err(ChartkitError::validation(
            "data tree root must be an object to receive a theme",
        ));
    };
    let mut out = map.clone();
    out.insert("theme".to_owned(), theme.to_bundle());
    Ok(Value::Object(out))
}

#[cfg(test)]
#[path = "../../tests/unit/theme/registry.rs"]
mod tests;
