use crate::foundation::error::{ChartkitError, ChartkitResult};
use crate::template::compile::{CompiledTemplate, compile_template};
use crate::template::model::{Template, TemplateConfig};
use crate::template::render::render;
use crate::template::validate::{ValidationResult, validate_data};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Registration rules for [`TemplateRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryPolicy {
    /// Allow re-registering an existing template id (replacing it).
    pub allow_overwrite: bool,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self {
            allow_overwrite: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    template: Template,
    compiled: Arc<CompiledTemplate>,
}

/// Named templates plus the shared partials they may reference.
///
/// Templates are compiled when registered, so an unresolved partial or malformed block is reported
/// by `register` and never at render time. The compiled form is cached per id.
///
/// Every compile is stamped with a fresh revision; a template replaced by `register` or recompiled
/// by `register_partial` never shares a revision with its previous form.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    policy: RegistryPolicy,
    templates: HashMap<String, Entry>,
    partials: BTreeMap<String, String>,
    last_revision: u64,
}

impl TemplateRegistry {
    /// Empty registry with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry with an explicit policy.
    pub fn with_policy(policy: RegistryPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Compile and store a template under `id`.
    pub fn register(&mut self, id: impl Into<String>, config: TemplateConfig) -> ChartkitResult<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ChartkitError::registration("template id must be non-empty"));
        }
        if !self.policy.allow_overwrite && self.templates.contains_key(&id) {
            return Err(ChartkitError::registration(format!(
                "template '{id}' is already registered"
            )));
        }
        let template = Template { id: id.clone(), config };
        let mut compiled = compile_template(&template, &self.partials)?;
        compiled.revision = self.next_revision();
        tracing::debug!(
            template = %id,
            category = %template.config.category,
            revision = compiled.revision,
            "registered template"
        );
        let compiled = Arc::new(compiled);
        self.templates.insert(id, Entry { template, compiled });
        Ok(())
    }

    /// Store a partial shared by every template.
    ///
    /// Registered templates are recompiled against the new partial set; if any of them no longer
    /// compiles, the partial is rejected and the registry is left unchanged.
    pub fn register_partial(
        &mut self,
        name: impl Into<String>,
        body: impl Into<String>,
    ) -> ChartkitResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ChartkitError::registration("partial name must be non-empty"));
        }
        let mut partials = self.partials.clone();
        partials.insert(name.clone(), body.into());

        let mut recompiled = Vec::with_capacity(self.templates.len());
        for (id, entry) in &self.templates {
            let compiled = compile_template(&entry.template, &partials).map_err(|e| {
                ChartkitError::registration(format!(
                    "partial '{name}' breaks template '{id}': {e}"
                ))
            })?;
            recompiled.push((id.clone(), compiled));
        }

        for (id, mut compiled) in recompiled {
            compiled.revision = self.next_revision();
            if let Some(entry) = self.templates.get_mut(&id) {
                entry.compiled = Arc::new(compiled);
            }
        }
        self.partials = partials;
        tracing::debug!(partial = %name, "registered shared partial");
        Ok(())
    }

    fn next_revision(&mut self) -> u64 {
        self.last_revision += 1;
        self.last_revision
    }

    /// Compiled form of `id`.
    pub(crate) fn compile(&self, id: &str) -> ChartkitResult<Arc<CompiledTemplate>> {
        self.templates
            .get(id)
            .map(|e| Arc::clone(&e.compiled))
            .ok_or_else(|| ChartkitError::not_found(format!("template '{id}'")))
    }

    /// Registered template (as configured).
    pub fn get(&self, id: &str) -> ChartkitResult<&Template> {
        self.templates
            .get(id)
            .map(|e| &e.template)
            .ok_or_else(|| ChartkitError::not_found(format!("template '{id}'")))
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.templates.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Render `id` against `data`. Unresolved placeholders are kept verbatim.
    pub fn render(&self, id: &str, data: &Value) -> ChartkitResult<String> {
        let compiled = self.compile(id)?;
        Ok(render(&compiled, data))
    }

    /// Check `data` against the declared variables of `id`.
    pub fn validate(&self, id: &str, data: &Value) -> ChartkitResult<ValidationResult> {
        Ok(validate_data(&self.compile(id)?.contract, data))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/registry.rs"]
mod tests;
