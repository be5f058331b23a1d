use crate::template::compile::VarDecl;
use serde::Serialize;
use serde_json::Value;

/// Outcome of checking a data tree against a template's declared variables.
///
/// Returned as data: a template with missing variables still renders, leaving the affected
/// placeholders verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// `true` when nothing is missing.
    pub valid: bool,
    /// Declared variables (as written at registration) that do not resolve in the data.
    pub missing: Vec<String>,
}

pub(crate) fn validate_data(contract: &[VarDecl], data: &Value) -> ValidationResult {
    let missing: Vec<String> = contract
        .iter()
        .filter(|decl| !is_satisfied(decl, data))
        .map(|decl| {
            if decl.wildcard {
                format!("{}.*", decl.path)
            } else {
                decl.path.to_string()
            }
        })
        .collect();
    ValidationResult {
        valid: missing.is_empty(),
        missing,
    }
}

fn is_satisfied(decl: &VarDecl, data: &Value) -> bool {
    match decl.path.lookup(data) {
        None => false,
        Some(Value::Object(_)) => true,
        // A wildcard needs an object (or array) under the prefix to enumerate.
        Some(Value::Array(_)) => true,
        Some(_) => !decl.wildcard,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/validate.rs"]
mod tests;
