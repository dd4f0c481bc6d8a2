//! Tera rendering for system prompts
use serde::Serialize;
use std::fs;
use std::path::Path;
use tera::{Context, Error as TeraError, Tera};

/// Render `template` with the fields of `context_data` as variables
pub fn render_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let context = Context::from_serialize(context_data)?;
    Tera::one_off(template, &context, false)
}

/// Read a template from disk and render it
pub fn render_prompt_file<T: Serialize>(
    path: &Path,
    context_data: &T,
) -> Result<String, TeraError> {
    let template = fs::read_to_string(path).map_err(|e| {
        TeraError::chain(
            format!("Failed to read prompt template {}", path.display()),
            e,
        )
    })?;
    render_prompt(&template, context_data)
}
