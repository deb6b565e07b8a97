//! Form stage: input struct plus field metadata for the form layer.

use crate::emit::{Artifact, EmitContext, EmitterStage, StageKind};
use crate::error::Result;
use crate::schema::EntityDefinition;
use std::path::PathBuf;

pub(crate) const TEMPLATE_NAME: &str = "form.rs.tera";

pub(crate) const TEMPLATE: &str = r##"//! Generated by entigen — form for {{ entity.label }}.
//! Do not edit by hand; regenerate instead.

use serde::Deserialize;

/// One renderable form field: (name, label, widget, required).
pub const FIELDS: &[(&str, &str, &str, bool)] = &[
{% for p in form_scalars %}    ("{{ p.name }}", "{{ p.label }}", "{{ p.widget }}", {{ p.required }}),
{% endfor %}{% for r in form_relations %}    ("{{ r.fk_column }}", "{{ r.label }}", "select", false),
{% endfor %}];

/// Submitted form payload for {{ entity.label }}.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct {{ entity.name }}Form {
{% for p in form_scalars %}    pub {{ p.name }}: Option<String>,
{% endfor %}{% for r in form_relations %}    pub {{ r.fk_column }}: Option<i64>,
{% endfor %}}

impl {{ entity.name }}Form {
    /// Field-level validation; returns one message per violation.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
{% for p in form_scalars %}{% if p.required %}        if self.{{ p.name }}.as_deref().map_or(true, |v| v.trim().is_empty()) {
            errors.push("{{ p.label }} must not be blank".to_string());
        }
{% endif %}{% if p.length %}        if self.{{ p.name }}.as_deref().is_some_and(|v| v.len() > {{ p.length }}) {
            errors.push("{{ p.label }} must be at most {{ p.length }} characters".to_string());
        }
{% endif %}{% endfor %}        errors
    }
}
"##;

/// Emits `src/forms/<entity>_form.rs`.
pub struct FormStage;

impl EmitterStage for FormStage {
    fn kind(&self) -> StageKind {
        StageKind::Form
    }

    fn plan(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf> {
        vec![cx.path(format!("src/forms/{}_form.rs", entity.snake_name()))]
    }

    fn emit(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let path = cx.path(format!("src/forms/{}_form.rs", entity.snake_name()));
        let contents = cx.render(TEMPLATE_NAME, entity)?;
        Ok(vec![Artifact { path, contents }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::context::tests_support::two_entity_schema;

    #[test]
    fn form_fields_follow_visibility_and_widgets() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let cx = EmitContext::new(&schema, std::path::Path::new("/tmp/out"));

        let code = &FormStage.emit(contact, &cx).unwrap()[0].contents;
        assert!(code.contains(r#"("email", "Email", "text_input", true)"#));
        assert!(code.contains(r#"("notes", "Notes", "text_area", false)"#));
        assert!(code.contains(r#"("organization_id", "Organization", "select", false)"#));
        assert!(code.contains("must not be blank"));
        assert!(code.contains("at most 180 characters"));
    }
}
