//! API-resource stage: read/write payload types for the API surface.

use crate::emit::{Artifact, EmitContext, EmitterStage, StageKind};
use crate::error::Result;
use crate::schema::EntityDefinition;
use std::path::PathBuf;

pub(crate) const TEMPLATE_NAME: &str = "api_resource.rs.tera";

pub(crate) const TEMPLATE: &str = r##"//! Generated by entigen — API resource for {{ entity.label }}.
//! Do not edit by hand; regenerate instead.

use serde::{Deserialize, Serialize};

use crate::models::{{ entity.snake_name }}::{{ entity.name }};

pub const RESOURCE: &str = "{{ entity.snake_name }}";
pub const OPERATIONS: &[&str] = &[{% for op in entity.api.operations %}"{{ op }}"{% if not loop.last %}, {% endif %}{% endfor %}];
pub const PAGE_SIZE: usize = {{ entity.api.page_size }};
{% if entity.api.security %}
/// Security expression evaluated before any operation is dispatched.
pub const SECURITY: &str = "{{ entity.api.security }}";
{% endif %}{% if entity.api.searchable_fields %}
pub const SEARCHABLE: &[&str] = &[{% for f in entity.api.searchable_fields %}"{{ f }}"{% if not loop.last %}, {% endif %}{% endfor %}];
{% endif %}{% if entity.api.filterable_fields %}
pub const FILTERABLE: &[&str] = &[{% for f in entity.api.filterable_fields %}"{{ f }}"{% if not loop.last %}, {% endif %}{% endfor %}];
{% endif %}
/// Read payload exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct {{ entity.name }}Resource {
    pub id: i64,
{% for p in scalars %}{% if p.api_readable %}    pub {{ p.name }}: {{ p.rust_type }},
{% endif %}{% endfor %}}

impl From<&{{ entity.name }}> for {{ entity.name }}Resource {
    fn from(model: &{{ entity.name }}) -> Self {
        Self {
            id: model.id,
{% for p in scalars %}{% if p.api_readable %}            {{ p.name }}: model.{{ p.name }}.clone(),
{% endif %}{% endfor %}        }
    }
}

/// Write payload accepted by the create and update operations.
#[derive(Debug, Clone, Deserialize)]
pub struct {{ entity.name }}Input {
{% for p in scalars %}{% if p.api_writable %}    pub {{ p.name }}: {{ p.rust_type }},
{% endif %}{% endfor %}}
"##;

/// Emits `src/api/<entity>_resource.rs`.
pub struct ApiResourceStage;

impl EmitterStage for ApiResourceStage {
    fn kind(&self) -> StageKind {
        StageKind::ApiResource
    }

    fn plan(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf> {
        vec![cx.path(format!("src/api/{}_resource.rs", entity.snake_name()))]
    }

    fn emit(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let path = cx.path(format!("src/api/{}_resource.rs", entity.snake_name()));
        let contents = cx.render(TEMPLATE_NAME, entity)?;
        Ok(vec![Artifact { path, contents }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::context::tests_support::two_entity_schema;

    #[test]
    fn resource_carries_operations_and_readable_fields() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let cx = EmitContext::new(&schema, std::path::Path::new("/tmp/out"));

        let artifacts = ApiResourceStage.emit(contact, &cx).unwrap();
        let code = &artifacts[0].contents;
        assert!(code.contains(r#"pub const OPERATIONS: &[&str] = &["list", "get", "create"];"#));
        assert!(code.contains("pub struct ContactResource {"));
        assert!(code.contains("pub email: String,"));
        // `notes` is readable but nullable, so it stays optional.
        assert!(code.contains("pub notes: Option<String>,"));
        // Writable subset: only email is writable in the fixture.
        assert!(code.contains("pub struct ContactInput {"));
    }
}
