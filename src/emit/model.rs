//! Model stage: the data-model artifact, first in the run order.
//!
//! Every later stage's generated references assume the model type exists,
//! so this artifact only references sibling model artifacts (relation
//! targets), never anything a later stage produces.

use crate::emit::{Artifact, EmitContext, EmitterStage, StageKind};
use crate::error::Result;
use crate::schema::EntityDefinition;
use std::path::PathBuf;

pub(crate) const TEMPLATE_NAME: &str = "model.rs.tera";

pub(crate) const TEMPLATE: &str = r##"//! Generated by entigen — data model for {{ entity.label }}.
//! Do not edit by hand; regenerate instead.

use serde::{Deserialize, Serialize};
{% for import in model_imports %}use super::{{ import.module }}::{{ import.symbol }};
{% endfor %}
/// Primary-key alias for `{{ entity.name }}`.
pub type {{ entity.name }}Id = i64;

{% if entity.description %}/// {{ entity.description }}
{% else %}/// {{ entity.label }} record.
{% endif %}#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct {{ entity.name }} {
    pub id: {{ entity.name }}Id,
{% if entity.multi_tenant %}    /// Owning tenant; every query is scoped by this column.
    pub tenant_id: i64,
{% endif %}{% for p in scalars %}{% if p.help_text %}    /// {{ p.help_text }}
{% endif %}    pub {{ p.name }}: {{ p.rust_type }},
{% endfor %}{% for r in relations %}{% if r.to_many %}    pub {{ r.name }}: Vec<{{ r.target_id_type }}>,
{% else %}    pub {{ r.fk_column }}: {% if r.nullable %}Option<{{ r.target_id_type }}>{% else %}{{ r.target_id_type }}{% endif %},
{% endif %}{% endfor %}}

impl {{ entity.name }} {
    pub const TABLE: &'static str = "{{ entity.table }}";
{% if has_relations %}
    /// Relation fields declared on this model, in definition order.
    pub const RELATIONS: &'static [&'static str] = &[{% for r in relations %}"{{ r.name }}"{% if not loop.last %}, {% endif %}{% endfor %}];
{% endif %}}
"##;

/// Emits `src/models/<entity>.rs`.
pub struct ModelStage;

impl EmitterStage for ModelStage {
    fn kind(&self) -> StageKind {
        StageKind::Model
    }

    fn plan(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf> {
        vec![cx.path(format!("src/models/{}.rs", entity.snake_name()))]
    }

    fn emit(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let path = cx.path(format!("src/models/{}.rs", entity.snake_name()));
        let contents = cx.render(TEMPLATE_NAME, entity)?;
        Ok(vec![Artifact { path, contents }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::context::tests_support::two_entity_schema;

    #[test]
    fn model_references_only_model_symbols() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let cx = EmitContext::new(&schema, std::path::Path::new("/tmp/out"));

        let artifacts = ModelStage.emit(contact, &cx).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert!(artifacts[0].path.ends_with("src/models/contact.rs"));

        let code = &artifacts[0].contents;
        assert!(code.contains("pub struct Contact {"));
        assert!(code.contains("use super::organization::OrganizationId;"));
        assert!(code.contains("pub organization_id:"));
        // Later-stage symbols must never leak into the model artifact.
        assert!(!code.contains("Repository"));
        assert!(!code.contains("Controller"));
        assert!(!code.contains("Resource"));
    }

    #[test]
    fn emission_is_idempotent() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let cx = EmitContext::new(&schema, std::path::Path::new("/tmp/out"));

        let first = ModelStage.emit(contact, &cx).unwrap();
        let second = ModelStage.emit(contact, &cx).unwrap();
        assert_eq!(first[0].contents, second[0].contents);
    }
}
