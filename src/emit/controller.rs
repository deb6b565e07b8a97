//! Controller stage: framework-neutral request handlers.
//!
//! The surrounding web layer is not generated here; the controller exposes
//! a route table plus handler methods over the generated repository and
//! API-resource types, for the host application to mount.

use crate::emit::{Artifact, EmitContext, EmitterStage, StageKind};
use crate::error::Result;
use crate::schema::EntityDefinition;
use std::path::PathBuf;

pub(crate) const TEMPLATE_NAME: &str = "controller.rs.tera";

pub(crate) const TEMPLATE: &str = r##"//! Generated by entigen — controller for {{ entity.label }}.
//! Do not edit by hand; regenerate instead.

use rusqlite::Connection;

use crate::api::{{ entity.snake_name }}_resource::{ {{ entity.name }}Resource, PAGE_SIZE };
{% if ops.create or ops.update %}use crate::models::{{ entity.snake_name }}::{{ entity.name }};
{% endif %}use crate::repositories::{{ entity.snake_name }}_repository::{{ entity.name }}Repository;

/// (method, path, handler) table mounted by the host router.
pub const ROUTES: &[(&str, &str, &str)] = &[
{% if ops.list %}    ("GET", "/{{ entity.snake_name }}", "list"),
{% endif %}{% if ops.get %}    ("GET", "/{{ entity.snake_name }}/:id", "get"),
{% endif %}{% if ops.create %}    ("POST", "/{{ entity.snake_name }}", "create"),
{% endif %}{% if ops.update %}    ("PUT", "/{{ entity.snake_name }}/:id", "update"),
{% endif %}{% if ops.delete %}    ("DELETE", "/{{ entity.snake_name }}/:id", "delete"),
{% endif %}];

pub struct {{ entity.name }}Controller<'c> {
    repo: {{ entity.name }}Repository<'c>,
}

impl<'c> {{ entity.name }}Controller<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            repo: {{ entity.name }}Repository::new(conn),
        }
    }
{% if ops.list %}
    pub fn list(&self) -> rusqlite::Result<Vec<{{ entity.name }}Resource>> {
        let models = self.repo.list(PAGE_SIZE)?;
        Ok(models.iter().map({{ entity.name }}Resource::from).collect())
    }
{% endif %}{% if ops.get %}
    pub fn get(&self, id: i64) -> rusqlite::Result<Option<{{ entity.name }}Resource>> {
        Ok(self.repo.find(id)?.as_ref().map({{ entity.name }}Resource::from))
    }
{% endif %}{% if ops.create %}
    pub fn create(&self, model: {{ entity.name }}) -> rusqlite::Result<{{ entity.name }}Resource> {
        let id = self.repo.insert(&model)?;
        let created = {{ entity.name }} { id, ..model };
        Ok({{ entity.name }}Resource::from(&created))
    }
{% endif %}{% if ops.update %}
    pub fn update(&self, model: &{{ entity.name }}) -> rusqlite::Result<usize> {
        self.repo.update(model)
    }
{% endif %}{% if ops.delete %}
    pub fn delete(&self, id: i64) -> rusqlite::Result<usize> {
        self.repo.delete(id)
    }
{% endif %}}
"##;

/// Emits `src/controllers/<entity>_controller.rs`.
pub struct ControllerStage;

impl EmitterStage for ControllerStage {
    fn kind(&self) -> StageKind {
        StageKind::Controller
    }

    fn plan(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf> {
        vec![cx.path(format!(
            "src/controllers/{}_controller.rs",
            entity.snake_name()
        ))]
    }

    fn emit(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let path = cx.path(format!(
            "src/controllers/{}_controller.rs",
            entity.snake_name()
        ));
        let contents = cx.render(TEMPLATE_NAME, entity)?;
        Ok(vec![Artifact { path, contents }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::context::tests_support::two_entity_schema;

    #[test]
    fn route_table_follows_enabled_operations() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let cx = EmitContext::new(&schema, std::path::Path::new("/tmp/out"));

        let artifacts = ControllerStage.emit(contact, &cx).unwrap();
        let code = &artifacts[0].contents;
        assert!(code.contains(r#"("GET", "/contact", "list")"#));
        assert!(code.contains(r#"("POST", "/contact", "create")"#));
        // Update and delete are not in the fixture's operation set.
        assert!(!code.contains(r#""PUT""#));
        assert!(!code.contains(r#""DELETE""#));
        assert!(code.contains("pub struct ContactController<'c> {"));
    }
}
