//! Test stages: the four generated test suites.
//!
//! They run last in the stage order because they assert against all earlier
//! artifacts, and they are additionally gated by the entity's
//! `generate_tests` flag.

use crate::emit::{Artifact, EmitContext, EmitterStage, StageKind};
use crate::error::Result;
use crate::schema::EntityDefinition;
use std::path::PathBuf;

pub(crate) const MODEL_TEST_TEMPLATE_NAME: &str = "model_test.rs.tera";
pub(crate) const API_TEST_TEMPLATE_NAME: &str = "api_test.rs.tera";
pub(crate) const REPOSITORY_TEST_TEMPLATE_NAME: &str = "repository_test.rs.tera";
pub(crate) const CONTROLLER_TEST_TEMPLATE_NAME: &str = "controller_test.rs.tera";

pub(crate) const MODEL_TEST_TEMPLATE: &str = r##"//! Generated by entigen — model tests for {{ entity.label }}.

use app::models::{{ entity.snake_name }}::{{ entity.name }};

fn fixture() -> {{ entity.name }} {
    {{ entity.name }} {
        id: 1,
{% if entity.multi_tenant %}        tenant_id: 1,
{% endif %}{% for p in scalars %}        {{ p.name }}: {{ p.sample }},
{% endfor %}{% for r in relations %}{% if r.to_many %}        {{ r.name }}: Vec::new(),
{% else %}        {{ r.fk_column }}: {% if r.nullable %}None{% else %}1{% endif %},
{% endif %}{% endfor %}    }
}

#[test]
fn round_trips_through_serde() {
    let model = fixture();
    let json = serde_json::to_string(&model).unwrap();
    let back: {{ entity.name }} = serde_json::from_str(&json).unwrap();
    assert_eq!(model, back);
}

#[test]
fn table_name_is_stable() {
    assert_eq!({{ entity.name }}::TABLE, "{{ entity.table }}");
}
{% if has_relations %}
#[test]
fn relations_are_declared() {
    assert_eq!({{ entity.name }}::RELATIONS, &[{% for r in relations %}"{{ r.name }}"{% if not loop.last %}, {% endif %}{% endfor %}]);
}
{% endif %}"##;

pub(crate) const API_TEST_TEMPLATE: &str = r##"//! Generated by entigen — API tests for {{ entity.label }}.

use app::api::{{ entity.snake_name }}_resource as resource;

#[test]
fn operations_are_exposed() {
    assert_eq!(
        resource::OPERATIONS,
        &[{% for op in entity.api.operations %}"{{ op }}"{% if not loop.last %}, {% endif %}{% endfor %}]
    );
}

#[test]
fn page_size_matches_definition() {
    assert_eq!(resource::PAGE_SIZE, {{ entity.api.page_size }});
}

#[test]
fn resource_name_is_stable() {
    assert_eq!(resource::RESOURCE, "{{ entity.snake_name }}");
}
"##;

pub(crate) const REPOSITORY_TEST_TEMPLATE: &str = r##"//! Generated by entigen — repository tests for {{ entity.label }}.

use app::models::{{ entity.snake_name }}::{{ entity.name }};
use app::repositories::{{ entity.snake_name }}_repository::{ {{ entity.name }}Repository, COLUMNS, SCHEMA, TABLE };
use rusqlite::Connection;

fn connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
}

fn fixture() -> {{ entity.name }} {
    {{ entity.name }} {
        id: 0,
{% if entity.multi_tenant %}        tenant_id: 1,
{% endif %}{% for p in scalars %}        {{ p.name }}: {{ p.sample }},
{% endfor %}{% for r in relations %}{% if r.to_many %}        {{ r.name }}: Vec::new(),
{% else %}        {{ r.fk_column }}: {% if r.nullable %}None{% else %}1{% endif %},
{% endif %}{% endfor %}    }
}

#[test]
fn schema_and_columns_agree() {
    assert_eq!(TABLE, "{{ entity.table }}");
    assert_eq!(COLUMNS[0], "id");
    connection();
}

#[test]
fn insert_then_find_round_trips() {
    let conn = connection();
    let repo = {{ entity.name }}Repository::new(&conn);

    let id = repo.insert(&fixture()).unwrap();
    let found = repo.find(id).unwrap().expect("row must exist");
    assert_eq!(found.id, id);
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn find_missing_returns_none() {
    let conn = connection();
    let repo = {{ entity.name }}Repository::new(&conn);
    assert!(repo.find(9999).unwrap().is_none());
}
"##;

pub(crate) const CONTROLLER_TEST_TEMPLATE: &str = r##"//! Generated by entigen — controller tests for {{ entity.label }}.

use app::controllers::{{ entity.snake_name }}_controller::{ {{ entity.name }}Controller, ROUTES };
use rusqlite::Connection;

#[test]
fn route_table_matches_operations() {
    assert_eq!(ROUTES.len(), {{ route_count }});
{% if ops.list %}    assert!(ROUTES.contains(&("GET", "/{{ entity.snake_name }}", "list")));
{% endif %}{% if ops.get %}    assert!(ROUTES.contains(&("GET", "/{{ entity.snake_name }}/:id", "get")));
{% endif %}{% if ops.create %}    assert!(ROUTES.contains(&("POST", "/{{ entity.snake_name }}", "create")));
{% endif %}{% if ops.update %}    assert!(ROUTES.contains(&("PUT", "/{{ entity.snake_name }}/:id", "update")));
{% endif %}{% if ops.delete %}    assert!(ROUTES.contains(&("DELETE", "/{{ entity.snake_name }}/:id", "delete")));
{% endif %}}
{% if ops.list %}
#[test]
fn list_starts_empty() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(app::repositories::{{ entity.snake_name }}_repository::SCHEMA).unwrap();

    let controller = {{ entity.name }}Controller::new(&conn);
    assert!(controller.list().unwrap().is_empty());
}
{% endif %}"##;

macro_rules! test_stage {
    ($stage:ident, $kind:expr, $template:ident, $suffix:literal) => {
        pub struct $stage;

        impl EmitterStage for $stage {
            fn kind(&self) -> StageKind {
                $kind
            }

            fn plan(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf> {
                vec![cx.path(format!(concat!("tests/{}_", $suffix, ".rs"), entity.snake_name()))]
            }

            fn emit(
                &self,
                entity: &EntityDefinition,
                cx: &EmitContext<'_>,
            ) -> Result<Vec<Artifact>> {
                let path =
                    cx.path(format!(concat!("tests/{}_", $suffix, ".rs"), entity.snake_name()));
                let contents = cx.render($template, entity)?;
                Ok(vec![Artifact { path, contents }])
            }
        }
    };
}

test_stage!(
    ModelTestStage,
    StageKind::ModelTest,
    MODEL_TEST_TEMPLATE_NAME,
    "model_test"
);
test_stage!(
    ApiTestStage,
    StageKind::ApiTest,
    API_TEST_TEMPLATE_NAME,
    "api_test"
);
test_stage!(
    RepositoryTestStage,
    StageKind::RepositoryTest,
    REPOSITORY_TEST_TEMPLATE_NAME,
    "repository_test"
);
test_stage!(
    ControllerTestStage,
    StageKind::ControllerTest,
    CONTROLLER_TEST_TEMPLATE_NAME,
    "controller_test"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::context::tests_support::two_entity_schema;

    #[test]
    fn model_test_builds_fixture_from_hints() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let cx = EmitContext::new(&schema, std::path::Path::new("/tmp/out"));

        let artifacts = ModelTestStage.emit(contact, &cx).unwrap();
        assert!(artifacts[0].path.ends_with("tests/contact_model_test.rs"));

        let code = &artifacts[0].contents;
        assert!(code.contains(r#"email: "user@example.com".to_string(),"#));
        assert!(code.contains("organization_id: None,"));
        assert!(code.contains("fn round_trips_through_serde()"));
    }

    #[test]
    fn controller_test_checks_route_table() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let cx = EmitContext::new(&schema, std::path::Path::new("/tmp/out"));

        let code = &ControllerTestStage.emit(contact, &cx).unwrap()[0].contents;
        assert!(code.contains("assert_eq!(ROUTES.len(), 3);"));
        assert!(code.contains(r#"ROUTES.contains(&("POST", "/contact", "create"))"#));
    }
}
