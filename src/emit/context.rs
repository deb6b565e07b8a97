//! Shared rendering context for emitter stages.
//!
//! Templates receive a pre-chewed JSON view of the entity definition —
//! derived names, partitioned property subsets, widget classifications,
//! deterministic sample literals — so the template text itself stays free
//! of schema logic.

use crate::error::Result;
use crate::schema::types::{OrderClause, ScalarType};
use crate::schema::{EntityDefinition, PropertyDefinition, SchemaSet};
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tera::Tera;

use super::{api_resource, controller, form, model, page, policy, repository, test_suite};

static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (model::TEMPLATE_NAME, model::TEMPLATE),
        (api_resource::TEMPLATE_NAME, api_resource::TEMPLATE),
        (repository::TEMPLATE_NAME, repository::TEMPLATE),
        (controller::TEMPLATE_NAME, controller::TEMPLATE),
        (policy::TEMPLATE_NAME, policy::TEMPLATE),
        (form::TEMPLATE_NAME, form::TEMPLATE),
        (page::INDEX_TEMPLATE_NAME, page::INDEX_TEMPLATE),
        (page::DETAIL_TEMPLATE_NAME, page::DETAIL_TEMPLATE),
        (test_suite::MODEL_TEST_TEMPLATE_NAME, test_suite::MODEL_TEST_TEMPLATE),
        (test_suite::API_TEST_TEMPLATE_NAME, test_suite::API_TEST_TEMPLATE),
        (
            test_suite::REPOSITORY_TEST_TEMPLATE_NAME,
            test_suite::REPOSITORY_TEST_TEMPLATE,
        ),
        (
            test_suite::CONTROLLER_TEST_TEMPLATE_NAME,
            test_suite::CONTROLLER_TEST_TEMPLATE,
        ),
    ])
    .expect("stage templates are statically valid");
    tera
});

/// Rendering context shared by all stages of one run.
pub struct EmitContext<'a> {
    pub schema: &'a SchemaSet,
    pub output_root: &'a Path,
}

impl<'a> EmitContext<'a> {
    pub fn new(schema: &'a SchemaSet, output_root: &'a Path) -> Self {
        Self {
            schema,
            output_root,
        }
    }

    /// Resolve a path under the output root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.output_root.join(relative)
    }

    /// Render one registered stage template against an entity view.
    pub fn render(&self, template: &str, entity: &EntityDefinition) -> Result<String> {
        let context = tera::Context::from_serialize(entity_view(entity, self.schema))?;
        Ok(TEMPLATES.render(template, &context)?)
    }
}

// ============================================================================
// View building
// ============================================================================

/// The full JSON view one entity presents to templates.
pub fn entity_view(entity: &EntityDefinition, schema: &SchemaSet) -> Value {
    let scalars: Vec<Value> = entity
        .scalar_properties()
        .into_iter()
        .map(scalar_view)
        .collect();
    let relations: Vec<Value> = entity
        .relation_properties()
        .into_iter()
        .filter_map(|p| relation_view(p, schema))
        .collect();

    let ops = &entity.api.operations;
    let has_op = |name: &str| ops.iter().any(|op| op.to_string() == name);

    json!({
        "entity": {
            "name": entity.name,
            "snake_name": entity.snake_name(),
            "table": entity.table_name(),
            "label": entity.label,
            "plural_label": entity.plural_label,
            "description": entity.description,
            "icon": entity.icon,
            "multi_tenant": entity.multi_tenant,
            "generate_tests": entity.generate_tests,
            "api": {
                "enabled": entity.api.enabled,
                "operations": ops.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "security": entity.api.security,
                "page_size": entity.api.page_size,
                "order_by": order_by_view(&entity.api.order_by),
                "order_by_sql": order_by_sql(&entity.api.order_by),
                "searchable_fields": entity.api.searchable_fields,
                "filterable_fields": entity.api.filterable_fields,
            },
            "policy": {
                "enabled": entity.policy.enabled,
                "roles": entity.policy.roles,
            },
            "menu": {
                "group": entity.menu.group,
                "order": entity.menu.order,
            },
        },
        "scalars": scalars,
        "relations": relations,
        "has_relations": entity.has_relations(),
        "ops": {
            "list": has_op("list"),
            "get": has_op("get"),
            "create": has_op("create"),
            "update": has_op("update"),
            "delete": has_op("delete"),
        },
        "model_imports": model_imports(entity, schema),
        "route_count": entity.api.operations.len(),
        "columns": column_names(entity),
        "columns_no_id": column_names(entity)[1..].to_vec(),
        "update_id_placeholder": column_names(entity).len(),
        "insert_params": insert_params(entity),
        "create_table_sql": create_table_sql(entity),
        "list_props": visible_props(&scalars, &relations, "show_in_list"),
        "detail_props": visible_props(&scalars, &relations, "show_in_detail"),
        "form_scalars": filter_flag(&scalars, "show_in_form"),
        "form_relations": filter_flag(&relations, "show_in_form"),
    })
}

/// Value expressions matching `columns_no_id`, used by generated inserts.
fn insert_params(entity: &EntityDefinition) -> Vec<String> {
    let mut params = Vec::new();
    if entity.multi_tenant {
        params.push("model.tenant_id".to_string());
    }
    for p in &entity.properties {
        match p.relation() {
            None => params.push(format!("model.{}", p.name)),
            Some(rel) if !rel.kind.is_to_many() => {
                params.push(format!("model.{}_id", p.name));
            }
            Some(_) => {}
        }
    }
    params
}

/// DDL for the entity's table, embedded in the data-access artifact so its
/// generated tests can build an in-memory database.
fn create_table_sql(entity: &EntityDefinition) -> String {
    let mut columns = vec!["id INTEGER PRIMARY KEY".to_string()];
    if entity.multi_tenant {
        columns.push("tenant_id INTEGER NOT NULL".to_string());
    }
    for p in &entity.properties {
        match (p.scalar_type(), p.relation()) {
            (Some(scalar), _) => {
                let mut column = format!("{} {}", p.name, scalar.sql_type());
                if !p.nullable {
                    column.push_str(" NOT NULL");
                }
                if p.unique {
                    column.push_str(" UNIQUE");
                }
                columns.push(column);
            }
            (None, Some(rel)) if !rel.kind.is_to_many() => {
                let mut column = format!("{}_id INTEGER", p.name);
                if !p.nullable {
                    column.push_str(" NOT NULL");
                }
                columns.push(column);
            }
            _ => {}
        }
    }
    format!(
        "CREATE TABLE {} ({})",
        entity.table_name(),
        columns.join(", ")
    )
}

/// Properties flagged for a UI surface, scalars first, then relations,
/// each group in definition order.
fn visible_props(scalars: &[Value], relations: &[Value], flag: &str) -> Vec<Value> {
    scalars
        .iter()
        .chain(relations.iter())
        .filter(|view| view[flag] == Value::Bool(true))
        .cloned()
        .collect()
}

fn filter_flag(views: &[Value], flag: &str) -> Vec<Value> {
    views
        .iter()
        .filter(|view| view[flag] == Value::Bool(true))
        .cloned()
        .collect()
}

fn scalar_view(p: &PropertyDefinition) -> Value {
    // Partitioned by the caller; scalar_type is always present here.
    let scalar = p.scalar_type().unwrap_or(ScalarType::String);
    let base_type = scalar.rust_type();
    let rust_type = if p.nullable {
        format!("Option<{base_type}>")
    } else {
        base_type.to_string()
    };

    json!({
        "name": p.name,
        "label": p.label,
        "help_text": p.help_text,
        "type": scalar.to_string(),
        "base_rust_type": base_type,
        "rust_type": rust_type,
        "sql_type": scalar.sql_type(),
        "widget": p.widget().to_string(),
        "nullable": p.nullable,
        "unique": p.unique,
        "length": p.length,
        "default_value": p.default_value,
        "required": p.validation_rules.iter().any(|r| r == "not_blank"),
        "rules": p.validation_rules,
        "show_in_list": p.ui.show_in_list,
        "show_in_detail": p.ui.show_in_detail,
        "show_in_form": p.ui.show_in_form,
        "sortable": p.ui.sortable,
        "searchable": p.ui.searchable,
        "api_readable": p.api.readable,
        "api_writable": p.api.writable,
        "translatable": p.i18n.translatable,
        "sample": sample_literal(p, scalar),
    })
}

fn relation_view(p: &PropertyDefinition, schema: &SchemaSet) -> Option<Value> {
    let rel = p.relation()?;
    let target_snake = schema
        .get(&rel.target)
        .map(EntityDefinition::snake_name)
        .unwrap_or_else(|| rel.target.to_lowercase());

    Some(json!({
        "name": p.name,
        "label": p.label,
        "kind": rel.kind.to_string(),
        "target": rel.target,
        "target_snake": target_snake,
        "target_id_type": format!("{}Id", rel.target),
        "to_many": rel.kind.is_to_many(),
        "owning": rel.kind.is_owning(),
        "nullable": p.nullable,
        "fk_column": format!("{}_id", p.name),
        "fetch": rel.fetch.to_string(),
        "cascade": rel.cascade.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "orphan_removal": rel.orphan_removal,
        "order_by": order_by_view(&rel.order_by),
        "show_in_list": p.ui.show_in_list,
        "show_in_detail": p.ui.show_in_detail,
        "show_in_form": p.ui.show_in_form,
        "sortable": p.ui.sortable,
    }))
}

/// Sibling model imports needed by the model artifact, deduplicated and
/// excluding self-references.
fn model_imports(entity: &EntityDefinition, schema: &SchemaSet) -> Vec<Value> {
    let mut imports: Vec<(String, String)> = Vec::new();
    for p in entity.relation_properties() {
        let Some(rel) = p.relation() else { continue };
        if rel.target == entity.name {
            continue;
        }
        let module = schema
            .get(&rel.target)
            .map(EntityDefinition::snake_name)
            .unwrap_or_else(|| rel.target.to_lowercase());
        let pair = (module, format!("{}Id", rel.target));
        if !imports.contains(&pair) {
            imports.push(pair);
        }
    }
    imports
        .into_iter()
        .map(|(module, symbol)| json!({ "module": module, "symbol": symbol }))
        .collect()
}

/// Column list of the data-access artifact: id, scalar columns, then
/// to-one foreign keys, in definition order.
fn column_names(entity: &EntityDefinition) -> Vec<String> {
    let mut columns = vec!["id".to_string()];
    if entity.multi_tenant {
        columns.push("tenant_id".to_string());
    }
    for p in &entity.properties {
        match p.relation() {
            None => columns.push(p.name.clone()),
            Some(rel) if !rel.kind.is_to_many() => columns.push(format!("{}_id", p.name)),
            Some(_) => {}
        }
    }
    columns
}

fn order_by_view(clauses: &[OrderClause]) -> Vec<Value> {
    clauses
        .iter()
        .map(|clause| {
            json!({
                "field": clause.field,
                "direction": clause.direction.to_string(),
            })
        })
        .collect()
}

fn order_by_sql(clauses: &[OrderClause]) -> String {
    if clauses.is_empty() {
        return "id ASC".to_string();
    }
    clauses
        .iter()
        .map(|clause| {
            format!(
                "{} {}",
                clause.field,
                clause.direction.to_string().to_uppercase()
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Deterministic Rust literal used by generated fixture/test code.
fn sample_literal(p: &PropertyDefinition, scalar: ScalarType) -> String {
    let base = match p.fixture.kind.as_deref() {
        Some("email") => r#""user@example.com".to_string()"#.to_string(),
        Some("name") => r#""Ada Lovelace".to_string()"#.to_string(),
        Some("url") => r#""https://example.com".to_string()"#.to_string(),
        Some("phone") => r#""+1-555-0100".to_string()"#.to_string(),
        Some("paragraph") => r#""Lorem ipsum dolor sit amet.".to_string()"#.to_string(),
        _ => match scalar {
            ScalarType::String | ScalarType::Text => r#""example".to_string()"#.to_string(),
            ScalarType::Integer => "42".to_string(),
            ScalarType::BigInt => "42i64".to_string(),
            ScalarType::Float => "4.2".to_string(),
            ScalarType::Decimal => "rust_decimal::Decimal::new(4200, 2)".to_string(),
            ScalarType::Boolean => "true".to_string(),
            ScalarType::Date => {
                "chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()".to_string()
            }
            ScalarType::Time => "chrono::NaiveTime::from_hms_opt(12, 30, 0).unwrap()".to_string(),
            ScalarType::DateTime => "chrono::Utc::now()".to_string(),
            ScalarType::Uuid => "uuid::Uuid::nil()".to_string(),
            ScalarType::Json => "serde_json::json!({})".to_string(),
        },
    };
    if p.nullable {
        format!("Some({base})")
    } else {
        base
    }
}


#[cfg(test)]
mod tests {
    use super::tests_support::two_entity_schema;
    use super::*;

    #[test]
    fn view_partitions_properties() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let view = entity_view(contact, &schema);

        assert_eq!(view["scalars"].as_array().unwrap().len(), 2);
        assert_eq!(view["relations"].as_array().unwrap().len(), 1);
        assert_eq!(view["has_relations"], true);
        assert_eq!(view["ops"]["list"], true);
        assert_eq!(view["ops"]["delete"], false);
        assert_eq!(view["relations"][0]["target_snake"], "organization");
        assert_eq!(view["columns"][0], "id");
        assert_eq!(view["columns"][1], "email");
        assert_eq!(view["columns"][3], "organization_id");
        assert_eq!(view["list_props"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn model_imports_are_deduplicated() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let view = entity_view(contact, &schema);
        let imports = view["model_imports"].as_array().unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0]["module"], "organization");
        assert_eq!(imports[0]["symbol"], "OrganizationId");
    }

    #[test]
    fn create_table_sql_covers_all_columns() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let view = entity_view(contact, &schema);
        let sql = view["create_table_sql"].as_str().unwrap();
        assert!(sql.starts_with("CREATE TABLE contact ("));
        assert!(sql.contains("id INTEGER PRIMARY KEY"));
        assert!(sql.contains("email TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("notes TEXT"));
        assert!(sql.contains("organization_id INTEGER"));
    }

    #[test]
    fn order_by_sql_defaults_to_id() {
        assert_eq!(order_by_sql(&[]), "id ASC");
        assert_eq!(
            order_by_sql(&[OrderClause::ascending("name")]),
            "name ASC"
        );
    }
}
