//! Tabular definition source: two header-first CSV tables.
//!
//! The header of each table must match its fixed column set exactly — a
//! structurally broken file is always fatal. Row-level shape problems are
//! handled leniently: wholly blank rows are skipped silently, short rows
//! are right-padded with empty cells, and over-long rows are rejected with
//! a logged warning so misaligned cells never corrupt a definition.

use crate::error::{GeneratorError, Result};
use crate::schema::SchemaSet;
use crate::source::rows::{
    EntityRecord, PropertyRecord, SchemaRows, decode_bool, decode_composite_index,
    decode_json, decode_json_names, decode_list, decode_order_by, encode_bool,
    encode_composite_index, encode_json_names, encode_list, encode_order_by,
};
use crate::source::SchemaSource;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Fixed column set of the entity table.
pub const ENTITY_COLUMNS: [&str; 18] = [
    "name",
    "label",
    "plural_label",
    "description",
    "icon",
    "multi_tenant",
    "api_enabled",
    "api_operations",
    "api_security",
    "api_page_size",
    "api_order_by",
    "api_searchable_fields",
    "api_filterable_fields",
    "policy_enabled",
    "policy_roles",
    "menu_group",
    "menu_order",
    "generate_tests",
];

/// Fixed column set of the property table.
pub const PROPERTY_COLUMNS: [&str; 41] = [
    "entity",
    "name",
    "label",
    "help_text",
    "type",
    "nullable",
    "length",
    "precision",
    "scale",
    "unique",
    "default_value",
    "relation_kind",
    "relation_target",
    "owning_side",
    "inverse_side",
    "cascade",
    "orphan_removal",
    "fetch",
    "order_by",
    "composite_index",
    "validation_rules",
    "form_type",
    "form_options",
    "form_group",
    "show_in_list",
    "show_in_detail",
    "show_in_form",
    "show_in_filter",
    "sortable",
    "searchable",
    "api_readable",
    "api_writable",
    "api_filterable",
    "api_example",
    "translatable",
    "locale_fallback",
    "fixture_kind",
    "fixture_options",
    "list_order",
    "detail_order",
    "form_order",
];

/// CSV-backed definition source.
#[derive(Debug, Clone)]
pub struct TabularSource {
    entities_path: PathBuf,
    properties_path: PathBuf,
}

impl TabularSource {
    pub fn new(entities_path: impl Into<PathBuf>, properties_path: impl Into<PathBuf>) -> Self {
        Self {
            entities_path: entities_path.into(),
            properties_path: properties_path.into(),
        }
    }
}

impl SchemaSource for TabularSource {
    fn load(&self) -> Result<SchemaRows> {
        let entity_cells = read_table(&self.entities_path, "entity", &ENTITY_COLUMNS)?;
        let property_cells = read_table(&self.properties_path, "property", &PROPERTY_COLUMNS)?;

        let mut out = SchemaRows::default();
        for cells in &entity_cells {
            out.entities.push(decode_entity_row(cells));
        }
        for cells in &property_cells {
            let rec = decode_property_row(cells);
            out.properties.entry(rec.entity.clone()).or_default().push(rec);
        }

        tracing::debug!(
            entities = out.entities.len(),
            property_groups = out.properties.len(),
            "tabular source loaded"
        );
        Ok(out)
    }

    fn describe(&self) -> String {
        format!(
            "tabular source ({} + {})",
            self.entities_path.display(),
            self.properties_path.display()
        )
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Read one table: strict header, lenient rows.
fn read_table(path: &Path, table: &'static str, expected: &[&str]) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.records();
    let header = match records.next() {
        Some(header) => header?,
        None => {
            return Err(GeneratorError::HeaderMismatch {
                table,
                detail: "file is empty".to_string(),
            });
        }
    };
    check_header(table, &header, expected)?;

    let mut out = Vec::new();
    for (idx, record) in records.enumerate() {
        let record = record?;
        // Header is line 1, so data rows start at line 2.
        let line = idx + 2;

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if record.len() > expected.len() {
            tracing::warn!(
                table,
                line,
                columns = record.len(),
                expected = expected.len(),
                "row has too many columns; skipping"
            );
            continue;
        }

        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(expected.len(), String::new());
        out.push(cells);
    }
    Ok(out)
}

fn check_header(table: &'static str, header: &StringRecord, expected: &[&str]) -> Result<()> {
    for column in expected {
        if !header.iter().any(|cell| cell.trim() == *column) {
            return Err(GeneratorError::HeaderMismatch {
                table,
                detail: format!("missing required column `{column}`"),
            });
        }
    }
    if header.len() != expected.len() {
        return Err(GeneratorError::HeaderMismatch {
            table,
            detail: format!(
                "expected {} columns, found {}",
                expected.len(),
                header.len()
            ),
        });
    }
    for (position, (actual, wanted)) in header.iter().zip(expected).enumerate() {
        if actual.trim() != *wanted {
            return Err(GeneratorError::HeaderMismatch {
                table,
                detail: format!(
                    "column {position} is `{}`, expected `{wanted}`",
                    actual.trim()
                ),
            });
        }
    }
    Ok(())
}

/// Look up a cell by column name; resolves against the fixed layout.
fn cell<'a>(cells: &'a [String], columns: &[&str], name: &str) -> &'a str {
    columns
        .iter()
        .position(|column| *column == name)
        .and_then(|idx| cells.get(idx))
        .map_or("", String::as_str)
}

fn decode_entity_row(cells: &[String]) -> EntityRecord {
    let get = |name: &str| cell(cells, &ENTITY_COLUMNS, name);
    EntityRecord {
        name: get("name").trim().to_string(),
        label: get("label").trim().to_string(),
        plural_label: get("plural_label").trim().to_string(),
        description: get("description").trim().to_string(),
        icon: get("icon").trim().to_string(),
        multi_tenant: decode_bool(get("multi_tenant")),
        api_enabled: decode_bool(get("api_enabled")),
        api_operations: decode_list(get("api_operations")),
        api_security: get("api_security").trim().to_string(),
        api_page_size: get("api_page_size").trim().to_string(),
        api_order_by: decode_order_by(get("api_order_by")),
        api_searchable_fields: decode_list(get("api_searchable_fields")),
        api_filterable_fields: decode_list(get("api_filterable_fields")),
        policy_enabled: decode_bool(get("policy_enabled")),
        policy_roles: decode_list(get("policy_roles")),
        menu_group: get("menu_group").trim().to_string(),
        menu_order: get("menu_order").trim().to_string(),
        generate_tests: decode_bool(get("generate_tests")),
        generated: false,
        last_generated_at: None,
        last_log: String::new(),
    }
}

fn decode_property_row(cells: &[String]) -> PropertyRecord {
    let get = |name: &str| cell(cells, &PROPERTY_COLUMNS, name);
    PropertyRecord {
        entity: get("entity").trim().to_string(),
        name: get("name").trim().to_string(),
        label: get("label").trim().to_string(),
        help_text: get("help_text").trim().to_string(),
        type_name: get("type").trim().to_string(),
        nullable: decode_bool(get("nullable")),
        length: get("length").trim().to_string(),
        precision: get("precision").trim().to_string(),
        scale: get("scale").trim().to_string(),
        unique: decode_bool(get("unique")),
        default_value: get("default_value").trim().to_string(),
        relation_kind: get("relation_kind").trim().to_string(),
        relation_target: get("relation_target").trim().to_string(),
        owning_side: get("owning_side").trim().to_string(),
        inverse_side: get("inverse_side").trim().to_string(),
        cascade: decode_list(get("cascade")),
        orphan_removal: decode_bool(get("orphan_removal")),
        fetch: get("fetch").trim().to_string(),
        order_by: decode_order_by(get("order_by")),
        composite_index: decode_composite_index(get("composite_index")),
        validation_rules: decode_json_names(get("validation_rules")),
        form_type: get("form_type").trim().to_string(),
        form_options: decode_json(get("form_options")),
        form_group: get("form_group").trim().to_string(),
        show_in_list: decode_bool(get("show_in_list")),
        show_in_detail: decode_bool(get("show_in_detail")),
        show_in_form: decode_bool(get("show_in_form")),
        show_in_filter: decode_bool(get("show_in_filter")),
        sortable: decode_bool(get("sortable")),
        searchable: decode_bool(get("searchable")),
        api_readable: decode_bool(get("api_readable")),
        api_writable: decode_bool(get("api_writable")),
        api_filterable: decode_bool(get("api_filterable")),
        api_example: get("api_example").trim().to_string(),
        translatable: decode_bool(get("translatable")),
        locale_fallback: decode_bool(get("locale_fallback")),
        fixture_kind: get("fixture_kind").trim().to_string(),
        fixture_options: decode_json(get("fixture_options")),
        list_order: get("list_order").trim().to_string(),
        detail_order: get("detail_order").trim().to_string(),
        form_order: get("form_order").trim().to_string(),
    }
}

// ============================================================================
// Export
// ============================================================================

/// Encode a definition set back into the two CSV tables; the field-for-field
/// inverse of [`TabularSource::load`].
pub fn write_tabular(
    schema: &SchemaSet,
    entities_path: &Path,
    properties_path: &Path,
) -> Result<()> {
    let rows = schema.to_rows();

    let mut writer = WriterBuilder::new().from_path(entities_path)?;
    writer.write_record(ENTITY_COLUMNS)?;
    for rec in &rows.entities {
        writer.write_record(encode_entity_row(rec))?;
    }
    writer.flush()?;

    let mut writer = WriterBuilder::new().from_path(properties_path)?;
    writer.write_record(PROPERTY_COLUMNS)?;
    for rec in rows.properties.values().flatten() {
        writer.write_record(encode_property_row(rec))?;
    }
    writer.flush()?;

    Ok(())
}

fn encode_json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn encode_entity_row(rec: &EntityRecord) -> Vec<String> {
    vec![
        rec.name.clone(),
        rec.label.clone(),
        rec.plural_label.clone(),
        rec.description.clone(),
        rec.icon.clone(),
        encode_bool(rec.multi_tenant).to_string(),
        encode_bool(rec.api_enabled).to_string(),
        encode_list(&rec.api_operations),
        rec.api_security.clone(),
        rec.api_page_size.clone(),
        encode_order_by(&rec.api_order_by),
        encode_list(&rec.api_searchable_fields),
        encode_list(&rec.api_filterable_fields),
        encode_bool(rec.policy_enabled).to_string(),
        encode_list(&rec.policy_roles),
        rec.menu_group.clone(),
        rec.menu_order.clone(),
        encode_bool(rec.generate_tests).to_string(),
    ]
}

fn encode_property_row(rec: &PropertyRecord) -> Vec<String> {
    vec![
        rec.entity.clone(),
        rec.name.clone(),
        rec.label.clone(),
        rec.help_text.clone(),
        rec.type_name.clone(),
        encode_bool(rec.nullable).to_string(),
        rec.length.clone(),
        rec.precision.clone(),
        rec.scale.clone(),
        encode_bool(rec.unique).to_string(),
        rec.default_value.clone(),
        rec.relation_kind.clone(),
        rec.relation_target.clone(),
        rec.owning_side.clone(),
        rec.inverse_side.clone(),
        encode_list(&rec.cascade),
        encode_bool(rec.orphan_removal).to_string(),
        rec.fetch.clone(),
        encode_order_by(&rec.order_by),
        encode_composite_index(&rec.composite_index),
        encode_json_names(&rec.validation_rules),
        rec.form_type.clone(),
        encode_json_cell(&rec.form_options),
        rec.form_group.clone(),
        encode_bool(rec.show_in_list).to_string(),
        encode_bool(rec.show_in_detail).to_string(),
        encode_bool(rec.show_in_form).to_string(),
        encode_bool(rec.show_in_filter).to_string(),
        encode_bool(rec.sortable).to_string(),
        encode_bool(rec.searchable).to_string(),
        encode_bool(rec.api_readable).to_string(),
        encode_bool(rec.api_writable).to_string(),
        encode_bool(rec.api_filterable).to_string(),
        rec.api_example.clone(),
        encode_bool(rec.translatable).to_string(),
        encode_bool(rec.locale_fallback).to_string(),
        rec.fixture_kind.clone(),
        encode_json_cell(&rec.fixture_options),
        rec.list_order.clone(),
        rec.detail_order.clone(),
        rec.form_order.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn entity_header() -> String {
        ENTITY_COLUMNS.join(",")
    }

    fn property_header() -> String {
        PROPERTY_COLUMNS.join(",")
    }

    #[test]
    fn missing_header_column_is_fatal() {
        let broken = ENTITY_COLUMNS[..17].join(",");
        let entities = write_temp(&format!("{broken}\n"));
        let properties = write_temp(&format!("{}\n", property_header()));
        let source = TabularSource::new(entities.path(), properties.path());

        let err = source.load().unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::HeaderMismatch { table: "entity", .. }
        ));
        assert!(err.to_string().contains("generate_tests"));
    }

    #[test]
    fn reordered_header_is_fatal() {
        let mut columns = ENTITY_COLUMNS.to_vec();
        columns.swap(0, 1);
        let entities = write_temp(&format!("{}\n", columns.join(",")));
        let properties = write_temp(&format!("{}\n", property_header()));
        let source = TabularSource::new(entities.path(), properties.path());

        assert!(matches!(
            source.load(),
            Err(GeneratorError::HeaderMismatch { table: "entity", .. })
        ));
    }

    #[test]
    fn blank_rows_are_skipped_silently() {
        let entities = write_temp(&format!(
            "{}\nContact,Contact,Contacts,,address-book,0,1,\"list,get\",,25,,,,1,ROLE_USER,CRM,10,1\n,,,,,,,,,,,,,,,,,\n",
            entity_header()
        ));
        let properties = write_temp(&format!("{}\n", property_header()));
        let source = TabularSource::new(entities.path(), properties.path());

        let rows = source.load().unwrap();
        assert_eq!(rows.entities.len(), 1);
        assert_eq!(rows.entities[0].name, "Contact");
        assert_eq!(rows.entities[0].api_operations, vec!["list", "get"]);
    }

    #[test]
    fn short_property_row_is_right_padded() {
        let entities = write_temp(&format!(
            "{}\nContact,Contact,Contacts,,,0,0,,,,,,,0,,,,0\n",
            entity_header()
        ));
        // Only the first five cells are present; the rest must decode as
        // empty, not shift into neighbouring fields.
        let properties = write_temp(&format!(
            "{}\nContact,email,Email,,string\n",
            property_header()
        ));
        let source = TabularSource::new(entities.path(), properties.path());

        let rows = source.load().unwrap();
        let props = rows.properties_for("Contact");
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].type_name, "string");
        assert!(!props[0].nullable);
        assert!(props[0].length.is_empty());
    }

    #[test]
    fn overlong_property_row_is_rejected() {
        let entities = write_temp(&format!(
            "{}\nContact,Contact,Contacts,,,0,0,,,,,,,0,,,,0\n",
            entity_header()
        ));
        let mut long_row = vec!["Contact", "email", "Email", "", "string"];
        long_row.extend(std::iter::repeat("").take(PROPERTY_COLUMNS.len() - 5 + 2));
        let properties = write_temp(&format!(
            "{}\n{}\nContact,name,Name,,string,0,80\n",
            property_header(),
            long_row.join(",")
        ));
        let source = TabularSource::new(entities.path(), properties.path());

        let rows = source.load().unwrap();
        let props = rows.properties_for("Contact");
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "name");
    }

    #[test]
    fn property_rows_group_by_entity_in_order() {
        let entities = write_temp(&format!(
            "{}\nContact,Contact,Contacts,,,0,0,,,,,,,0,,,,0\nOrganization,Organization,Organizations,,,0,0,,,,,,,0,,,,0\n",
            entity_header()
        ));
        let properties = write_temp(&format!(
            "{}\nContact,first_name,First name,,string,0,80\nOrganization,legal_name,Legal name,,string,0,120\nContact,last_name,Last name,,string,0,80\n",
            property_header()
        ));
        let source = TabularSource::new(entities.path(), properties.path());

        let rows = source.load().unwrap();
        let contact = rows.properties_for("Contact");
        assert_eq!(contact.len(), 2);
        assert_eq!(contact[0].name, "first_name");
        assert_eq!(contact[1].name, "last_name");
        assert_eq!(rows.properties_for("Organization").len(), 1);
    }
}
