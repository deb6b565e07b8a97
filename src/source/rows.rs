//! Normalized definition records.
//!
//! Adapters parse raw input into these records; the validator and the IR
//! builder both consume them. Normalization is uniform across adapters:
//! booleans, comma-separated lists, JSON-bearing cells, ordering clauses and
//! composite-index groups all decode here. Vocabulary tokens (scalar types,
//! relation kinds, fetch strategies) and numeric cells stay raw — the
//! validator owns those judgements.

use crate::schema::types::{OrderClause, SortDirection};
use indexmap::IndexMap;
use serde_json::Value;

/// One row of the entity table, normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRecord {
    pub name: String,
    pub label: String,
    pub plural_label: String,
    pub description: String,
    pub icon: String,
    pub multi_tenant: bool,
    pub api_enabled: bool,
    pub api_operations: Vec<String>,
    pub api_security: String,
    pub api_page_size: String,
    pub api_order_by: Vec<OrderClause>,
    pub api_searchable_fields: Vec<String>,
    pub api_filterable_fields: Vec<String>,
    pub policy_enabled: bool,
    pub policy_roles: Vec<String>,
    pub menu_group: String,
    pub menu_order: String,
    pub generate_tests: bool,
    /// Generation status; only write-capable sources populate these.
    pub generated: bool,
    pub last_generated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_log: String,
}

/// One row of the property table, normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyRecord {
    pub entity: String,
    pub name: String,
    pub label: String,
    pub help_text: String,
    pub type_name: String,
    pub nullable: bool,
    pub length: String,
    pub precision: String,
    pub scale: String,
    pub unique: bool,
    pub default_value: String,
    pub relation_kind: String,
    pub relation_target: String,
    pub owning_side: String,
    pub inverse_side: String,
    pub cascade: Vec<String>,
    pub orphan_removal: bool,
    pub fetch: String,
    pub order_by: Vec<OrderClause>,
    pub composite_index: Vec<Vec<String>>,
    pub validation_rules: Vec<String>,
    pub form_type: String,
    pub form_options: Value,
    pub form_group: String,
    pub show_in_list: bool,
    pub show_in_detail: bool,
    pub show_in_form: bool,
    pub show_in_filter: bool,
    pub sortable: bool,
    pub searchable: bool,
    pub api_readable: bool,
    pub api_writable: bool,
    pub api_filterable: bool,
    pub api_example: String,
    pub translatable: bool,
    pub locale_fallback: bool,
    pub fixture_kind: String,
    pub fixture_options: Value,
    pub list_order: String,
    pub detail_order: String,
    pub form_order: String,
}

impl PropertyRecord {
    /// True when the row declares a relation rather than a scalar.
    pub fn is_relation(&self) -> bool {
        !self.relation_kind.trim().is_empty()
    }

    /// `Entity.property` tag used in validator messages and logs.
    pub fn subject(&self) -> String {
        format!("{}.{}", self.entity, self.name)
    }
}

/// The full normalized definition set produced by one adapter load.
///
/// Property records are grouped into an insertion-ordered multimap keyed by
/// entity name; both entity order and per-entity property order are
/// significant and preserved.
#[derive(Debug, Clone, Default)]
pub struct SchemaRows {
    pub entities: Vec<EntityRecord>,
    pub properties: IndexMap<String, Vec<PropertyRecord>>,
}

impl SchemaRows {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn properties_for(&self, entity: &str) -> &[PropertyRecord] {
        self.properties.get(entity).map_or(&[], Vec::as_slice)
    }
}

// ============================================================================
// Cell decoding
// ============================================================================

/// Decode a boolean cell.
///
/// `""` and `"0"` are false, `"1"` is true; the legacy word forms `true`,
/// `yes` and `y` are accepted for backward compatibility. Anything else is
/// false.
pub fn decode_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

/// Encode a boolean cell in its canonical form.
pub fn encode_bool(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Decode a comma-separated cell into an ordered list of trimmed tokens.
pub fn decode_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Encode an ordered token list back into its comma-separated cell form.
pub fn encode_list<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a JSON-bearing cell into a nested structure.
///
/// An empty cell is `Null`. A bare scalar — whether valid JSON (`42`,
/// `true`, `"x"`) or a plain unquoted word — wraps into a one-element list
/// rather than erroring.
pub fn decode_json(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ (Value::Array(_) | Value::Object(_))) => value,
        Ok(scalar) => Value::Array(vec![scalar]),
        Err(_) => Value::Array(vec![Value::String(trimmed.to_string())]),
    }
}

/// Decode a JSON-bearing cell holding a name list (e.g. validation rules).
///
/// Accepts a JSON array of strings, a bare scalar (wrapped into a
/// one-element list), or a JSON object whose keys are taken as the names.
pub fn decode_json_names(raw: &str) -> Vec<String> {
    match decode_json(raw) {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::Object(map) => map.keys().cloned().collect(),
        other => vec![other.to_string()],
    }
}

/// Encode a name list into its canonical cell form: a single name stays a
/// bare scalar (which decodes back through the wrap rule), several names
/// become a JSON array.
pub fn encode_json_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [single] => single.clone(),
        many => Value::Array(many.iter().cloned().map(Value::String).collect()).to_string(),
    }
}

/// Decode an order-by cell.
///
/// Accepts either a JSON object (`{"name": "asc", "created_at": "desc"}`,
/// clause order preserved) or a bare field name, interpreted as ascending.
pub fn decode_order_by(raw: &str) -> Vec<OrderClause> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return map
            .iter()
            .map(|(field, dir)| OrderClause {
                field: field.clone(),
                direction: match dir.as_str() {
                    Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                    _ => SortDirection::Asc,
                },
            })
            .collect();
    }
    vec![OrderClause::ascending(trimmed)]
}

/// Encode ordering clauses back into their canonical cell form.
pub fn encode_order_by(clauses: &[OrderClause]) -> String {
    match clauses {
        [] => String::new(),
        [single] if single.direction == SortDirection::Asc => single.field.clone(),
        many => {
            let mut map = serde_json::Map::new();
            for clause in many {
                map.insert(
                    clause.field.clone(),
                    Value::String(clause.direction.to_string()),
                );
            }
            Value::Object(map).to_string()
        }
    }
}

/// Decode a composite-index cell: `,` separates indexes, `|` separates the
/// columns of one index.
pub fn decode_composite_index(raw: &str) -> Vec<Vec<String>> {
    raw.split(',')
        .map(|group| {
            group
                .split('|')
                .map(str::trim)
                .filter(|col| !col.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// Encode composite-index groups back into their cell form.
pub fn encode_composite_index(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .map(|group| group.join("|"))
        .collect::<Vec<_>>()
        .join(",")
}
