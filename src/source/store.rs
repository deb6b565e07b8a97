//! SQLite definition store.
//!
//! The persisted counterpart of the tabular source. Write-time constraints
//! of the store are trusted to uphold the schema invariants, so loads
//! perform no semantic re-validation. Cells with structured content (lists,
//! JSON, ordering, composite indexes) are stored in the same encoded text
//! form the tabular source uses, and decode through the same helpers.

use crate::error::Result;
use crate::schema::SchemaSet;
use crate::source::SchemaSource;
use crate::source::rows::{
    EntityRecord, PropertyRecord, SchemaRows, decode_composite_index, decode_json,
    decode_json_names, decode_list, decode_order_by, encode_composite_index, encode_json_names,
    encode_list, encode_order_by,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// DDL for the two definition tables.
pub const STORE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entity_definition (
    name                  TEXT PRIMARY KEY,
    label                 TEXT NOT NULL,
    plural_label          TEXT NOT NULL,
    description           TEXT NOT NULL DEFAULT '',
    icon                  TEXT NOT NULL DEFAULT '',
    multi_tenant          INTEGER NOT NULL DEFAULT 0,
    api_enabled           INTEGER NOT NULL DEFAULT 0,
    api_operations        TEXT NOT NULL DEFAULT '',
    api_security          TEXT NOT NULL DEFAULT '',
    api_page_size         TEXT NOT NULL DEFAULT '',
    api_order_by          TEXT NOT NULL DEFAULT '',
    api_searchable_fields TEXT NOT NULL DEFAULT '',
    api_filterable_fields TEXT NOT NULL DEFAULT '',
    policy_enabled        INTEGER NOT NULL DEFAULT 0,
    policy_roles          TEXT NOT NULL DEFAULT '',
    menu_group            TEXT NOT NULL DEFAULT '',
    menu_order            TEXT NOT NULL DEFAULT '',
    generate_tests        INTEGER NOT NULL DEFAULT 0,
    generated             INTEGER NOT NULL DEFAULT 0,
    last_generated_at     TEXT,
    last_log              TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS property_definition (
    entity           TEXT NOT NULL REFERENCES entity_definition(name) ON DELETE CASCADE,
    position         INTEGER NOT NULL,
    name             TEXT NOT NULL,
    label            TEXT NOT NULL DEFAULT '',
    help_text        TEXT NOT NULL DEFAULT '',
    type             TEXT NOT NULL DEFAULT '',
    nullable         INTEGER NOT NULL DEFAULT 0,
    length           TEXT NOT NULL DEFAULT '',
    precision        TEXT NOT NULL DEFAULT '',
    scale            TEXT NOT NULL DEFAULT '',
    is_unique        INTEGER NOT NULL DEFAULT 0,
    default_value    TEXT NOT NULL DEFAULT '',
    relation_kind    TEXT NOT NULL DEFAULT '',
    relation_target  TEXT NOT NULL DEFAULT '',
    owning_side      TEXT NOT NULL DEFAULT '',
    inverse_side     TEXT NOT NULL DEFAULT '',
    cascade_set      TEXT NOT NULL DEFAULT '',
    orphan_removal   INTEGER NOT NULL DEFAULT 0,
    fetch            TEXT NOT NULL DEFAULT '',
    order_by         TEXT NOT NULL DEFAULT '',
    composite_index  TEXT NOT NULL DEFAULT '',
    validation_rules TEXT NOT NULL DEFAULT '',
    form_type        TEXT NOT NULL DEFAULT '',
    form_options     TEXT NOT NULL DEFAULT '',
    form_group       TEXT NOT NULL DEFAULT '',
    show_in_list     INTEGER NOT NULL DEFAULT 0,
    show_in_detail   INTEGER NOT NULL DEFAULT 0,
    show_in_form     INTEGER NOT NULL DEFAULT 0,
    show_in_filter   INTEGER NOT NULL DEFAULT 0,
    sortable         INTEGER NOT NULL DEFAULT 0,
    searchable       INTEGER NOT NULL DEFAULT 0,
    api_readable     INTEGER NOT NULL DEFAULT 0,
    api_writable     INTEGER NOT NULL DEFAULT 0,
    api_filterable   INTEGER NOT NULL DEFAULT 0,
    api_example      TEXT NOT NULL DEFAULT '',
    translatable     INTEGER NOT NULL DEFAULT 0,
    locale_fallback  INTEGER NOT NULL DEFAULT 0,
    fixture_kind     TEXT NOT NULL DEFAULT '',
    fixture_options  TEXT NOT NULL DEFAULT '',
    list_order       TEXT NOT NULL DEFAULT '',
    detail_order     TEXT NOT NULL DEFAULT '',
    form_order       TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (entity, name)
);
";

/// SQLite-backed definition source.
#[derive(Debug, Clone)]
pub struct StoreSource {
    path: PathBuf,
}

impl StoreSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    /// Create the definition tables if they do not exist yet.
    pub fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(STORE_SCHEMA)?;
        Ok(())
    }

    /// Replace the stored definition set with `schema`, atomically.
    pub fn save(&self, schema: &SchemaSet) -> Result<()> {
        let mut conn = self.connect()?;
        conn.execute_batch(STORE_SCHEMA)?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM property_definition", [])?;
        tx.execute("DELETE FROM entity_definition", [])?;

        let rows = schema.to_rows();
        for rec in &rows.entities {
            insert_entity(&tx, rec)?;
        }
        for group in rows.properties.values() {
            for (position, rec) in group.iter().enumerate() {
                insert_property(&tx, position, rec)?;
            }
        }
        tx.commit()?;

        tracing::info!(
            store = %self.path.display(),
            entities = schema.len(),
            "definition set saved"
        );
        Ok(())
    }
}

impl SchemaSource for StoreSource {
    fn load(&self) -> Result<SchemaRows> {
        let conn = self.connect()?;
        let mut out = SchemaRows::default();

        let mut stmt = conn.prepare(
            "SELECT name, label, plural_label, description, icon, multi_tenant,
                    api_enabled, api_operations, api_security, api_page_size,
                    api_order_by, api_searchable_fields, api_filterable_fields,
                    policy_enabled, policy_roles, menu_group, menu_order,
                    generate_tests, generated, last_generated_at, last_log
             FROM entity_definition ORDER BY rowid",
        )?;
        let entities = stmt.query_map([], read_entity_row)?;
        for rec in entities {
            out.entities.push(rec?);
        }

        let mut stmt = conn.prepare(
            "SELECT entity, name, label, help_text, type, nullable, length,
                    precision, scale, is_unique, default_value, relation_kind,
                    relation_target, owning_side, inverse_side, cascade_set,
                    orphan_removal, fetch, order_by, composite_index,
                    validation_rules, form_type, form_options, form_group,
                    show_in_list, show_in_detail, show_in_form, show_in_filter,
                    sortable, searchable, api_readable, api_writable,
                    api_filterable, api_example, translatable, locale_fallback,
                    fixture_kind, fixture_options, list_order, detail_order,
                    form_order
             FROM property_definition WHERE entity = ?1 ORDER BY position",
        )?;
        let names: Vec<String> = out.entities.iter().map(|e| e.name.clone()).collect();
        for name in names {
            let props = stmt.query_map(params![name], read_property_row)?;
            let group = out.properties.entry(name).or_default();
            for rec in props {
                group.push(rec?);
            }
        }

        tracing::debug!(
            store = %self.path.display(),
            entities = out.entities.len(),
            "store source loaded"
        );
        Ok(out)
    }

    /// The store's own constraints are trusted; loads skip validation.
    fn requires_validation(&self) -> bool {
        false
    }

    fn record_generation(&self, entity: &str, log: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE entity_definition
             SET generated = 1, last_generated_at = ?1, last_log = ?2
             WHERE name = ?3",
            params![Utc::now().to_rfc3339(), log, entity],
        )?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("definition store ({})", self.path.display())
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn read_entity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityRecord> {
    Ok(EntityRecord {
        name: row.get(0)?,
        label: row.get(1)?,
        plural_label: row.get(2)?,
        description: row.get(3)?,
        icon: row.get(4)?,
        multi_tenant: row.get::<_, i64>(5)? != 0,
        api_enabled: row.get::<_, i64>(6)? != 0,
        api_operations: decode_list(&row.get::<_, String>(7)?),
        api_security: row.get(8)?,
        api_page_size: row.get(9)?,
        api_order_by: decode_order_by(&row.get::<_, String>(10)?),
        api_searchable_fields: decode_list(&row.get::<_, String>(11)?),
        api_filterable_fields: decode_list(&row.get::<_, String>(12)?),
        policy_enabled: row.get::<_, i64>(13)? != 0,
        policy_roles: decode_list(&row.get::<_, String>(14)?),
        menu_group: row.get(15)?,
        menu_order: row.get(16)?,
        generate_tests: row.get::<_, i64>(17)? != 0,
        generated: row.get::<_, i64>(18)? != 0,
        last_generated_at: row
            .get::<_, Option<String>>(19)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|ts| ts.with_timezone(&Utc)),
        last_log: row.get(20)?,
    })
}

fn read_property_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PropertyRecord> {
    Ok(PropertyRecord {
        entity: row.get(0)?,
        name: row.get(1)?,
        label: row.get(2)?,
        help_text: row.get(3)?,
        type_name: row.get(4)?,
        nullable: row.get::<_, i64>(5)? != 0,
        length: row.get(6)?,
        precision: row.get(7)?,
        scale: row.get(8)?,
        unique: row.get::<_, i64>(9)? != 0,
        default_value: row.get(10)?,
        relation_kind: row.get(11)?,
        relation_target: row.get(12)?,
        owning_side: row.get(13)?,
        inverse_side: row.get(14)?,
        cascade: decode_list(&row.get::<_, String>(15)?),
        orphan_removal: row.get::<_, i64>(16)? != 0,
        fetch: row.get(17)?,
        order_by: decode_order_by(&row.get::<_, String>(18)?),
        composite_index: decode_composite_index(&row.get::<_, String>(19)?),
        validation_rules: decode_json_names(&row.get::<_, String>(20)?),
        form_type: row.get(21)?,
        form_options: decode_json(&row.get::<_, String>(22)?),
        form_group: row.get(23)?,
        show_in_list: row.get::<_, i64>(24)? != 0,
        show_in_detail: row.get::<_, i64>(25)? != 0,
        show_in_form: row.get::<_, i64>(26)? != 0,
        show_in_filter: row.get::<_, i64>(27)? != 0,
        sortable: row.get::<_, i64>(28)? != 0,
        searchable: row.get::<_, i64>(29)? != 0,
        api_readable: row.get::<_, i64>(30)? != 0,
        api_writable: row.get::<_, i64>(31)? != 0,
        api_filterable: row.get::<_, i64>(32)? != 0,
        api_example: row.get(33)?,
        translatable: row.get::<_, i64>(34)? != 0,
        locale_fallback: row.get::<_, i64>(35)? != 0,
        fixture_kind: row.get(36)?,
        fixture_options: decode_json(&row.get::<_, String>(37)?),
        list_order: row.get(38)?,
        detail_order: row.get(39)?,
        form_order: row.get(40)?,
    })
}

fn encode_json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn insert_entity(conn: &Connection, rec: &EntityRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO entity_definition (
            name, label, plural_label, description, icon, multi_tenant,
            api_enabled, api_operations, api_security, api_page_size,
            api_order_by, api_searchable_fields, api_filterable_fields,
            policy_enabled, policy_roles, menu_group, menu_order,
            generate_tests, generated, last_generated_at, last_log
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                  ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            rec.name,
            rec.label,
            rec.plural_label,
            rec.description,
            rec.icon,
            rec.multi_tenant as i64,
            rec.api_enabled as i64,
            encode_list(&rec.api_operations),
            rec.api_security,
            rec.api_page_size,
            encode_order_by(&rec.api_order_by),
            encode_list(&rec.api_searchable_fields),
            encode_list(&rec.api_filterable_fields),
            rec.policy_enabled as i64,
            encode_list(&rec.policy_roles),
            rec.menu_group,
            rec.menu_order,
            rec.generate_tests as i64,
            rec.generated as i64,
            rec.last_generated_at.map(|ts| ts.to_rfc3339()),
            rec.last_log,
        ],
    )?;
    Ok(())
}

fn insert_property(conn: &Connection, position: usize, rec: &PropertyRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO property_definition (
            entity, position, name, label, help_text, type, nullable, length,
            precision, scale, is_unique, default_value, relation_kind,
            relation_target, owning_side, inverse_side, cascade_set,
            orphan_removal, fetch, order_by, composite_index,
            validation_rules, form_type, form_options, form_group,
            show_in_list, show_in_detail, show_in_form, show_in_filter,
            sortable, searchable, api_readable, api_writable, api_filterable,
            api_example, translatable, locale_fallback, fixture_kind,
            fixture_options, list_order, detail_order, form_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                  ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25,
                  ?26, ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34, ?35, ?36, ?37,
                  ?38, ?39, ?40, ?41, ?42)",
        params![
            rec.entity,
            position as i64,
            rec.name,
            rec.label,
            rec.help_text,
            rec.type_name,
            rec.nullable as i64,
            rec.length,
            rec.precision,
            rec.scale,
            rec.unique as i64,
            rec.default_value,
            rec.relation_kind,
            rec.relation_target,
            rec.owning_side,
            rec.inverse_side,
            encode_list(&rec.cascade),
            rec.orphan_removal as i64,
            rec.fetch,
            encode_order_by(&rec.order_by),
            encode_composite_index(&rec.composite_index),
            encode_json_names(&rec.validation_rules),
            rec.form_type,
            encode_json_cell(&rec.form_options),
            rec.form_group,
            rec.show_in_list as i64,
            rec.show_in_detail as i64,
            rec.show_in_form as i64,
            rec.show_in_filter as i64,
            rec.sortable as i64,
            rec.searchable as i64,
            rec.api_readable as i64,
            rec.api_writable as i64,
            rec.api_filterable as i64,
            rec.api_example,
            rec.translatable as i64,
            rec.locale_fallback as i64,
            rec.fixture_kind,
            encode_json_cell(&rec.fixture_options),
            rec.list_order,
            rec.detail_order,
            rec.form_order,
        ],
    )?;
    Ok(())
}
