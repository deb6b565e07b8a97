//! Repository stage: the data-access artifact.

use crate::emit::{Artifact, EmitContext, EmitterStage, StageKind};
use crate::error::Result;
use crate::schema::EntityDefinition;
use std::path::PathBuf;

pub(crate) const TEMPLATE_NAME: &str = "repository.rs.tera";

pub(crate) const TEMPLATE: &str = r##"//! Generated by entigen — data access for {{ entity.label }}.
//! Do not edit by hand; regenerate instead.

use rusqlite::{Connection, Result, Row, params};

use crate::models::{{ entity.snake_name }}::{{ entity.name }};

pub const TABLE: &str = "{{ entity.table }}";
pub const COLUMNS: &[&str] = &[{% for c in columns %}"{{ c }}"{% if not loop.last %}, {% endif %}{% endfor %}];
pub const DEFAULT_ORDER: &str = "{{ entity.api.order_by_sql }}";

/// DDL used by migrations and by the generated repository tests.
pub const SCHEMA: &str = "{{ create_table_sql }}";

pub struct {{ entity.name }}Repository<'c> {
    conn: &'c Connection,
}

impl<'c> {{ entity.name }}Repository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn find(&self, id: i64) -> Result<Option<{{ entity.name }}>> {
        let sql = format!("SELECT {} FROM {TABLE} WHERE id = ?1", COLUMNS.join(", "));
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], Self::from_row)?;
        rows.next().transpose()
    }

    pub fn list(&self, limit: usize) -> Result<Vec<{{ entity.name }}>> {
        let sql = format!(
            "SELECT {} FROM {TABLE} ORDER BY {DEFAULT_ORDER} LIMIT ?1",
            COLUMNS.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], Self::from_row)?;
        rows.collect()
    }

    pub fn insert(&self, model: &{{ entity.name }}) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO {{ entity.table }} ({% for c in columns_no_id %}{{ c }}{% if not loop.last %}, {% endif %}{% endfor %}) \
             VALUES ({% for c in columns_no_id %}?{{ loop.index }}{% if not loop.last %}, {% endif %}{% endfor %})",
            params![{% for v in insert_params %}{{ v }}{% if not loop.last %}, {% endif %}{% endfor %}],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, model: &{{ entity.name }}) -> Result<usize> {
        self.conn.execute(
            "UPDATE {{ entity.table }} SET {% for c in columns_no_id %}{{ c }} = ?{{ loop.index }}{% if not loop.last %}, {% endif %}{% endfor %} \
             WHERE id = ?{{ update_id_placeholder }}",
            params![{% for v in insert_params %}{{ v }}, {% endfor %}model.id],
        )
    }

    pub fn delete(&self, id: i64) -> Result<usize> {
        self.conn.execute("DELETE FROM {{ entity.table }} WHERE id = ?1", params![id])
    }

    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM {{ entity.table }}", [], |row| row.get(0))
    }

    fn from_row(row: &Row<'_>) -> Result<{{ entity.name }}> {
        Ok({{ entity.name }} {
            id: row.get("id")?,
{% if entity.multi_tenant %}            tenant_id: row.get("tenant_id")?,
{% endif %}{% for p in scalars %}            {{ p.name }}: row.get("{{ p.name }}")?,
{% endfor %}{% for r in relations %}{% if r.to_many %}            {{ r.name }}: Vec::new(),
{% else %}            {{ r.fk_column }}: row.get("{{ r.fk_column }}")?,
{% endif %}{% endfor %}        })
    }
}
"##;

/// Emits `src/repositories/<entity>_repository.rs`.
pub struct RepositoryStage;

impl EmitterStage for RepositoryStage {
    fn kind(&self) -> StageKind {
        StageKind::Repository
    }

    fn plan(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf> {
        vec![cx.path(format!(
            "src/repositories/{}_repository.rs",
            entity.snake_name()
        ))]
    }

    fn emit(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let path = cx.path(format!(
            "src/repositories/{}_repository.rs",
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
    fn repository_covers_crud_and_schema() {
        let schema = two_entity_schema();
        let contact = schema.get("Contact").unwrap();
        let cx = EmitContext::new(&schema, std::path::Path::new("/tmp/out"));

        let artifacts = RepositoryStage.emit(contact, &cx).unwrap();
        let code = &artifacts[0].contents;
        assert!(code.contains(r#"pub const TABLE: &str = "contact";"#));
        assert!(code.contains(r#"pub const COLUMNS: &[&str] = &["id", "email", "notes", "organization_id"];"#));
        assert!(code.contains("pub struct ContactRepository<'c> {"));
        assert!(code.contains("pub fn insert(&self"));
        assert!(code.contains("CREATE TABLE contact"));
        // Insert covers every column except the autoincrement id.
        assert!(code.contains("INSERT INTO contact (email, notes, organization_id)"));
        assert!(code.contains("VALUES (?1, ?2, ?3)"));
    }
}
