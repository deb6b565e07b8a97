//! Entity definitions: immutable per-entity value objects and the
//! [`SchemaSet`] holding one run's full definition universe.

use crate::error::Result;
use crate::schema::property::PropertyDefinition;
use crate::schema::types::{ApiOperation, OrderClause};
use crate::schema::{none_if_empty, parse_opt_u32, parse_vocab};
use crate::source::rows::{EntityRecord, PropertyRecord, SchemaRows};
use chrono::{DateTime, Utc};
use convert_case::{Case, Casing};
use serde::Serialize;

/// Page size applied when the definition leaves it unset.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// API exposure configuration of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub operations: Vec<ApiOperation>,
    pub security: Option<String>,
    pub page_size: u32,
    pub order_by: Vec<OrderClause>,
    pub searchable_fields: Vec<String>,
    pub filterable_fields: Vec<String>,
}

/// Access-policy configuration of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyConfig {
    pub enabled: bool,
    pub roles: Vec<String>,
}

/// Navigation placement of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MenuPlacement {
    pub group: Option<String>,
    pub order: u32,
}

/// Generation bookkeeping; populated by write-capable sources only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationStatus {
    pub generated: bool,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub last_log: String,
}

/// Immutable entity definition.
///
/// Identity is the unique PascalCase `name`; property order is significant
/// and preserved from the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDefinition {
    pub name: String,
    pub label: String,
    pub plural_label: String,
    pub description: String,
    pub icon: String,
    pub multi_tenant: bool,
    pub api: ApiConfig,
    pub policy: PolicyConfig,
    pub menu: MenuPlacement,
    pub generate_tests: bool,
    pub status: GenerationStatus,
    pub properties: Vec<PropertyDefinition>,
}

impl EntityDefinition {
    /// Build a typed definition from a validated (or trusted) record plus
    /// its ordered property rows.
    pub fn from_record(rec: &EntityRecord, property_rows: &[PropertyRecord]) -> Result<Self> {
        let properties = property_rows
            .iter()
            .map(PropertyDefinition::from_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: rec.name.clone(),
            label: rec.label.clone(),
            plural_label: rec.plural_label.clone(),
            description: rec.description.clone(),
            icon: rec.icon.clone(),
            multi_tenant: rec.multi_tenant,
            api: ApiConfig {
                enabled: rec.api_enabled,
                operations: rec
                    .api_operations
                    .iter()
                    .map(|op| parse_vocab("api_operations", op, &rec.name))
                    .collect::<Result<Vec<ApiOperation>>>()?,
                security: none_if_empty(&rec.api_security),
                page_size: parse_opt_u32("api_page_size", &rec.api_page_size, &rec.name)?
                    .unwrap_or(DEFAULT_PAGE_SIZE),
                order_by: rec.api_order_by.clone(),
                searchable_fields: rec.api_searchable_fields.clone(),
                filterable_fields: rec.api_filterable_fields.clone(),
            },
            policy: PolicyConfig {
                enabled: rec.policy_enabled,
                roles: rec.policy_roles.clone(),
            },
            menu: MenuPlacement {
                group: none_if_empty(&rec.menu_group),
                order: parse_opt_u32("menu_order", &rec.menu_order, &rec.name)?.unwrap_or(0),
            },
            generate_tests: rec.generate_tests,
            status: GenerationStatus {
                generated: rec.generated,
                last_generated_at: rec.last_generated_at,
                last_log: rec.last_log.clone(),
            },
            properties,
        })
    }

    /// Inverse of [`Self::from_record`] (property rows are emitted
    /// separately, in order, by [`SchemaSet::to_rows`]).
    pub fn to_record(&self) -> EntityRecord {
        EntityRecord {
            name: self.name.clone(),
            label: self.label.clone(),
            plural_label: self.plural_label.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            multi_tenant: self.multi_tenant,
            api_enabled: self.api.enabled,
            api_operations: self.api.operations.iter().map(ToString::to_string).collect(),
            api_security: self.api.security.clone().unwrap_or_default(),
            api_page_size: if self.api.page_size == DEFAULT_PAGE_SIZE {
                String::new()
            } else {
                self.api.page_size.to_string()
            },
            api_order_by: self.api.order_by.clone(),
            api_searchable_fields: self.api.searchable_fields.clone(),
            api_filterable_fields: self.api.filterable_fields.clone(),
            policy_enabled: self.policy.enabled,
            policy_roles: self.policy.roles.clone(),
            menu_group: self.menu.group.clone().unwrap_or_default(),
            menu_order: if self.menu.order == 0 {
                String::new()
            } else {
                self.menu.order.to_string()
            },
            generate_tests: self.generate_tests,
            generated: self.status.generated,
            last_generated_at: self.status.last_generated_at,
            last_log: self.status.last_log.clone(),
        }
    }

    /// snake_case variant of the entity name.
    pub fn snake_name(&self) -> String {
        self.name.to_case(Case::Snake)
    }

    /// Table name used by data-access artifacts.
    pub fn table_name(&self) -> String {
        self.snake_name()
    }

    /// True when any property is a relation.
    pub fn has_relations(&self) -> bool {
        self.properties.iter().any(PropertyDefinition::is_relation)
    }

    /// Relation properties, in definition order.
    pub fn relation_properties(&self) -> Vec<&PropertyDefinition> {
        self.properties.iter().filter(|p| p.is_relation()).collect()
    }

    /// Scalar properties, in definition order.
    pub fn scalar_properties(&self) -> Vec<&PropertyDefinition> {
        self.properties.iter().filter(|p| !p.is_relation()).collect()
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// The full immutable definition universe of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaSet {
    pub entities: Vec<EntityDefinition>,
}

impl SchemaSet {
    /// Convert a validated (or trusted) record set into typed definitions.
    pub fn from_rows(rows: &SchemaRows) -> Result<Self> {
        let entities = rows
            .entities
            .iter()
            .map(|rec| EntityDefinition::from_record(rec, rows.properties_for(&rec.name)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entities })
    }

    /// Inverse of [`Self::from_rows`], used by the tabular export and the
    /// store writer.
    pub fn to_rows(&self) -> SchemaRows {
        let mut rows = SchemaRows::default();
        for entity in &self.entities {
            rows.entities.push(entity.to_record());
            rows.properties.insert(
                entity.name.clone(),
                entity.properties.iter().map(PropertyDefinition::to_record).collect(),
            );
        }
        rows
    }

    pub fn get(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
