//! Property definitions: immutable per-property value objects.

use crate::error::Result;
use crate::schema::types::{
    CascadeAction, FetchStrategy, FormWidget, OrderClause, RelationKind, ScalarType,
};
use crate::schema::{none_if_empty, parse_opt_u32, parse_vocab};
use crate::source::rows::PropertyRecord;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

/// What a property is: a scalar column or a relation to another entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Scalar(ScalarType),
    Relation(RelationDescriptor),
}

/// Relation descriptor carried by relation properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationDescriptor {
    pub kind: RelationKind,
    pub target: String,
    pub owning_side: Option<String>,
    pub inverse_side: Option<String>,
    pub cascade: Vec<CascadeAction>,
    pub orphan_removal: bool,
    pub fetch: FetchStrategy,
    pub order_by: Vec<OrderClause>,
}

/// Form rendering configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormConfig {
    pub type_override: Option<String>,
    pub options: Value,
    pub group: Option<String>,
}

/// Where and how a property appears in generated UI surfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UiConfig {
    pub show_in_list: bool,
    pub show_in_detail: bool,
    pub show_in_form: bool,
    pub show_in_filter: bool,
    pub sortable: bool,
    pub searchable: bool,
    pub list_order: Option<u32>,
    pub detail_order: Option<u32>,
    pub form_order: Option<u32>,
}

/// Per-property API exposure flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiFieldConfig {
    pub readable: bool,
    pub writable: bool,
    pub filterable: bool,
    pub example: Option<String>,
}

/// Localization flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalizationConfig {
    pub translatable: bool,
    pub locale_fallback: bool,
}

/// Hints for the fixture-oriented test stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FixtureHint {
    pub kind: Option<String>,
    pub options: Value,
}

/// Immutable property definition.
///
/// `entity` is the non-empty back-reference to the single owning
/// [`crate::schema::EntityDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDefinition {
    pub entity: String,
    pub name: String,
    pub label: String,
    pub help_text: String,
    pub kind: PropertyKind,
    pub nullable: bool,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unique: bool,
    pub default_value: Option<String>,
    pub validation_rules: Vec<String>,
    pub form: FormConfig,
    pub ui: UiConfig,
    pub api: ApiFieldConfig,
    pub i18n: LocalizationConfig,
    pub fixture: FixtureHint,
    pub composite_index: Vec<Vec<String>>,
}

impl PropertyDefinition {
    /// Build a typed definition from a validated (or trusted) record.
    pub fn from_record(rec: &PropertyRecord) -> Result<Self> {
        let subject = rec.subject();

        let kind = if rec.is_relation() {
            PropertyKind::Relation(RelationDescriptor {
                kind: parse_vocab("relation_kind", &rec.relation_kind, &subject)?,
                target: rec.relation_target.trim().to_string(),
                owning_side: none_if_empty(&rec.owning_side),
                inverse_side: none_if_empty(&rec.inverse_side),
                cascade: rec
                    .cascade
                    .iter()
                    .map(|action| parse_vocab("cascade", action, &subject))
                    .collect::<Result<Vec<CascadeAction>>>()?,
                orphan_removal: rec.orphan_removal,
                fetch: match rec.fetch.trim() {
                    "" => FetchStrategy::default(),
                    raw => parse_vocab("fetch", raw, &subject)?,
                },
                order_by: rec.order_by.clone(),
            })
        } else {
            PropertyKind::Scalar(parse_vocab("type", &rec.type_name, &subject)?)
        };

        Ok(Self {
            entity: rec.entity.clone(),
            name: rec.name.clone(),
            label: rec.label.clone(),
            help_text: rec.help_text.clone(),
            kind,
            nullable: rec.nullable,
            length: parse_opt_u32("length", &rec.length, &subject)?,
            precision: parse_opt_u32("precision", &rec.precision, &subject)?,
            scale: parse_opt_u32("scale", &rec.scale, &subject)?,
            unique: rec.unique,
            default_value: none_if_empty(&rec.default_value),
            validation_rules: rec.validation_rules.clone(),
            form: FormConfig {
                type_override: none_if_empty(&rec.form_type),
                options: rec.form_options.clone(),
                group: none_if_empty(&rec.form_group),
            },
            ui: UiConfig {
                show_in_list: rec.show_in_list,
                show_in_detail: rec.show_in_detail,
                show_in_form: rec.show_in_form,
                show_in_filter: rec.show_in_filter,
                sortable: rec.sortable,
                searchable: rec.searchable,
                list_order: parse_opt_u32("list_order", &rec.list_order, &subject)?,
                detail_order: parse_opt_u32("detail_order", &rec.detail_order, &subject)?,
                form_order: parse_opt_u32("form_order", &rec.form_order, &subject)?,
            },
            api: ApiFieldConfig {
                readable: rec.api_readable,
                writable: rec.api_writable,
                filterable: rec.api_filterable,
                example: none_if_empty(&rec.api_example),
            },
            i18n: LocalizationConfig {
                translatable: rec.translatable,
                locale_fallback: rec.locale_fallback,
            },
            fixture: FixtureHint {
                kind: none_if_empty(&rec.fixture_kind),
                options: rec.fixture_options.clone(),
            },
            composite_index: rec.composite_index.clone(),
        })
    }

    /// Inverse of [`Self::from_record`], used by the tabular export and the
    /// store writer.
    pub fn to_record(&self) -> PropertyRecord {
        let mut rec = PropertyRecord {
            entity: self.entity.clone(),
            name: self.name.clone(),
            label: self.label.clone(),
            help_text: self.help_text.clone(),
            nullable: self.nullable,
            length: self.length.map(|v| v.to_string()).unwrap_or_default(),
            precision: self.precision.map(|v| v.to_string()).unwrap_or_default(),
            scale: self.scale.map(|v| v.to_string()).unwrap_or_default(),
            unique: self.unique,
            default_value: self.default_value.clone().unwrap_or_default(),
            validation_rules: self.validation_rules.clone(),
            form_type: self.form.type_override.clone().unwrap_or_default(),
            form_options: self.form.options.clone(),
            form_group: self.form.group.clone().unwrap_or_default(),
            show_in_list: self.ui.show_in_list,
            show_in_detail: self.ui.show_in_detail,
            show_in_form: self.ui.show_in_form,
            show_in_filter: self.ui.show_in_filter,
            sortable: self.ui.sortable,
            searchable: self.ui.searchable,
            api_readable: self.api.readable,
            api_writable: self.api.writable,
            api_filterable: self.api.filterable,
            api_example: self.api.example.clone().unwrap_or_default(),
            translatable: self.i18n.translatable,
            locale_fallback: self.i18n.locale_fallback,
            fixture_kind: self.fixture.kind.clone().unwrap_or_default(),
            fixture_options: self.fixture.options.clone(),
            list_order: self.ui.list_order.map(|v| v.to_string()).unwrap_or_default(),
            detail_order: self
                .ui
                .detail_order
                .map(|v| v.to_string())
                .unwrap_or_default(),
            form_order: self.ui.form_order.map(|v| v.to_string()).unwrap_or_default(),
            composite_index: self.composite_index.clone(),
            ..Default::default()
        };

        match &self.kind {
            PropertyKind::Scalar(scalar) => {
                rec.type_name = scalar.to_string();
            }
            PropertyKind::Relation(rel) => {
                rec.relation_kind = rel.kind.to_string();
                rec.relation_target = rel.target.clone();
                rec.owning_side = rel.owning_side.clone().unwrap_or_default();
                rec.inverse_side = rel.inverse_side.clone().unwrap_or_default();
                rec.cascade = rel.cascade.iter().map(ToString::to_string).collect();
                rec.orphan_removal = rel.orphan_removal;
                rec.fetch = rel.fetch.to_string();
                rec.order_by = rel.order_by.clone();
            }
        }

        rec
    }

    /// True for relation properties.
    pub fn is_relation(&self) -> bool {
        matches!(self.kind, PropertyKind::Relation(_))
    }

    /// The scalar type, if this property is a scalar.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            PropertyKind::Scalar(scalar) => Some(scalar),
            PropertyKind::Relation(_) => None,
        }
    }

    /// The relation descriptor, if this property is a relation.
    pub fn relation(&self) -> Option<&RelationDescriptor> {
        match &self.kind {
            PropertyKind::Relation(rel) => Some(rel),
            PropertyKind::Scalar(_) => None,
        }
    }

    /// Widget used by the form and page-template stages: the explicit
    /// override when present and well-formed, otherwise the default
    /// classification of the scalar type. Relations render as selects.
    pub fn widget(&self) -> FormWidget {
        if let Some(token) = self.form.type_override.as_deref() {
            if let Ok(widget) = FormWidget::from_str(token) {
                return widget;
            }
        }
        match &self.kind {
            PropertyKind::Scalar(scalar) => scalar.default_widget(),
            PropertyKind::Relation(_) => FormWidget::Select,
        }
    }

    /// `Entity.property` tag used in logs and error messages.
    pub fn subject(&self) -> String {
        format!("{}.{}", self.entity, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::rows::decode_json_names;
    use assert_matches::assert_matches;

    fn scalar_record() -> PropertyRecord {
        PropertyRecord {
            entity: "Contact".into(),
            name: "email".into(),
            label: "Email".into(),
            type_name: "string".into(),
            length: "180".into(),
            unique: true,
            validation_rules: decode_json_names(r#"["not_blank","email"]"#),
            ..Default::default()
        }
    }

    #[test]
    fn scalar_record_round_trips() {
        let rec = scalar_record();
        let def = PropertyDefinition::from_record(&rec).unwrap();
        assert_eq!(def.scalar_type(), Some(ScalarType::String));
        assert_eq!(def.length, Some(180));
        assert_eq!(def.to_record(), rec);
    }

    #[test]
    fn relation_record_round_trips() {
        let rec = PropertyRecord {
            entity: "Contact".into(),
            name: "organization".into(),
            label: "Organization".into(),
            relation_kind: "many_to_one".into(),
            relation_target: "Organization".into(),
            owning_side: "contacts".into(),
            cascade: vec!["persist".into()],
            fetch: "eager".into(),
            ..Default::default()
        };
        let def = PropertyDefinition::from_record(&rec).unwrap();
        let rel = def.relation().unwrap();
        assert_eq!(rel.kind, RelationKind::ManyToOne);
        assert_eq!(rel.target, "Organization");
        assert_eq!(rel.fetch, FetchStrategy::Eager);
        assert_eq!(def.to_record(), rec);
    }

    #[test]
    fn empty_fetch_defaults_to_lazy() {
        let rec = PropertyRecord {
            entity: "Contact".into(),
            name: "tags".into(),
            relation_kind: "many_to_many".into(),
            relation_target: "Tag".into(),
            owning_side: "contacts".into(),
            ..Default::default()
        };
        let def = PropertyDefinition::from_record(&rec).unwrap();
        assert_eq!(def.relation().unwrap().fetch, FetchStrategy::Lazy);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut rec = scalar_record();
        rec.type_name = "varchar".into();
        assert_matches!(
            PropertyDefinition::from_record(&rec),
            Err(crate::error::GeneratorError::UnknownVocabulary { field: "type", .. })
        );
    }

    #[test]
    fn widget_override_beats_default() {
        let mut rec = scalar_record();
        rec.form_type = "text_area".into();
        let def = PropertyDefinition::from_record(&rec).unwrap();
        assert_eq!(def.widget(), FormWidget::TextArea);

        let def = PropertyDefinition::from_record(&scalar_record()).unwrap();
        assert_eq!(def.widget(), FormWidget::TextInput);
    }
}
