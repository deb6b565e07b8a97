//! Closed vocabularies of the schema language.
//!
//! Every enum here is a fixed vocabulary: the validator rejects tokens
//! outside it, and the intermediate representation only ever holds parsed
//! values. String forms (CSV cells, store columns, config files) round-trip
//! through the `strum` Display/FromStr pair.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Scalar property types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Text,
    Integer,
    BigInt,
    Float,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Uuid,
    Json,
}

impl ScalarType {
    /// String-family types must carry an explicit length.
    pub fn is_string_family(self) -> bool {
        matches!(self, Self::String | Self::Text)
    }

    /// Default form widget used when a property has no explicit override.
    pub fn default_widget(self) -> FormWidget {
        match self {
            Self::String | Self::Uuid => FormWidget::TextInput,
            Self::Text => FormWidget::TextArea,
            Self::Integer | Self::BigInt | Self::Float | Self::Decimal => FormWidget::NumberInput,
            Self::Boolean => FormWidget::Checkbox,
            Self::Date => FormWidget::DatePicker,
            Self::Time => FormWidget::TimePicker,
            Self::DateTime => FormWidget::DateTimePicker,
            Self::Json => FormWidget::CodeEditor,
        }
    }

    /// Rust type emitted into model structs.
    pub fn rust_type(self) -> &'static str {
        match self {
            Self::String | Self::Text => "String",
            Self::Integer => "i32",
            Self::BigInt => "i64",
            Self::Float => "f64",
            Self::Decimal => "rust_decimal::Decimal",
            Self::Boolean => "bool",
            Self::Date => "chrono::NaiveDate",
            Self::Time => "chrono::NaiveTime",
            Self::DateTime => "chrono::DateTime<chrono::Utc>",
            Self::Uuid => "uuid::Uuid",
            Self::Json => "serde_json::Value",
        }
    }

    /// SQLite column affinity emitted into data-access artifacts.
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer | Self::BigInt | Self::Boolean => "INTEGER",
            Self::Float => "REAL",
            Self::Decimal => "NUMERIC",
            _ => "TEXT",
        }
    }
}

/// The four standard relation kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    /// To-many relations must declare at least one linkage side.
    pub fn is_to_many(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Whether the declaring side carries the foreign key by convention.
    pub fn is_owning(self) -> bool {
        matches!(self, Self::ManyToOne | Self::OneToOne | Self::ManyToMany)
    }
}

/// Cascade operations propagated along a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CascadeAction {
    Persist,
    Remove,
    Refresh,
    Detach,
    All,
}

/// Relation fetch strategy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    #[default]
    Lazy,
    Eager,
}

/// Operations an entity may expose through the generated API surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApiOperation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

/// Form widget classification used by the form and page-template stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FormWidget {
    TextInput,
    TextArea,
    NumberInput,
    Checkbox,
    DatePicker,
    TimePicker,
    DateTimePicker,
    Select,
    CodeEditor,
}

/// Sort direction inside an ordering clause.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One clause of a default ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderClause {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderClause {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }
}

/// Validation-rule names a property may reference.
pub const VALIDATION_RULES: &[&str] = &[
    "not_blank",
    "email",
    "url",
    "uuid",
    "length",
    "range",
    "regex",
    "choice",
    "positive",
    "unique",
];

/// True when `rule` belongs to the validation-rule vocabulary.
pub fn is_known_validation_rule(rule: &str) -> bool {
    VALIDATION_RULES.contains(&rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn scalar_type_round_trips_through_strings() {
        for (token, expected) in [
            ("string", ScalarType::String),
            ("bigint", ScalarType::BigInt),
            ("datetime", ScalarType::DateTime),
            ("uuid", ScalarType::Uuid),
        ] {
            assert_eq!(ScalarType::from_str(token).unwrap(), expected);
            assert_eq!(expected.to_string(), token);
        }
        assert!(ScalarType::from_str("varchar").is_err());
    }

    #[test]
    fn string_family_requires_length() {
        assert!(ScalarType::String.is_string_family());
        assert!(ScalarType::Text.is_string_family());
        assert!(!ScalarType::Integer.is_string_family());
        assert!(!ScalarType::Uuid.is_string_family());
    }

    #[test]
    fn default_widgets() {
        assert_eq!(ScalarType::Text.default_widget(), FormWidget::TextArea);
        assert_eq!(ScalarType::Boolean.default_widget(), FormWidget::Checkbox);
        assert_eq!(ScalarType::Decimal.default_widget(), FormWidget::NumberInput);
        assert_eq!(ScalarType::Json.default_widget(), FormWidget::CodeEditor);
    }

    #[test]
    fn relation_kind_linkage() {
        assert!(RelationKind::OneToMany.is_to_many());
        assert!(RelationKind::ManyToMany.is_to_many());
        assert!(!RelationKind::ManyToOne.is_to_many());
        assert_eq!(
            RelationKind::from_str("many_to_one").unwrap(),
            RelationKind::ManyToOne
        );
    }

    #[test]
    fn validation_rule_vocabulary() {
        assert!(is_known_validation_rule("not_blank"));
        assert!(!is_known_validation_rule("NotBlank"));
    }
}
