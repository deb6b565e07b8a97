//! Semantic validation of a normalized definition set.
//!
//! A pure function over the full record set: no input mutation, no
//! filesystem access. All violations accumulate into one ordered error
//! list, each tagged with the offending `Entity` or `Entity.property`; the
//! orchestrator treats any non-empty list as a hard stop before any
//! filesystem mutation.

use crate::schema::types::{
    ApiOperation, CascadeAction, FetchStrategy, RelationKind, ScalarType,
    is_known_validation_rule,
};
use crate::source::rows::{PropertyRecord, SchemaRows};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;

const MAX_PAGE_SIZE: u32 = 500;
const MAX_MENU_ORDER: u32 = 10_000;

/// Verdict plus ordered error list; produced once per run and immutable
/// afterward.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Accumulates tagged violations during one validation pass.
#[derive(Default)]
struct Collector {
    errors: Vec<String>,
}

impl Collector {
    fn error(&mut self, subject: impl Display, message: impl Display) {
        self.errors.push(format!("{subject}: {message}"));
    }

    fn finish(self) -> ValidationReport {
        ValidationReport {
            valid: self.errors.is_empty(),
            errors: self.errors,
        }
    }
}

/// Validate the full definition set.
pub fn validate(rows: &SchemaRows) -> ValidationReport {
    let mut out = Collector::default();

    let known_entities: HashSet<&str> =
        rows.entities.iter().map(|e| e.name.as_str()).collect();

    let mut seen_names: HashSet<&str> = HashSet::new();
    for entity in &rows.entities {
        let name = entity.name.as_str();

        if !seen_names.insert(name) {
            out.error(name, "duplicate entity name");
        }
        if !is_pascal_case(name) {
            out.error(name, "entity name must be a PascalCase identifier");
        }
        if entity.label.trim().is_empty() {
            out.error(name, "label must not be empty");
        }
        if entity.plural_label.trim().is_empty() {
            out.error(name, "plural_label must not be empty");
        }
        if !entity.icon.trim().is_empty() && !is_kebab_case(entity.icon.trim()) {
            out.error(
                name,
                format_args!("icon `{}` must be a kebab-case token", entity.icon.trim()),
            );
        }
        for op in &entity.api_operations {
            if ApiOperation::from_str(op).is_err() {
                out.error(
                    name,
                    format_args!(
                        "unknown API operation `{op}` (expected one of list, get, create, update, delete)"
                    ),
                );
            }
        }
        match bounded_u32(&entity.api_page_size, 1, MAX_PAGE_SIZE) {
            BoundCheck::Ok => {}
            BoundCheck::Invalid => out.error(
                name,
                format_args!(
                    "api_page_size must be an integer between 1 and {MAX_PAGE_SIZE}, got `{}`",
                    entity.api_page_size.trim()
                ),
            ),
        }
        match bounded_u32(&entity.menu_order, 0, MAX_MENU_ORDER) {
            BoundCheck::Ok => {}
            BoundCheck::Invalid => out.error(
                name,
                format_args!(
                    "menu_order must be an integer between 0 and {MAX_MENU_ORDER}, got `{}`",
                    entity.menu_order.trim()
                ),
            ),
        }

        let mut seen_props: HashSet<&str> = HashSet::new();
        for prop in rows.properties_for(name) {
            validate_property(prop, &known_entities, &mut seen_props, &mut out);
        }
    }

    for group in rows.properties.keys() {
        if !known_entities.contains(group.as_str()) {
            out.error(group, "property rows reference an entity that is not defined");
        }
    }

    out.finish()
}

fn validate_property<'a>(
    prop: &'a PropertyRecord,
    known_entities: &HashSet<&str>,
    seen_props: &mut HashSet<&'a str>,
    out: &mut Collector,
) {
    let subject = prop.subject();

    if !seen_props.insert(prop.name.as_str()) {
        out.error(&subject, "duplicate property name");
    }
    if !is_snake_case(&prop.name) {
        out.error(&subject, "property name must be a snake_case identifier");
    }

    if prop.is_relation() {
        validate_relation(prop, known_entities, &subject, out);
    } else {
        validate_scalar(prop, &subject, out);
    }

    for rule in &prop.validation_rules {
        if !is_known_validation_rule(rule) {
            out.error(&subject, format_args!("unknown validation rule `{rule}`"));
        }
    }
}

fn validate_scalar(prop: &PropertyRecord, subject: &str, out: &mut Collector) {
    let Ok(scalar) = ScalarType::from_str(prop.type_name.trim()) else {
        out.error(
            subject,
            format_args!("unknown type `{}`", prop.type_name.trim()),
        );
        return;
    };

    if scalar.is_string_family() {
        match bounded_u32(&prop.length, 1, u32::MAX) {
            BoundCheck::Ok if !prop.length.trim().is_empty() => {}
            _ => out.error(
                subject,
                format_args!("string-family type `{scalar}` requires an explicit length"),
            ),
        }
    } else if !prop.length.trim().is_empty()
        && bounded_u32(&prop.length, 1, u32::MAX) == BoundCheck::Invalid
    {
        out.error(
            subject,
            format_args!("length must be a positive integer, got `{}`", prop.length.trim()),
        );
    }
}

fn validate_relation(
    prop: &PropertyRecord,
    known_entities: &HashSet<&str>,
    subject: &str,
    out: &mut Collector,
) {
    let kind = match RelationKind::from_str(prop.relation_kind.trim()) {
        Ok(kind) => Some(kind),
        Err(_) => {
            out.error(
                subject,
                format_args!(
                    "unknown relation kind `{}` (expected one of many_to_one, one_to_one, one_to_many, many_to_many)",
                    prop.relation_kind.trim()
                ),
            );
            None
        }
    };

    let target = prop.relation_target.trim();
    if target.is_empty() {
        out.error(subject, "relation is missing a target entity");
    } else if !known_entities.contains(target) {
        out.error(
            subject,
            format_args!("relation target `{target}` is not defined in the schema"),
        );
    }

    if let Some(kind) = kind {
        if kind.is_to_many()
            && prop.owning_side.trim().is_empty()
            && prop.inverse_side.trim().is_empty()
        {
            out.error(
                subject,
                "to-many relation must declare an owning-side or inverse-side link",
            );
        }
    }

    for action in &prop.cascade {
        if CascadeAction::from_str(action).is_err() {
            out.error(subject, format_args!("unknown cascade action `{action}`"));
        }
    }
    if !prop.fetch.trim().is_empty() && FetchStrategy::from_str(prop.fetch.trim()).is_err() {
        out.error(
            subject,
            format_args!("unknown fetch strategy `{}`", prop.fetch.trim()),
        );
    }
}

#[derive(PartialEq)]
enum BoundCheck {
    Ok,
    Invalid,
}

/// Empty cells pass; non-empty cells must parse and sit inside the range.
fn bounded_u32(raw: &str, min: u32, max: u32) -> BoundCheck {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return BoundCheck::Ok;
    }
    match trimmed.parse::<u32>() {
        Ok(value) if value >= min && value <= max => BoundCheck::Ok,
        _ => BoundCheck::Invalid,
    }
}

// ============================================================================
// Identifier-case helpers
// ============================================================================

/// PascalCase: leading uppercase, alphanumeric, no separators.
pub fn is_pascal_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}

/// snake_case: leading lowercase letter, then lowercase/digit/underscore.
pub fn is_snake_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// kebab-case: leading lowercase letter, then lowercase/digit/hyphen.
pub fn is_kebab_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_helpers() {
        assert!(is_pascal_case("PurchaseOrder"));
        assert!(!is_pascal_case("purchaseOrder"));
        assert!(!is_pascal_case("Purchase_Order"));
        assert!(!is_pascal_case(""));

        assert!(is_snake_case("first_name"));
        assert!(!is_snake_case("FirstName"));
        assert!(!is_snake_case("_name"));
        assert!(!is_snake_case("1name"));

        assert!(is_kebab_case("address-book"));
        assert!(!is_kebab_case("AddressBook"));
        assert!(!is_kebab_case("address_book"));
    }

    #[test]
    fn bounded_u32_accepts_empty() {
        assert!(bounded_u32("", 1, 500) == BoundCheck::Ok);
        assert!(bounded_u32("25", 1, 500) == BoundCheck::Ok);
        assert!(bounded_u32("0", 1, 500) == BoundCheck::Invalid);
        assert!(bounded_u32("501", 1, 500) == BoundCheck::Invalid);
        assert!(bounded_u32("abc", 1, 500) == BoundCheck::Invalid);
    }
}
