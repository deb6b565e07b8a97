//! Tabular source round-trip and row-shape handling.

use entigen::schema::{SchemaSet, validate};
use entigen::source::tabular::{ENTITY_COLUMNS, PROPERTY_COLUMNS, TabularSource, write_tabular};
use entigen::source::SchemaSource;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures/valid")
        .join(name)
}

fn load_fixture_schema() -> SchemaSet {
    let source = TabularSource::new(fixture("entities.csv"), fixture("properties.csv"));
    let rows = source.load().expect("fixture parses");
    let report = validate(&rows);
    assert!(report.is_valid(), "fixture must be valid: {:?}", report.errors);
    SchemaSet::from_rows(&rows).expect("fixture builds definitions")
}

#[test]
fn fixture_parses_and_validates() {
    let schema = load_fixture_schema();
    assert_eq!(schema.len(), 3);

    let contact = schema.get("Contact").expect("Contact exists");
    assert_eq!(contact.properties.len(), 7);
    assert!(contact.has_relations());
    assert_eq!(contact.relation_properties().len(), 2);
    assert_eq!(contact.api.page_size, 50);
    assert_eq!(contact.api.order_by.len(), 2);
    assert_eq!(contact.api.order_by[0].field, "last_name");

    let email = contact.property("email").expect("email exists");
    assert_eq!(email.length, Some(180));
    assert_eq!(
        email.validation_rules,
        vec!["not_blank".to_string(), "email".to_string()]
    );
    assert_eq!(
        email.composite_index,
        vec![vec!["email".to_string(), "last_name".to_string()]]
    );
}

#[test]
fn encode_then_reparse_yields_equal_definitions() {
    let schema = load_fixture_schema();

    let dir = tempfile::tempdir().unwrap();
    let entities = dir.path().join("entities.csv");
    let properties = dir.path().join("properties.csv");
    write_tabular(&schema, &entities, &properties).unwrap();

    let source = TabularSource::new(&entities, &properties);
    let rows = source.load().unwrap();
    let report = validate(&rows);
    assert!(report.is_valid(), "re-parsed export must validate: {:?}", report.errors);

    let reparsed = SchemaSet::from_rows(&rows).unwrap();
    assert_eq!(reparsed, schema);
}

#[test]
fn overlong_property_row_is_skipped_but_rest_survives() {
    let dir = tempfile::tempdir().unwrap();
    let entities = dir.path().join("entities.csv");
    let properties = dir.path().join("properties.csv");

    let mut entity_rows = vec![ENTITY_COLUMNS.join(",")];
    entity_rows.push("Contact,Contact,Contacts,,,0,0,,,,,,,0,,,,0".to_string());
    fs::write(&entities, entity_rows.join("\n")).unwrap();

    // One 39-cell row against the 41-column header, surrounded by valid rows.
    let mut short_row = vec!["Contact", "email", "Email", "", "string"];
    short_row.resize(39, "");
    let mut overlong_row = vec!["Contact", "broken", "Broken", "", "string"];
    overlong_row.resize(43, "");
    let property_rows = vec![
        PROPERTY_COLUMNS.join(","),
        short_row.join(","),
        overlong_row.join(","),
        {
            let mut row = vec!["Contact", "last_name", "Last name", "", "string", "0", "80"];
            row.resize(41, "");
            row.join(",")
        },
    ];
    fs::write(&properties, property_rows.join("\n")).unwrap();

    let source = TabularSource::new(&entities, &properties);
    let rows = source.load().unwrap();
    let contact_props = rows.properties_for("Contact");

    // The 39-cell row is right-padded and kept; the 43-cell row is gone.
    assert_eq!(contact_props.len(), 2);
    assert_eq!(contact_props[0].name, "email");
    assert_eq!(contact_props[1].name, "last_name");
    assert!(contact_props.iter().all(|p| p.name != "broken"));
}

#[test]
fn header_missing_column_fails_the_whole_source() {
    let dir = tempfile::tempdir().unwrap();
    let entities = dir.path().join("entities.csv");
    let properties = dir.path().join("properties.csv");

    fs::write(&entities, format!("{}\n", ENTITY_COLUMNS.join(","))).unwrap();
    // Drop the final column from the property header.
    let broken = PROPERTY_COLUMNS[..40].join(",");
    fs::write(&properties, format!("{broken}\n")).unwrap();

    let source = TabularSource::new(&entities, &properties);
    let err = source.load().unwrap_err();
    assert!(err.to_string().contains("property table header mismatch"));
    assert!(err.to_string().contains("form_order"));
}

#[test]
fn legacy_boolean_words_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let entities = dir.path().join("entities.csv");
    let properties = dir.path().join("properties.csv");

    let mut row = vec!["Widget", "Widget", "Widgets", "", "", "yes", "TRUE"];
    row.resize(17, "");
    row.push("y");
    fs::write(
        &entities,
        format!("{}\n{}\n", ENTITY_COLUMNS.join(","), row.join(",")),
    )
    .unwrap();
    fs::write(&properties, format!("{}\n", PROPERTY_COLUMNS.join(","))).unwrap();

    let source = TabularSource::new(&entities, &properties);
    let rows = source.load().unwrap();
    assert!(rows.entities[0].multi_tenant);
    assert!(rows.entities[0].api_enabled);
    assert!(rows.entities[0].generate_tests);
}
