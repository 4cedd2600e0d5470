use std::fs;

use catalog_merger_rust::{Config, apply, export, extract, import, ingest, merge, run};
use indexmap::IndexMap;

fn primary_csv() -> &'static str {
    "SKU,Price,Stock,Category,Title,Description 1,image1\n\
     B34A1V1,10,5,Gadgets,ignored,primary text,http://img/a1.jpg\n\
     B34A2V1,20,6,Gadgets,Solo item A2,solo text,\n"
}

fn secondary_csv() -> &'static str {
    "SKU,Name,Brand,Category,Material,Color,Description 1,Description 2,Specifications\n\
     A1,Acme A1 Widget,Acme,Widgets,Steel,Red,first,second,\n\
     Z9,Acme Z9 Stand,Acme,Stands,Wood,Oak,stand text,,spec text\n"
}

#[test]
fn extract_import_apply_round_trip_preserves_values() {
    let primary = ingest::parse(primary_csv().as_bytes()).unwrap();
    let secondary = ingest::parse(secondary_csv().as_bytes()).unwrap();
    let unified = merge::join(&primary, &secondary).records;

    let columns = vec!["Title".to_string()];
    let batches = extract::extract(&unified, &columns).unwrap();
    let exported = export::to_csv(&batches["Title"][0].to_records()).unwrap();

    // Re-import the unmodified export and apply it.
    let parsed = ingest::parse(&exported).unwrap();
    let outcome = import::import_translations("Title", &[parsed], &[]).unwrap();
    assert_eq!(outcome.dropped, 0);
    let mut maps = IndexMap::new();
    maps.insert("Title".to_string(), import::reduce(&outcome.rows));
    let applied = apply::apply_translations(&unified, &maps);

    for (before, after) in unified.iter().zip(&applied) {
        assert_eq!(before.get("Title"), after.get("Title"));
    }
    assert_eq!(unified, applied);
}

#[test]
fn merge_composes_expected_unified_rows() {
    let primary = ingest::parse(primary_csv().as_bytes()).unwrap();
    let secondary = ingest::parse(secondary_csv().as_bytes()).unwrap();
    let outcome = merge::join(&primary, &secondary);

    assert_eq!(outcome.stats.matched, 1);
    assert_eq!(outcome.stats.primary_only, 1);
    assert_eq!(outcome.stats.secondary_only, 1);

    let matched = &outcome.records[0];
    assert_eq!(matched.get("SKU"), "A1");
    assert_eq!(matched.get("Title"), "Widget");
    assert_eq!(matched.get("Category"), "Widgets");
    assert_eq!(matched.get("Subcategory"), "Gadgets");
    assert_eq!(matched.get("Price"), "10");
    assert_eq!(matched.get("Material"), "Steel");
    assert_eq!(matched.get("Description"), "first\n\nsecond\n\nprimary text");
    assert_eq!(matched.get("image1"), "http://img/a1.jpg");

    let primary_only = &outcome.records[1];
    assert_eq!(primary_only.get("SKU"), "A2");
    assert_eq!(primary_only.get("Title"), "Solo item A2");
    assert_eq!(primary_only.get("Description"), "solo text");

    let secondary_only = &outcome.records[2];
    assert_eq!(secondary_only.get("SKU"), "Z9");
    assert_eq!(secondary_only.get("Title"), "Stand");
    assert_eq!(secondary_only.get("Subcategory"), "Acme Z9 Stand");
    assert_eq!(secondary_only.get("Description"), "stand text\n\nspec text");
}

#[test]
fn cli_pipeline_merges_extracts_and_imports() {
    let dir = tempfile::tempdir().unwrap();
    let primary_path = dir.path().join("primary.csv");
    let secondary_path = dir.path().join("secondary.csv");
    let unified_path = dir.path().join("unified.csv");
    let bundle_path = dir.path().join("batches.zip");
    let final_path = dir.path().join("final.csv");
    let store_dir = dir.path().join("store");

    fs::write(&primary_path, primary_csv()).unwrap();
    fs::write(&secondary_path, secondary_csv()).unwrap();

    let summary = run(Config {
        primary: Some(primary_path),
        secondary: Some(secondary_path),
        output: Some(unified_path.clone()),
        extract: true,
        batches_out: Some(bundle_path.clone()),
        store_dir: Some(store_dir.clone()),
        ..Config::default()
    })
    .unwrap();
    assert!(summary.contains("merged 3 records"));
    assert!(unified_path.exists());
    assert!(bundle_path.exists());

    // Translator returns the Title batch with a German header.
    let translated_path = dir.path().join("titles_de.csv");
    fs::write(
        &translated_path,
        "row_index,SKU,Titel\n0,A1,Werkzeug\n2,Z9,Halterung\n",
    )
    .unwrap();

    let summary = run(Config {
        import_column: Some("Title".to_string()),
        translated: vec![translated_path],
        output: Some(final_path.clone()),
        store_dir: Some(store_dir),
        ..Config::default()
    })
    .unwrap();
    assert!(summary.contains("imported 2 rows"));

    let final_set = ingest::parse(&fs::read(&final_path).unwrap()).unwrap();
    assert_eq!(final_set[0].get("Title"), "Werkzeug");
    assert_eq!(final_set[1].get("Title"), "Solo item A2");
    assert_eq!(final_set[2].get("Title"), "Halterung");
}
