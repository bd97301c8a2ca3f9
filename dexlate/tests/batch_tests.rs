use std::{fs, path::Path};

use dexlate::{
    BatchOptions, DocumentAction, Error, ManifestEdits, MissingTranslation, run_batch,
    traits::Source,
};
use indoc::indoc;
use tempfile::TempDir;

const INFO: &str = indoc! {r#"
    <?xml version="1.0" encoding="utf-8"?>
    <mod>
        <resource name="Super Strings" version="1.0.0" author="Someone" description="Texts"/>
        <strings>
            <string path="strings/moves.xml"/>
            <string path="strings/credits.xml"/>
            <string path="strings/unused.xml"/>
            <string path="strings/gone.xml"/>
        </strings>
    </mod>
"#};

const MOVES: &str = indoc! {r#"
    <?xml version="1.0" encoding="utf-8"?>
    <strings>
      <string id="1">This move is Fire type.</string>
      <string id="2">Lv.5</string>
      <string id="3">Route 1</string>
    </strings>
"#};

const CREDITS: &str = r#"<strings><string id="1">Fire</string></strings>"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "input/info.xml", INFO);
    write(root, "input/strings/moves.xml", MOVES);
    write(root, "input/strings/credits.xml", CREDITS);
    write(root, "input/strings/unused.xml", CREDITS);
    write(root, "input/icon.png", "png");
    write(root, "translations/it/type-it.json", r#"{ "Fire": "Fuoco" }"#);
    write(root, "translations/it/broken-it.json", r#"{ "Fire": "#);
    write(
        root,
        "translations/it/special_cases-it.json",
        r#"{
            "transform_translation": { "ids": [
                { "id": "2", "patterns": [ { "regex": "^Lv\\.(\\d+)$", "template": "Liv.{group1}" } ] }
            ] },
            "add_block": { "strings/moves.xml": { "content": "  <string id=\"99\">Extra</string>" } }
        }"#,
    );
    dir
}

fn options(root: &Path) -> BatchOptions {
    BatchOptions::new("it")
        .with_input_dir(root.join("input"))
        .with_translations_dir(root.join("translations"))
        .with_output_root(root.join("output"))
        .with_action("strings/credits.xml", DocumentAction::Copy)
        .with_action("strings/unused.xml", DocumentAction::Skip)
}

#[test]
fn test_batch_translates_copies_and_skips() {
    let dir = fixture();
    let root = dir.path();
    let edits = ManifestEdits::new()
        .with_name_suffix(" ITA")
        .with_version_suffix("-mod_{version}")
        .with_version(Some("2.0.0".to_string()));
    let csv = root.join("translations/it/missing/records.csv");

    let report = run_batch(
        &options(root)
            .with_manifest_edits(edits)
            .with_missing_report(Some(csv.clone())),
    )
    .unwrap();

    let out = root.join("output/IT");
    assert_eq!(report.output_dir, out);
    assert_eq!(report.documents.len(), 3);
    assert_eq!(report.processed(), 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 0);

    let moves = fs::read_to_string(out.join("strings/moves.xml")).unwrap();
    assert!(moves.contains(r#"<string id="1">This move is Fuoco type.</string>"#));
    assert!(moves.contains(r#"<string id="2">Liv.5</string>"#));
    assert!(moves.contains(r#"<string id="3">Route 1</string>"#));
    assert!(moves.contains("  <string id=\"99\">Extra</string>\n</strings>"));

    assert_eq!(
        fs::read_to_string(out.join("strings/credits.xml")).unwrap(),
        CREDITS
    );
    assert!(!out.join("strings/unused.xml").exists());
    assert!(out.join("icon.png").exists());

    let manifest = fs::read_to_string(out.join("info.xml")).unwrap();
    assert!(manifest.contains(r#"name="Super Strings ITA" version="1.0.0-mod_2.0.0""#));
    assert!(manifest.contains("strings/moves.xml"));
    assert!(manifest.contains("strings/credits.xml"));
    assert!(!manifest.contains("strings/unused.xml"));
    assert!(!manifest.contains("strings/gone.xml"));

    assert_eq!(report.totals.total, 3);
    assert_eq!(report.totals.translated, 2);
    assert_eq!(report.totals.special_cases_applied, 1);
    assert_eq!(report.missing_rows, 1);
    let rows = Vec::<MissingTranslation>::read_from(&csv).unwrap();
    assert_eq!(rows, vec![MissingTranslation::new("3", "it", "Route 1")]);

    // the malformed dictionary file is reported, the others still load
    assert_eq!(report.load_issues.len(), 1);
    assert!(report.load_issues[0].contains("broken-it.json"));
}

#[test]
fn test_batch_matches_blocks_keyed_by_input_path() {
    let dir = fixture();
    let root = dir.path();
    write(
        root,
        "translations/it/special_cases-it.json",
        r#"{ "add_block": {
            "input/strings/moves.xml": { "content": "  <string id=\"99\">Extra</string>" }
        } }"#,
    );

    let report = run_batch(&options(root)).unwrap();
    let moves_report = report
        .documents
        .iter()
        .find(|d| d.path == "strings/moves.xml")
        .unwrap();
    assert_eq!(moves_report.blocks_applied, 1);

    let moves = fs::read_to_string(root.join("output/IT/strings/moves.xml")).unwrap();
    assert!(moves.contains("  <string id=\"99\">Extra</string>\n</strings>"));
    let credits = fs::read_to_string(root.join("output/IT/strings/credits.xml")).unwrap();
    assert!(!credits.contains(r#"id="99""#));
}

#[test]
fn test_batch_without_overlay() {
    let dir = fixture();
    let root = dir.path();
    fs::remove_file(root.join("translations/it/special_cases-it.json")).unwrap();

    let report = run_batch(&options(root)).unwrap();
    let moves = fs::read_to_string(root.join("output/IT/strings/moves.xml")).unwrap();
    assert!(moves.contains(r#"<string id="2">Lv.5</string>"#));
    assert!(!moves.contains("Extra"));
    assert!(report.load_issues.iter().all(|i| !i.contains("special_cases")));
}

#[test]
fn test_batch_setup_errors() {
    let dir = fixture();
    let root = dir.path();

    let bad_language = BatchOptions::new("not a language").with_input_dir(root.join("input"));
    assert!(matches!(
        run_batch(&bad_language),
        Err(Error::InvalidLanguage(_))
    ));

    fs::remove_file(root.join("input/info.xml")).unwrap();
    assert!(matches!(
        run_batch(&options(root)),
        Err(Error::ConfigNotFound(_))
    ));
}
