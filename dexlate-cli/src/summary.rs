use dexlate::{BatchReport, DictionarySummary, SpecialCasesSummary, TranslationStats};
use serde_json::json;

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        ((part as f64) * 100.0 / (total as f64) * 100.0).round() / 100.0
    }
}

/// One-document summary, as printed by `dexlate translate`.
pub fn render_stats(path: &str, stats: &TranslationStats, blocks_applied: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", path));
    out.push_str(&format!("{}\n", stats));
    out.push_str(&format!(
        "Completion: {:.2}%\n",
        percent(stats.translated, stats.total)
    ));
    if blocks_applied > 0 {
        out.push_str(&format!("Blocks added: {}\n", blocks_applied));
    }
    out
}

pub fn render_batch(report: &BatchReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} -> {} ===\n",
        report.language.to_uppercase(),
        report.output_dir.display()
    ));
    for doc in &report.documents {
        let detail = match (&doc.error, &doc.stats) {
            (Some(error), _) => format!("FAILED: {}", error),
            (None, Some(stats)) => stats.to_string(),
            (None, None) => String::new(),
        };
        out.push_str(&format!("[{}] {} {}\n", doc.action, doc.path, detail));
        for issue in &doc.issues {
            out.push_str(&format!("    ! {}\n", issue));
        }
    }
    out.push_str(&format!(
        "Total files processed: {}/{}\n",
        report.processed(),
        report.documents.len()
    ));
    out.push_str(&format!("Files skipped: {}\n", report.skipped()));
    out.push_str(&format!("Totals: {}\n", report.totals));
    if report.missing_rows > 0 {
        out.push_str(&format!("Missing translations exported: {}\n", report.missing_rows));
    }
    for issue in &report.load_issues {
        out.push_str(&format!("Warning: {}\n", issue));
    }
    out
}

pub fn render_batch_json(report: &BatchReport) -> Result<String, serde_json::Error> {
    let body = json!({
        "summary": {
            "language": report.language,
            "processed": report.processed(),
            "skipped": report.skipped(),
            "failed": report.failed(),
            "completion_percent": percent(report.totals.translated, report.totals.total),
        },
        "report": report,
    });
    serde_json::to_string_pretty(&body)
}

pub fn render_inspect(
    language: &str,
    dictionaries: &DictionarySummary,
    special_cases: &SpecialCasesSummary,
    issues: &[String],
    json_output: bool,
) -> Result<String, serde_json::Error> {
    if json_output {
        let body = json!({
            "language": language,
            "dictionaries": dictionaries,
            "special_cases": special_cases,
            "issues": issues,
        });
        return serde_json::to_string_pretty(&body);
    }

    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", language));
    out.push_str("Dictionaries:\n");
    for (name, count) in [
        ("generic", dictionaries.generic),
        ("type", dictionaries.type_),
        ("move", dictionaries.move_),
        ("ability", dictionaries.ability),
        ("item", dictionaries.item),
    ] {
        out.push_str(&format!("  {:<8} {}\n", name, count));
    }
    out.push_str(&format!("  distinct terms: {}\n", dictionaries.distinct_terms));
    out.push_str("Special cases:\n");
    for (name, count) in [
        ("override_translation", special_cases.overrides),
        ("no_translation", special_cases.no_translation),
        ("transform_translation", special_cases.transforms),
        ("add_translation", special_cases.global_terms),
        ("add_block", special_cases.add_blocks),
        ("legacy", special_cases.legacy),
    ] {
        out.push_str(&format!("  {:<22} {}\n", name, count));
    }
    for issue in issues {
        out.push_str(&format!("Warning: {}\n", issue));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexlate::{DocumentAction, DocumentReport};

    #[test]
    fn test_render_stats() {
        let stats = TranslationStats {
            total: 4,
            translated: 3,
            not_translated: 1,
            special_cases_applied: 1,
            untranslated: Vec::new(),
        };
        let out = render_stats("moves.xml", &stats, 2);
        assert!(out.contains("Translated elements: 3/4"));
        assert!(out.contains("Completion: 75.00%"));
        assert!(out.contains("Blocks added: 2"));
    }

    #[test]
    fn test_render_batch_lists_failures() {
        let report = BatchReport {
            language: "it".to_string(),
            documents: vec![
                DocumentReport {
                    path: "a.xml".to_string(),
                    action: DocumentAction::Translate,
                    error: Some("I/O error: boom".to_string()),
                    ..Default::default()
                },
                DocumentReport {
                    path: "b.xml".to_string(),
                    action: DocumentAction::Skip,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let out = render_batch(&report);
        assert!(out.contains("[translate] a.xml FAILED: I/O error: boom"));
        assert!(out.contains("Total files processed: 0/2"));

        let json: serde_json::Value =
            serde_json::from_str(&render_batch_json(&report).unwrap()).unwrap();
        assert_eq!(json["summary"]["failed"], 1);
        assert_eq!(json["report"]["documents"][1]["action"], "skip");
    }
}
