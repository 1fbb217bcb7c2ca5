//! Report rendering for the command line.

use rust_decimal::Decimal;
use serde::Serialize;

use ofitec_models::{BudgetSummary, BudgetTree, ImportResult, ParseDiagnostic};
use ofitec_utils::{ErrorResponse, ImportError};

/// What the database holds for a persisted import, read back after commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedProject {
    pub project_id: i64,
    pub stored_items: i64,
    pub stored_total: Decimal,
}

impl PersistedProject {
    /// Whether the stored project matches the in-memory summary.
    pub fn agrees_with(&self, summary: &BudgetSummary) -> bool {
        usize::try_from(self.stored_items).map_or(false, |items| items == summary.total_items)
            && summary.total_cost == Some(self.stored_total)
    }
}

/// JSON document printed by `--output json`.
#[derive(Debug, Serialize)]
pub struct ImportReport<'a> {
    pub source: &'a str,
    pub format_version: Option<&'a str>,
    pub summary: BudgetSummary,
    pub tree: BudgetTree,
    pub diagnostics: &'a [ParseDiagnostic],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<&'a PersistedProject>,
}

impl<'a> ImportReport<'a> {
    pub fn new(result: &'a ImportResult, persisted: Option<&'a PersistedProject>) -> Self {
        Self {
            source: &result.source_name,
            format_version: result.format_version.as_deref(),
            summary: result.summary(),
            tree: result.tree(),
            diagnostics: &result.diagnostics,
            persisted,
        }
    }
}

pub fn render_json(result: &ImportResult, persisted: Option<&PersistedProject>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ImportReport::new(result, persisted))
}

pub fn render_error_json(error: &ImportError) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ErrorResponse::from(error.clone()))
}

pub fn render_text(result: &ImportResult, persisted: Option<&PersistedProject>) -> String {
    let summary = result.summary();
    let mut out = format!(
        "{} ({} dialect)\n",
        result.source_name, result.dialect
    );

    for chapter in result.tree().chapters {
        out.push_str(&format!("\n[{}] {}\n", chapter.code, chapter.name));
        for item in chapter.items {
            out.push_str(&format!(
                "  {:<12} {:<40} {:>10} {:<4} {:>12}\n",
                item.code, item.name, item.quantity, item.unit, item.price
            ));
        }
    }

    out.push_str(&format!(
        "\nchapters: {}  items: {}  resources: {}  breakdown lines: {}\n",
        summary.total_chapters, summary.total_items, summary.total_resources, summary.total_breakdown_lines
    ));
    match summary.total_cost {
        Some(total) => out.push_str(&format!("total cost: {}\n", total)),
        None => out.push_str("total cost: overflow\n"),
    }

    if !result.diagnostics.is_empty() {
        out.push_str(&format!("\n{} diagnostic(s):\n", result.diagnostics.len()));
        for diagnostic in &result.diagnostics {
            out.push_str(&format!("  {}\n", diagnostic));
        }
    }

    if let Some(project) = persisted {
        out.push_str(&format!(
            "\npersisted as project {} ({} items, stored total {})\n",
            project.project_id, project.stored_items, project.stored_total
        ));
    }
    out
}
