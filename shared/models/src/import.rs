//! Import results: the finished budget graph, its diagnostics and the
//! read-only views derived from it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::budget::{BreakdownLine, Chapter, ChapterId, Item, ItemId, Resource, ResourceId};

/// The two incompatible line-tag grammars of the BC3 family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `;`-separated `C`/`I`/`R` records, UTF-8.
    Simple,
    /// `~`-tagged FIEBDC-3 records with `|`-separated payloads, ISO-8859-1.
    Extended,
}

impl Dialect {
    /// Text encoding documents of this dialect are decoded with.
    pub fn encoding(self) -> &'static str {
        match self {
            Self::Simple => "UTF-8",
            Self::Extended => "ISO-8859-1",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => f.write_str("simple"),
            Self::Extended => f.write_str("extended"),
        }
    }
}

/// Category of a tolerated anomaly in an extended-dialect document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    DuplicateChapter,
    DuplicateItem,
    IncompleteRecord,
    InvalidNumber,
    UndefinedItem,
    UndefinedResource,
}

/// One anomalous source line that was skipped or repaired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseDiagnostic {
    pub line: usize,
    pub tag: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl ParseDiagnostic {
    pub fn new(line: usize, tag: &str, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            line,
            tag: tag.to_string(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} [{}]: {}", self.line, self.tag, self.message)
    }
}

/// The outcome of one successful import: a self-contained budget graph.
///
/// Every item references a chapter in `chapters`, every breakdown line
/// references an item in `items` and a resource in `resources`, and ids are
/// positions in their respective vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub id: Uuid,
    pub source_name: String,
    pub dialect: Dialect,
    /// Payload of the extended dialect's `~V` record, when present.
    pub format_version: Option<String>,
    pub imported_at: DateTime<Utc>,
    pub chapters: Vec<Chapter>,
    pub items: Vec<Item>,
    pub resources: Vec<Resource>,
    pub breakdown: Vec<BreakdownLine>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ImportResult {
    pub fn chapter(&self, id: ChapterId) -> Option<&Chapter> {
        self.chapters.get(id.index())
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index())
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    pub fn chapter_by_code(&self, code: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.code == code)
    }

    pub fn item_by_code(&self, code: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.code == code)
    }

    /// Resources carrying `code`. The simple dialect may materialise several.
    pub fn resources_by_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources.iter().filter(move |r| r.code == code)
    }

    /// Breakdown lines attached to an item, in document order.
    pub fn breakdown_for(&self, item_id: ItemId) -> impl Iterator<Item = &BreakdownLine> + '_ {
        self.breakdown.iter().filter(move |l| l.item_id == item_id)
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Chapters with their items, both in creation order.
    pub fn tree(&self) -> BudgetTree {
        let chapters = self
            .chapters
            .iter()
            .map(|chapter| ChapterNode {
                code: chapter.code.clone(),
                name: chapter.name.clone(),
                items: self
                    .items
                    .iter()
                    .filter(|item| item.chapter_id == chapter.id)
                    .map(|item| ItemNode {
                        code: item.code.clone(),
                        name: item.name.clone(),
                        unit: item.unit.clone(),
                        quantity: item.quantity,
                        price: item.price,
                    })
                    .collect(),
            })
            .collect();

        BudgetTree {
            import_id: self.id,
            chapters,
        }
    }

    /// Aggregate counts and totals over the whole graph.
    pub fn summary(&self) -> BudgetSummary {
        let total_quantity = self
            .items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.quantity));
        let total_cost = self
            .items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.amount()?));

        BudgetSummary {
            import_id: self.id,
            dialect: self.dialect,
            total_chapters: self.chapters.len(),
            total_items: self.items.len(),
            total_resources: self.resources.len(),
            total_breakdown_lines: self.breakdown.len(),
            total_diagnostics: self.diagnostics.len(),
            total_quantity,
            total_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetTree {
    pub import_id: Uuid,
    pub chapters: Vec<ChapterNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterNode {
    pub code: String,
    pub name: String,
    pub items: Vec<ItemNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemNode {
    pub code: String,
    pub name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetSummary {
    pub import_id: Uuid,
    pub dialect: Dialect,
    pub total_chapters: usize,
    pub total_items: usize,
    pub total_resources: usize,
    pub total_breakdown_lines: usize,
    pub total_diagnostics: usize,
    /// Sum of item quantities; `None` if it overflows.
    pub total_quantity: Option<Decimal>,
    /// Sum of `quantity * price` over all items; `None` if any product or
    /// the sum overflows.
    pub total_cost: Option<Decimal>,
}
