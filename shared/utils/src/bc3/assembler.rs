//! Budget Assembler
//!
//! Turns a dialect parse tree into the finished budget graph: resolves
//! chapters, materialises resources, links breakdown lines, and prices
//! every item.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use ofitec_models::{
    BreakdownLine, Chapter, ChapterId, Dialect, ImportResult, Item, ItemId, ParseDiagnostic, Resource, ResourceId,
    DEFAULT_RESOURCE_UNIT, FALLBACK_CHAPTER_CODE, GENERIC_RESOURCE_TYPE,
};

use super::chapters::{infer_chapter, ChapterResolution};
use super::extended::ExtendedDocument;
use super::simple::SimpleDocument;
use super::ParsedDocument;
use crate::error::ImportError;
use crate::numeric::compute_price;

/// Arena for one import's graph; ids are positions in the vectors.
#[derive(Default)]
struct GraphBuilder {
    chapters: Vec<Chapter>,
    chapter_index: HashMap<String, ChapterId>,
    items: Vec<Item>,
    resources: Vec<Resource>,
    breakdown: Vec<BreakdownLine>,
}

impl GraphBuilder {
    fn add_chapter(&mut self, code: &str, name: &str) -> ChapterId {
        if let Some(&id) = self.chapter_index.get(code) {
            return id;
        }
        let id = ChapterId(self.chapters.len());
        self.chapter_index.insert(code.to_string(), id);
        self.chapters.push(Chapter {
            id,
            code: code.to_string(),
            name: or_code(name, code),
        });
        id
    }

    fn add_item(&mut self, chapter_id: ChapterId, code: &str, name: &str, unit: &str, quantity: Decimal) -> ItemId {
        let id = ItemId(self.items.len());
        self.items.push(Item {
            id,
            chapter_id,
            code: code.to_string(),
            name: or_code(name, code),
            unit: unit.to_string(),
            quantity,
            price: Decimal::ZERO,
        });
        id
    }

    fn add_resource(&mut self, resource_type: &str, code: &str, name: &str, unit: &str, unit_cost: Decimal) -> ResourceId {
        let id = ResourceId(self.resources.len());
        self.resources.push(Resource {
            id,
            resource_type: resource_type.to_string(),
            code: code.to_string(),
            name: or_code(name, code),
            unit: unit.to_string(),
            unit_cost,
        });
        id
    }

    fn add_line(&mut self, item_id: ItemId, resource_id: ResourceId, coeff: Decimal) {
        self.breakdown.push(BreakdownLine {
            item_id,
            resource_id,
            coeff,
        });
    }

    /// Set every item's price from its breakdown lines.
    fn price_items(&mut self) -> Result<(), ImportError> {
        let mut lines_by_item: Vec<Vec<(Decimal, Decimal)>> = vec![Vec::new(); self.items.len()];
        for line in &self.breakdown {
            let unit_cost = self.resources[line.resource_id.index()].unit_cost;
            lines_by_item[line.item_id.index()].push((line.coeff, unit_cost));
        }

        for (item, lines) in self.items.iter_mut().zip(lines_by_item) {
            item.price = compute_price(lines).map_err(|_| ImportError::PriceOverflow {
                item_code: item.code.clone(),
            })?;
        }
        Ok(())
    }

    fn finish(
        self,
        source_name: &str,
        dialect: Dialect,
        format_version: Option<String>,
        diagnostics: Vec<ParseDiagnostic>,
    ) -> ImportResult {
        ImportResult {
            id: Uuid::new_v4(),
            source_name: source_name.to_string(),
            dialect,
            format_version,
            imported_at: Utc::now(),
            chapters: self.chapters,
            items: self.items,
            resources: self.resources,
            breakdown: self.breakdown,
            diagnostics,
        }
    }
}

fn or_code(value: &str, code: &str) -> String {
    if value.is_empty() {
        code.to_string()
    } else {
        value.to_string()
    }
}

fn or_default_unit(unit: &str) -> &str {
    if unit.is_empty() {
        DEFAULT_RESOURCE_UNIT
    } else {
        unit
    }
}

/// Assemble and price a parsed document.
///
/// Fails with [`ImportError::EmptyBudget`] when no item survived parsing.
pub fn assemble(parsed: ParsedDocument, source_name: &str) -> Result<ImportResult, ImportError> {
    let dialect = parsed.dialect();
    if parsed.item_count() == 0 {
        return Err(ImportError::EmptyBudget { dialect });
    }

    let result = match parsed {
        ParsedDocument::Simple(doc) => assemble_simple(doc, source_name)?,
        ParsedDocument::Extended(doc) => assemble_extended(doc, source_name)?,
    };

    tracing::info!(
        dialect = %result.dialect,
        chapters = result.chapters.len(),
        items = result.items.len(),
        resources = result.resources.len(),
        breakdown_lines = result.breakdown.len(),
        diagnostics = result.diagnostics.len(),
        "Budget assembled"
    );
    Ok(result)
}

/// Chapters and items are already attached by the parser; every `R` record
/// becomes its own resource.
fn assemble_simple(doc: SimpleDocument, source_name: &str) -> Result<ImportResult, ImportError> {
    let mut graph = GraphBuilder::default();

    for chapter in &doc.chapters {
        graph.add_chapter(&chapter.code, &chapter.name);
    }

    for item in &doc.items {
        let chapter_id = graph.add_chapter(&item.chapter_code, &item.chapter_code);
        let item_id = graph.add_item(chapter_id, &item.code, &item.name, &item.unit, item.quantity);
        for line in &item.breakdown {
            let resource_id = graph.add_resource(
                &line.resource_type,
                &line.resource_code,
                &line.resource_name,
                DEFAULT_RESOURCE_UNIT,
                line.unit_cost,
            );
            graph.add_line(item_id, resource_id, line.coeff);
        }
    }

    graph.price_items()?;
    Ok(graph.finish(source_name, Dialect::Simple, None, Vec::new()))
}

/// Declared chapters plus the fallback chapter; items placed by
/// [`infer_chapter`]; resources taken from the last-wins mapping.
fn assemble_extended(doc: ExtendedDocument, source_name: &str) -> Result<ImportResult, ImportError> {
    let mut graph = GraphBuilder::default();

    for chapter in &doc.chapters {
        graph.add_chapter(&chapter.code, &chapter.name);
    }
    graph.add_chapter(FALLBACK_CHAPTER_CODE, FALLBACK_CHAPTER_CODE);

    let declared: HashSet<&str> = doc.chapters.iter().map(|c| c.code.as_str()).collect();

    let mut resource_ids: HashMap<&str, ResourceId> = HashMap::new();
    for resource in &doc.resources {
        let id = graph.add_resource(
            GENERIC_RESOURCE_TYPE,
            &resource.code,
            &resource.name,
            or_default_unit(&resource.unit),
            resource.unit_cost,
        );
        resource_ids.insert(resource.code.as_str(), id);
    }

    let mut item_ids: HashMap<&str, ItemId> = HashMap::new();
    for item in &doc.items {
        let resolution = infer_chapter(&item.code, |code| declared.contains(code));
        if resolution == ChapterResolution::Fallback {
            tracing::debug!(item = %item.code, "No chapter matches item, using {}", FALLBACK_CHAPTER_CODE);
        } else {
            tracing::debug!(item = %item.code, chapter = %resolution.code(), ?resolution, "Chapter inferred");
        }
        let chapter_id = graph.add_chapter(resolution.code(), resolution.code());
        let id = graph.add_item(chapter_id, &item.code, &item.name, or_default_unit(&item.unit), Decimal::ZERO);
        item_ids.insert(item.code.as_str(), id);
    }

    for line in &doc.breakdown {
        match (item_ids.get(line.item_code.as_str()), resource_ids.get(line.resource_code.as_str())) {
            (Some(&item_id), Some(&resource_id)) => graph.add_line(item_id, resource_id, line.coeff),
            _ => tracing::debug!(
                line = line.line,
                item = %line.item_code,
                resource = %line.resource_code,
                "Skipping breakdown line with unresolved reference"
            ),
        }
    }

    graph.price_items()?;
    Ok(graph.finish(source_name, Dialect::Extended, doc.format_version, doc.diagnostics))
}
