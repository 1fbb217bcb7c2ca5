//! Extended-dialect (FIEBDC-3) parser
//!
//! Each record starts with a two-character tag followed by a
//! `|`-separated payload:
//!
//! - `~V` version, kept as metadata only
//! - `~K` chapter `code|name`
//! - `~C` item `code|name|unit`
//! - `~R` resource `code|name|unit|cost`
//! - `~D` breakdown `item_code|resource_code|coeff`
//!
//! Parsing is tolerant: a malformed record becomes a [`ParseDiagnostic`]
//! and is dropped, and the parse always runs to the end of the input.
//! Breakdown lines may only reference items and resources declared on an
//! earlier line.

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use ofitec_models::{DiagnosticKind, ParseDiagnostic};

use crate::numeric::parse_decimal;

pub const TAG_VERSION: &str = "~V";
pub const TAG_CHAPTER: &str = "~K";
pub const TAG_ITEM: &str = "~C";
pub const TAG_RESOURCE: &str = "~R";
pub const TAG_BREAKDOWN: &str = "~D";

const FIELD_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedChapter {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedItem {
    pub code: String,
    pub name: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedResource {
    pub code: String,
    pub name: String,
    pub unit: String,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedBreakdown {
    pub line: usize,
    pub item_code: String,
    pub resource_code: String,
    pub coeff: Decimal,
}

/// Parse tree of an extended-dialect document.
///
/// `resources` is keyed by code: a redeclared code keeps its first position
/// but takes the attributes of the last declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedDocument {
    pub format_version: Option<String>,
    pub chapters: Vec<ExtendedChapter>,
    pub items: Vec<ExtendedItem>,
    pub resources: Vec<ExtendedResource>,
    pub breakdown: Vec<ExtendedBreakdown>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ExtendedDocument {
    pub fn resource(&self, code: &str) -> Option<&ExtendedResource> {
        self.resources.iter().find(|r| r.code == code)
    }

    pub fn item(&self, code: &str) -> Option<&ExtendedItem> {
        self.items.iter().find(|i| i.code == code)
    }

    /// Render the document back to extended-dialect text: version, chapters,
    /// resources, items, then breakdown lines, so every reference follows
    /// its declaration.
    ///
    /// Values are written verbatim. The format has no escape for `|`, so a
    /// name or unit containing one reparses as extra fields.
    pub fn to_bc3(&self) -> String {
        let mut out = String::new();
        if let Some(version) = &self.format_version {
            out.push_str(&format!("{}{}{}\n", TAG_VERSION, FIELD_SEPARATOR, version));
        }
        for chapter in &self.chapters {
            out.push_str(&format!("{}{}|{}\n", TAG_CHAPTER, chapter.code, chapter.name));
        }
        for resource in &self.resources {
            out.push_str(&format!(
                "{}{}|{}|{}|{}\n",
                TAG_RESOURCE, resource.code, resource.name, resource.unit, resource.unit_cost
            ));
        }
        for item in &self.items {
            out.push_str(&format!("{}{}|{}|{}\n", TAG_ITEM, item.code, item.name, item.unit));
        }
        for line in &self.breakdown {
            out.push_str(&format!(
                "{}{}|{}|{}\n",
                TAG_BREAKDOWN, line.item_code, line.resource_code, line.coeff
            ));
        }
        out
    }
}

/// Per-parse registries, discarded once the document is built.
#[derive(Default)]
struct ExtendedBuilder {
    doc: ExtendedDocument,
    chapter_codes: HashSet<String>,
    item_index: HashMap<String, usize>,
    resource_index: HashMap<String, usize>,
}

impl ExtendedBuilder {
    fn diagnose(&mut self, line: usize, tag: &str, kind: DiagnosticKind, message: String) {
        tracing::warn!(line, tag, ?kind, "{}", message);
        self.doc
            .diagnostics
            .push(ParseDiagnostic::new(line, tag, kind, message));
    }

    fn chapter(&mut self, line: usize, fields: &[&str]) {
        let code = fields[0];
        if code.is_empty() {
            return self.diagnose(line, TAG_CHAPTER, DiagnosticKind::IncompleteRecord, "Chapter without code".into());
        }
        if self.chapter_codes.contains(code) {
            return self.diagnose(
                line,
                TAG_CHAPTER,
                DiagnosticKind::DuplicateChapter,
                format!("Duplicate chapter {}", code),
            );
        }
        self.chapter_codes.insert(code.to_string());
        self.doc.chapters.push(ExtendedChapter {
            code: code.to_string(),
            name: fields.get(1).copied().unwrap_or_default().to_string(),
        });
    }

    fn item(&mut self, line: usize, fields: &[&str]) {
        if fields.len() < 3 || fields[0].is_empty() {
            return self.diagnose(line, TAG_ITEM, DiagnosticKind::IncompleteRecord, "Incomplete item".into());
        }
        let code = fields[0];
        if self.item_index.contains_key(code) {
            return self.diagnose(
                line,
                TAG_ITEM,
                DiagnosticKind::DuplicateItem,
                format!("Duplicate item {}", code),
            );
        }
        self.item_index.insert(code.to_string(), self.doc.items.len());
        self.doc.items.push(ExtendedItem {
            code: code.to_string(),
            name: fields[1].to_string(),
            unit: fields[2].to_string(),
        });
    }

    fn resource(&mut self, line: usize, fields: &[&str]) {
        if fields.len() < 4 || fields[0].is_empty() {
            return self.diagnose(line, TAG_RESOURCE, DiagnosticKind::IncompleteRecord, "Incomplete resource".into());
        }
        let code = fields[0];
        let unit_cost = match parse_decimal(fields[3]) {
            Ok(cost) => cost,
            Err(_) => {
                self.diagnose(
                    line,
                    TAG_RESOURCE,
                    DiagnosticKind::InvalidNumber,
                    format!("Invalid cost '{}' for resource {}, using 0", fields[3], code),
                );
                Decimal::ZERO
            }
        };
        let resource = ExtendedResource {
            code: code.to_string(),
            name: fields[1].to_string(),
            unit: fields[2].to_string(),
            unit_cost,
        };
        match self.resource_index.get(code) {
            Some(&idx) => {
                tracing::debug!(line, resource = %code, "Resource redeclared, last declaration wins");
                self.doc.resources[idx] = resource;
            }
            None => {
                self.resource_index.insert(code.to_string(), self.doc.resources.len());
                self.doc.resources.push(resource);
            }
        }
    }

    fn breakdown(&mut self, line: usize, fields: &[&str]) {
        if fields.len() < 3 {
            return self.diagnose(line, TAG_BREAKDOWN, DiagnosticKind::IncompleteRecord, "Incomplete breakdown line".into());
        }
        let (item_code, resource_code) = (fields[0], fields[1]);
        let coeff = match parse_decimal(fields[2]) {
            Ok(coeff) => coeff,
            Err(_) => {
                return self.diagnose(
                    line,
                    TAG_BREAKDOWN,
                    DiagnosticKind::InvalidNumber,
                    format!("Invalid coefficient '{}' for {}-{}", fields[2], item_code, resource_code),
                );
            }
        };
        if !self.item_index.contains_key(item_code) {
            return self.diagnose(
                line,
                TAG_BREAKDOWN,
                DiagnosticKind::UndefinedItem,
                format!("Breakdown references undefined item {}", item_code),
            );
        }
        if !self.resource_index.contains_key(resource_code) {
            return self.diagnose(
                line,
                TAG_BREAKDOWN,
                DiagnosticKind::UndefinedResource,
                format!("Breakdown references undefined resource {}", resource_code),
            );
        }
        self.doc.breakdown.push(ExtendedBreakdown {
            line,
            item_code: item_code.to_string(),
            resource_code: resource_code.to_string(),
            coeff,
        });
    }
}

/// Split a record into its two-character tag and payload.
fn split_tag(line: &str) -> (&str, &str) {
    let at = line.char_indices().nth(2).map(|(i, _)| i).unwrap_or(line.len());
    line.split_at(at)
}

/// Parse an extended-dialect document. Never fails: anomalies are collected
/// in [`ExtendedDocument::diagnostics`].
pub fn parse_extended(text: &str) -> ExtendedDocument {
    let mut builder = ExtendedBuilder::default();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if !line.starts_with('~') {
            continue;
        }

        let (tag, payload) = split_tag(line);
        let fields: Vec<&str> = payload.split(FIELD_SEPARATOR).map(str::trim).collect();

        match tag {
            TAG_VERSION => builder.doc.format_version = Some(payload.trim_start_matches(FIELD_SEPARATOR).to_string()),
            TAG_CHAPTER => builder.chapter(line_no, &fields),
            TAG_ITEM => builder.item(line_no, &fields),
            TAG_RESOURCE => builder.resource(line_no, &fields),
            TAG_BREAKDOWN => builder.breakdown(line_no, &fields),
            _ => {}
        }
    }

    builder.doc
}
