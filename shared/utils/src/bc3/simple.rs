//! Simple-dialect parser
//!
//! Semicolon-delimited records, one per line:
//!
//! ```text
//! C;CHAPTER_CODE;CHAPTER_NAME
//! I;CHAPTER_CODE;ITEM_CODE;ITEM_NAME;UNIT;QUANTITY
//! R;ITEM_CODE;RESOURCE_TYPE;RESOURCE_CODE;RESOURCE_NAME;COEFF;UNIT_COST
//! ```
//!
//! Blank lines and `#` comments are skipped, unknown tags are ignored.
//! Any malformed `C`/`I`/`R` record aborts the whole parse.

use rust_decimal::Decimal;
use std::collections::HashMap;

use ofitec_models::{DEFAULT_ITEM_UNIT, UNASSIGNED_CHAPTER_CODE};

use crate::error::ImportError;
use crate::numeric::parse_decimal_or_zero;

const FIELD_SEPARATOR: char = ';';
const COMMENT_PREFIX: char = '#';

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleChapter {
    pub code: String,
    pub name: String,
}

/// One `R` record: a resource used by an item, with its own unit cost.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleBreakdown {
    pub resource_type: String,
    pub resource_code: String,
    pub resource_name: String,
    pub coeff: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleItem {
    pub chapter_code: String,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub breakdown: Vec<SimpleBreakdown>,
}

/// Parse tree of a simple-dialect document. Chapters and items are in
/// first-declaration order and every item's chapter is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleDocument {
    pub chapters: Vec<SimpleChapter>,
    pub items: Vec<SimpleItem>,
}

impl SimpleDocument {
    pub fn chapter(&self, code: &str) -> Option<&SimpleChapter> {
        self.chapters.iter().find(|c| c.code == code)
    }

    pub fn item(&self, code: &str) -> Option<&SimpleItem> {
        self.items.iter().find(|i| i.code == code)
    }
}

/// Per-parse registries, discarded once the document is built.
#[derive(Default)]
struct SimpleBuilder {
    chapters: Vec<SimpleChapter>,
    chapter_index: HashMap<String, usize>,
    items: Vec<SimpleItem>,
    item_index: HashMap<String, usize>,
}

impl SimpleBuilder {
    /// Declare a chapter; re-declaring a code renames it.
    fn declare_chapter(&mut self, code: &str, name: &str) {
        match self.chapter_index.get(code) {
            Some(&idx) => self.chapters[idx].name = name.to_string(),
            None => self.push_chapter(code, name),
        }
    }

    /// Reference a chapter, creating it named after its code if unknown.
    fn ensure_chapter(&mut self, code: &str) {
        if !self.chapter_index.contains_key(code) {
            self.push_chapter(code, code);
        }
    }

    fn push_chapter(&mut self, code: &str, name: &str) {
        self.chapter_index.insert(code.to_string(), self.chapters.len());
        self.chapters.push(SimpleChapter {
            code: code.to_string(),
            name: name.to_string(),
        });
    }

    /// Register an item. The first registration of a code is kept.
    fn register_item(&mut self, item: SimpleItem) {
        self.ensure_chapter(&item.chapter_code);
        if self.item_index.contains_key(&item.code) {
            tracing::debug!(item = %item.code, "Item already registered, keeping first");
            return;
        }
        self.item_index.insert(item.code.clone(), self.items.len());
        self.items.push(item);
    }

    /// Index of the item, synthesising a ghost under `UNASSIGNED` if needed.
    fn item_or_ghost(&mut self, code: &str) -> usize {
        if let Some(&idx) = self.item_index.get(code) {
            return idx;
        }
        tracing::debug!(item = %code, "Breakdown references unknown item, creating ghost item");
        self.ensure_chapter(UNASSIGNED_CHAPTER_CODE);
        let idx = self.items.len();
        self.item_index.insert(code.to_string(), idx);
        self.items.push(SimpleItem {
            chapter_code: UNASSIGNED_CHAPTER_CODE.to_string(),
            code: code.to_string(),
            name: code.to_string(),
            unit: DEFAULT_ITEM_UNIT.to_string(),
            quantity: Decimal::ZERO,
            breakdown: Vec::new(),
        });
        idx
    }

    fn finish(self) -> SimpleDocument {
        SimpleDocument {
            chapters: self.chapters,
            items: self.items,
        }
    }
}

/// Parse a simple-dialect document, failing on the first malformed record.
pub fn parse_simple(text: &str) -> Result<SimpleDocument, ImportError> {
    let mut builder = SimpleBuilder::default();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
        let tag = fields[0].to_ascii_uppercase();

        match tag.as_str() {
            "C" => {
                expect_fields(&fields, 3, line_no, "C")?;
                builder.declare_chapter(fields[1], fields[2]);
            }
            "I" => {
                expect_fields(&fields, 6, line_no, "I")?;
                let unit = if fields[4].is_empty() { DEFAULT_ITEM_UNIT } else { fields[4] };
                builder.register_item(SimpleItem {
                    chapter_code: fields[1].to_string(),
                    code: fields[2].to_string(),
                    name: fields[3].to_string(),
                    unit: unit.to_string(),
                    quantity: numeric_field(fields[5], line_no, "quantity")?,
                    breakdown: Vec::new(),
                });
            }
            "R" => {
                expect_fields(&fields, 7, line_no, "R")?;
                let breakdown = SimpleBreakdown {
                    resource_type: fields[2].to_string(),
                    resource_code: fields[3].to_string(),
                    resource_name: fields[4].to_string(),
                    coeff: numeric_field(fields[5], line_no, "coeff")?,
                    unit_cost: numeric_field(fields[6], line_no, "unit_cost")?,
                };
                let item = builder.item_or_ghost(fields[1]);
                builder.items[item].breakdown.push(breakdown);
            }
            _ => {
                tracing::debug!(line = line_no, tag = %fields[0], "Skipping unknown simple-dialect tag");
            }
        }
    }

    Ok(builder.finish())
}

fn expect_fields(fields: &[&str], expected: usize, line: usize, tag: &str) -> Result<(), ImportError> {
    if fields.len() == expected {
        Ok(())
    } else {
        Err(ImportError::structural(
            line,
            format!("{} record expects {} fields, found {}", tag, expected, fields.len()),
        ))
    }
}

fn numeric_field(value: &str, line: usize, field: &str) -> Result<Decimal, ImportError> {
    parse_decimal_or_zero(value).map_err(|_| ImportError::numeric_format(line, field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const SAMPLE: &str = "# Demo BC3
C;C1;Capitulo 1
I;C1;IT1;Item 1;m2;5
R;IT1;MAT;R1;Res 1;2;10
R;IT1;MO;R2;Res 2;0.5;40
";

    #[test]
    fn test_parses_sample_document() {
        let doc = parse_simple(SAMPLE).unwrap();
        assert_eq!(doc.chapters, vec![SimpleChapter { code: "C1".into(), name: "Capitulo 1".into() }]);
        assert_eq!(doc.items.len(), 1);

        let item = &doc.items[0];
        assert_eq!(item.chapter_code, "C1");
        assert_eq!(item.quantity, dec("5"));
        assert_eq!(item.breakdown.len(), 2);
        assert_eq!(item.breakdown[1].resource_type, "MO");
        assert_eq!(item.breakdown[1].coeff, dec("0.5"));
        assert_eq!(item.breakdown[1].unit_cost, dec("40"));
    }

    #[test]
    fn test_missing_quantity_is_fatal() {
        let err = parse_simple("C;C1;Cap\nI;C1;IT1;Item;m2\n").unwrap_err();
        assert_eq!(err, ImportError::structural(2, "I record expects 6 fields, found 5"));
        assert!(err.is_parse_failure());
    }

    #[test]
    fn test_extra_field_is_fatal() {
        let err = parse_simple("C;C1;Cap;extra\n").unwrap_err();
        assert!(matches!(err, ImportError::Structural { line: 1, .. }));
    }

    #[test]
    fn test_bad_number_is_fatal() {
        let err = parse_simple("I;C1;IT1;Item;m2;5\nR;IT1;MAT;R1;Res;dos;10\n").unwrap_err();
        assert_eq!(err, ImportError::numeric_format(2, "coeff", "dos"));
    }

    #[test]
    fn test_first_bad_line_aborts_even_after_good_lines() {
        let source = format!("{}R;IT1;MAT;R3;Res 3;1\n", SAMPLE);
        assert!(matches!(parse_simple(&source), Err(ImportError::Structural { line: 6, .. })));
    }

    #[test]
    fn test_item_auto_creates_chapter_named_after_code() {
        let doc = parse_simple("I;C9;IT1;Item;m2;1\n").unwrap();
        assert_eq!(doc.chapter("C9").map(|c| c.name.as_str()), Some("C9"));
    }

    #[test]
    fn test_chapter_redeclaration_last_name_wins() {
        let doc = parse_simple("C;C1;First\nC;C1;Second\n").unwrap();
        assert_eq!(doc.chapters.len(), 1);
        assert_eq!(doc.chapters[0].name, "Second");
    }

    #[test]
    fn test_unknown_item_creates_ghost() {
        let doc = parse_simple("R;IT9;MAT;R1;Res 1;2;10\n").unwrap();
        let ghost = doc.item("IT9").unwrap();
        assert_eq!(ghost.chapter_code, "UNASSIGNED");
        assert_eq!(ghost.quantity, Decimal::ZERO);
        assert_eq!(ghost.unit, "m2");
        assert_eq!(ghost.breakdown.len(), 1);
        assert!(doc.chapter("UNASSIGNED").is_some());
    }

    #[test]
    fn test_ghost_keeps_first_registration() {
        let doc = parse_simple("R;IT1;MAT;R1;Res 1;2;10\nI;C1;IT1;Item 1;m2;5\n").unwrap();
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].chapter_code, "UNASSIGNED");
        assert!(doc.chapter("C1").is_some());
    }

    #[test]
    fn test_resources_are_not_deduplicated() {
        let doc = parse_simple("I;C1;IT1;Item;m2;1\nR;IT1;MAT;R1;Res;1;10\nR;IT1;MAT;R1;Res;1;12\n").unwrap();
        let costs: Vec<_> = doc.items[0].breakdown.iter().map(|b| b.unit_cost).collect();
        assert_eq!(costs, vec![dec("10"), dec("12")]);
    }

    #[test]
    fn test_tags_are_case_insensitive_and_blanks_default() {
        let doc = parse_simple("c;C1;Cap\ni;C1;IT1;Item;;\nr;IT1;MAT;R1;Res;;\n").unwrap();
        let item = &doc.items[0];
        assert_eq!(item.unit, "m2");
        assert_eq!(item.quantity, Decimal::ZERO);
        assert_eq!(item.breakdown[0].coeff, Decimal::ZERO);
    }

    #[test]
    fn test_comma_decimal_and_unknown_tags() {
        let doc = parse_simple("X;whatever\nI;C1;IT1;Item;m3;2,5\n").unwrap();
        assert_eq!(doc.items[0].quantity, dec("2.5"));
    }
}
