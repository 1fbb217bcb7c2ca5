//! # Ofitec Budget Domain Models
//!
//! Core data model for imported bills of quantities.
//!
//! ## Key Models
//!
//! - **Chapter**: a named grouping of items (a cost-code section)
//! - **Item**: a priced line of work with a quantity and unit
//! - **Resource**: a priced input (labor, material, equipment)
//! - **BreakdownLine**: an APU line, a coefficient of one resource per unit of one item
//! - **ImportResult**: the finished graph of one import plus its parse diagnostics
//!
//! Monetary values are exact `rust_decimal::Decimal`s and serialise as strings.

pub mod budget;
pub mod import;


pub use budget::*;
pub use import::*;

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    pub fn item(id: usize, chapter: usize, code: &str, quantity: Decimal, price: Decimal) -> Item {
        Item {
            id: ItemId(id),
            chapter_id: ChapterId(chapter),
            code: code.to_string(),
            name: format!("Item {}", code),
            unit: DEFAULT_ITEM_UNIT.to_string(),
            quantity,
            price,
        }
    }

    pub fn result_with(chapters: &[&str], items: Vec<Item>) -> ImportResult {
        ImportResult {
            id: Uuid::new_v4(),
            source_name: "fixture.bc3".to_string(),
            dialect: Dialect::Simple,
            format_version: None,
            imported_at: Utc::now(),
            chapters: chapters
                .iter()
                .enumerate()
                .map(|(i, code)| Chapter {
                    id: ChapterId(i),
                    code: code.to_string(),
                    name: format!("Chapter {}", code),
                })
                .collect(),
            items,
            resources: Vec::new(),
            breakdown: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}
