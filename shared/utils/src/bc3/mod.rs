//! BC3 (FIEBDC-3) Import Module
//!
//! Converts bill-of-quantities documents into a priced budget graph.
//! Two incompatible dialects are supported: a semicolon-delimited simple
//! dialect and the `~`-tagged extended dialect.
//!
//! Orchestrator -> Detector -> {Simple | Extended} parser -> Assembler.

pub mod assembler;
pub mod chapters;
pub mod detector;
pub mod extended;
pub mod importer;
pub mod simple;

use ofitec_models::Dialect;

pub use assembler::assemble;
pub use chapters::{infer_chapter, ChapterResolution};
pub use detector::{decode, detect, detect_within, DEFAULT_DETECTION_WINDOW};
pub use extended::{parse_extended, ExtendedDocument};
pub use importer::BudgetImporter;
pub use simple::{parse_simple, SimpleDocument};

/// Output of either dialect parser, ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    Simple(SimpleDocument),
    Extended(ExtendedDocument),
}

impl ParsedDocument {
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Simple(_) => Dialect::Simple,
            Self::Extended(_) => Dialect::Extended,
        }
    }

    pub fn item_count(&self) -> usize {
        match self {
            Self::Simple(doc) => doc.items.len(),
            Self::Extended(doc) => doc.items.len(),
        }
    }
}
