//! Cost-breakdown entities for the Ofitec budgeting system.
//!
//! Entities live in flat arenas owned by an [`crate::ImportResult`] and refer
//! to each other through the typed indices below, so a breakdown line can
//! point at a resource even when several resources share a code.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chapter code that receives extended-dialect items no declared chapter claims.
pub const FALLBACK_CHAPTER_CODE: &str = "GENERAL";

/// Chapter code that receives simple-dialect items referenced before declaration.
pub const UNASSIGNED_CHAPTER_CODE: &str = "UNASSIGNED";

/// Unit applied to simple-dialect items declared without one.
pub const DEFAULT_ITEM_UNIT: &str = "m2";

/// Unit applied to resources and extended items declared without one.
pub const DEFAULT_RESOURCE_UNIT: &str = "u";

/// Classification given to resources from the extended dialect, which has no type field.
pub const GENERIC_RESOURCE_TYPE: &str = "GEN";

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_id!(ChapterId);
arena_id!(ItemId);
arena_id!(ResourceId);

/// A named grouping of budget items, keyed by `code` within one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: ChapterId,
    pub code: String,
    pub name: String,
}

/// A priced line of work. `price` is the unit price computed from the
/// item's breakdown lines, always carried with two fractional digits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub chapter_id: ChapterId,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl Item {
    /// Extended cost of the item: `quantity * price`, or `None` when the
    /// product leaves the decimal range.
    pub fn amount(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.price)
    }
}

/// A priced input (labor, material, equipment) consumed by items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub unit_cost: Decimal,
}

/// An APU line: `coeff` units of `resource_id` consumed per unit of `item_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakdownLine {
    pub item_id: ItemId,
    pub resource_id: ResourceId,
    pub coeff: Decimal,
}
