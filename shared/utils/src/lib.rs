pub mod config;
pub mod logging;
pub mod error;
pub mod numeric;
pub mod bc3;

pub use config::*;
pub use logging::*;
pub use error::*;
pub use numeric::*;
pub use bc3::{BudgetImporter, ParsedDocument};
