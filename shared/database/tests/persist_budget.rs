//! Writer walk over imported budgets, using the in-memory writer.

use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use ofitec_database::{persist_budget, BudgetWriter, InMemoryBudgetWriter, WriteCall};
use ofitec_models::{ImportResult, Item, Resource};
use ofitec_utils::BudgetImporter;

const EXTENDED: &[u8] = b"~K1|Obra gruesa
~RR1|Cemento|kg|10
~RR2|Arena|m3|4
~RR1|Cemento|kg|12
~C1.1|Radier|m2
~CX|Varios|gl
~D1.1|R1|2
~D1.1|R2|0,5
";

fn import(bytes: &[u8]) -> ImportResult {
    BudgetImporter::default().import_bytes("fixture.bc3", bytes).unwrap()
}

fn position(calls: &[WriteCall], pred: impl Fn(&WriteCall) -> bool) -> Vec<usize> {
    calls.iter().enumerate().filter(|(_, c)| pred(c)).map(|(i, _)| i).collect()
}

#[tokio::test]
async fn test_one_call_per_entity() {
    let result = import(EXTENDED);
    let mut writer = InMemoryBudgetWriter::new();
    persist_budget(&mut writer, "Edificio", "CLP", &result).await.unwrap();

    let calls = &writer.calls;
    assert_eq!(position(calls, |c| matches!(c, WriteCall::Project { .. })).len(), 1);
    assert_eq!(position(calls, |c| matches!(c, WriteCall::Chapter { .. })).len(), result.chapters.len());
    assert_eq!(position(calls, |c| matches!(c, WriteCall::Resource { .. })).len(), 2);
    assert_eq!(position(calls, |c| matches!(c, WriteCall::Item { .. })).len(), 2);
    assert_eq!(position(calls, |c| matches!(c, WriteCall::BreakdownLine { .. })).len(), 2);
    assert_eq!(position(calls, |c| matches!(c, WriteCall::ItemPrice { .. })).len(), 2);
}

#[tokio::test]
async fn test_dependency_order() {
    let result = import(EXTENDED);
    let mut writer = InMemoryBudgetWriter::new();
    persist_budget(&mut writer, "Edificio", "CLP", &result).await.unwrap();

    let rank = |call: &WriteCall| match call {
        WriteCall::Project { .. } => 0,
        WriteCall::Chapter { .. } => 1,
        WriteCall::Resource { .. } => 2,
        WriteCall::Item { .. } => 3,
        WriteCall::BreakdownLine { .. } => 4,
        WriteCall::ItemPrice { .. } => 5,
    };
    let ranks: Vec<_> = writer.calls.iter().map(rank).collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "{:?}", ranks);
}

#[tokio::test]
async fn test_deduplicated_resource_and_prices_reach_writer() {
    let result = import(EXTENDED);
    let mut writer = InMemoryBudgetWriter::new();
    persist_budget(&mut writer, "Edificio", "CLP", &result).await.unwrap();

    let cement: Vec<_> = writer
        .calls
        .iter()
        .filter_map(|c| match c {
            WriteCall::Resource { code, unit_cost, .. } if code == "R1" => Some(*unit_cost),
            _ => None,
        })
        .collect();
    assert_eq!(cement, vec![Decimal::new(12, 0)]);

    let prices: Vec<_> = writer
        .calls
        .iter()
        .filter_map(|c| match c {
            WriteCall::ItemPrice { price, .. } => Some(price.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(prices, vec!["26.00", "0.00"]);
}

#[tokio::test]
async fn test_items_point_at_their_chapter_ids() {
    let result = import(EXTENDED);
    let mut writer = InMemoryBudgetWriter::new();
    persist_budget(&mut writer, "Edificio", "CLP", &result).await.unwrap();

    let chapter_id = |wanted: &str| {
        writer.calls.iter().find_map(|c| match c {
            WriteCall::Chapter { id, code, .. } if code == wanted => Some(*id),
            _ => None,
        })
    };
    let item_chapter = |wanted: &str| {
        writer.calls.iter().find_map(|c| match c {
            WriteCall::Item { chapter_id, code, .. } if code == wanted => Some(*chapter_id),
            _ => None,
        })
    };

    assert_eq!(item_chapter("1.1"), chapter_id("1"));
    assert_eq!(item_chapter("X"), chapter_id("GENERAL"));
}

/// Fails on the first item, after project, chapters and resources.
#[derive(Default)]
struct FailingWriter {
    inner: InMemoryBudgetWriter,
}

#[async_trait]
impl BudgetWriter for FailingWriter {
    async fn create_project(&mut self, name: &str, currency: &str) -> Result<i64> {
        self.inner.create_project(name, currency).await
    }

    async fn create_chapter(&mut self, project_id: i64, code: &str, name: &str) -> Result<i64> {
        self.inner.create_chapter(project_id, code, name).await
    }

    async fn create_resource(&mut self, resource: &Resource) -> Result<i64> {
        self.inner.create_resource(resource).await
    }

    async fn create_item(&mut self, _chapter_id: i64, item: &Item) -> Result<i64> {
        bail!("disk full while writing {}", item.code)
    }

    async fn create_breakdown_line(&mut self, item_id: i64, resource_id: i64, coeff: Decimal) -> Result<i64> {
        self.inner.create_breakdown_line(item_id, resource_id, coeff).await
    }

    async fn set_item_price(&mut self, item_id: i64, price: Decimal) -> Result<()> {
        self.inner.set_item_price(item_id, price).await
    }
}

#[tokio::test]
async fn test_first_failure_stops_the_walk() {
    let result = import(EXTENDED);
    let mut writer = FailingWriter::default();
    let err = persist_budget(&mut writer, "Edificio", "CLP", &result).await.unwrap_err();

    assert!(format!("{:#}", err).contains("Failed to create item 1.1"));
    assert!(!writer
        .inner
        .calls
        .iter()
        .any(|c| matches!(c, WriteCall::BreakdownLine { .. } | WriteCall::ItemPrice { .. })));
}
