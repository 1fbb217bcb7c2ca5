//! Budget Writer
//!
//! The persistence side of an import. [`persist_budget`] walks a finished
//! [`ImportResult`] and issues exactly one writer call per entity, in
//! dependency order. Resource deduplication has already happened in the
//! assembler, so writers never merge or retry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use ofitec_models::{ImportResult, Item, Resource};

/// Storage operations needed to persist one budget. Returned ids are the
/// store's own keys, not the arena ids of the import.
#[async_trait]
pub trait BudgetWriter: Send {
    async fn create_project(&mut self, name: &str, currency: &str) -> Result<i64>;

    async fn create_chapter(&mut self, project_id: i64, code: &str, name: &str) -> Result<i64>;

    async fn create_resource(&mut self, resource: &Resource) -> Result<i64>;

    async fn create_item(&mut self, chapter_id: i64, item: &Item) -> Result<i64>;

    async fn create_breakdown_line(&mut self, item_id: i64, resource_id: i64, coeff: Decimal) -> Result<i64>;

    async fn set_item_price(&mut self, item_id: i64, price: Decimal) -> Result<()>;
}

/// Persist an import under a new project and return the project id.
///
/// Call order: project, chapters, resources, items, breakdown lines, then
/// one price per item. The first failing call aborts the walk; rolling back
/// what was already written is the writer's concern.
pub async fn persist_budget<W>(writer: &mut W, project_name: &str, currency: &str, result: &ImportResult) -> Result<i64>
where
    W: BudgetWriter + ?Sized,
{
    let project_id = writer
        .create_project(project_name, currency)
        .await
        .context("Failed to create project")?;

    let mut chapter_ids = Vec::with_capacity(result.chapters.len());
    for chapter in &result.chapters {
        let id = writer
            .create_chapter(project_id, &chapter.code, &chapter.name)
            .await
            .with_context(|| format!("Failed to create chapter {}", chapter.code))?;
        chapter_ids.push(id);
    }

    let mut resource_ids = Vec::with_capacity(result.resources.len());
    for resource in &result.resources {
        let id = writer
            .create_resource(resource)
            .await
            .with_context(|| format!("Failed to create resource {}", resource.code))?;
        resource_ids.push(id);
    }

    let mut item_ids = Vec::with_capacity(result.items.len());
    for item in &result.items {
        let id = writer
            .create_item(chapter_ids[item.chapter_id.index()], item)
            .await
            .with_context(|| format!("Failed to create item {}", item.code))?;
        item_ids.push(id);
    }

    for line in &result.breakdown {
        writer
            .create_breakdown_line(item_ids[line.item_id.index()], resource_ids[line.resource_id.index()], line.coeff)
            .await
            .context("Failed to create breakdown line")?;
    }

    for (item, &id) in result.items.iter().zip(&item_ids) {
        writer
            .set_item_price(id, item.price)
            .await
            .with_context(|| format!("Failed to price item {}", item.code))?;
    }

    tracing::info!(
        project_id,
        chapters = chapter_ids.len(),
        items = item_ids.len(),
        resources = resource_ids.len(),
        breakdown_lines = result.breakdown.len(),
        "Budget persisted"
    );
    Ok(project_id)
}

/// One recorded writer call.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteCall {
    Project { id: i64, name: String, currency: String },
    Chapter { id: i64, project_id: i64, code: String, name: String },
    Resource { id: i64, code: String, unit_cost: Decimal },
    Item { id: i64, chapter_id: i64, code: String, quantity: Decimal },
    BreakdownLine { id: i64, item_id: i64, resource_id: i64, coeff: Decimal },
    ItemPrice { item_id: i64, price: Decimal },
}

/// Writer that keeps every call in memory, handing out sequential ids
/// starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryBudgetWriter {
    next_id: i64,
    pub calls: Vec<WriteCall>,
}

impl InMemoryBudgetWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl BudgetWriter for InMemoryBudgetWriter {
    async fn create_project(&mut self, name: &str, currency: &str) -> Result<i64> {
        let id = self.allocate();
        self.calls.push(WriteCall::Project {
            id,
            name: name.to_string(),
            currency: currency.to_string(),
        });
        Ok(id)
    }

    async fn create_chapter(&mut self, project_id: i64, code: &str, name: &str) -> Result<i64> {
        let id = self.allocate();
        self.calls.push(WriteCall::Chapter {
            id,
            project_id,
            code: code.to_string(),
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn create_resource(&mut self, resource: &Resource) -> Result<i64> {
        let id = self.allocate();
        self.calls.push(WriteCall::Resource {
            id,
            code: resource.code.clone(),
            unit_cost: resource.unit_cost,
        });
        Ok(id)
    }

    async fn create_item(&mut self, chapter_id: i64, item: &Item) -> Result<i64> {
        let id = self.allocate();
        self.calls.push(WriteCall::Item {
            id,
            chapter_id,
            code: item.code.clone(),
            quantity: item.quantity,
        });
        Ok(id)
    }

    async fn create_breakdown_line(&mut self, item_id: i64, resource_id: i64, coeff: Decimal) -> Result<i64> {
        let id = self.allocate();
        self.calls.push(WriteCall::BreakdownLine {
            id,
            item_id,
            resource_id,
            coeff,
        });
        Ok(id)
    }

    async fn set_item_price(&mut self, item_id: i64, price: Decimal) -> Result<()> {
        self.calls.push(WriteCall::ItemPrice { item_id, price });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofitec_utils::BudgetImporter;

    #[tokio::test]
    async fn test_ids_follow_call_order() {
        let result = BudgetImporter::default()
            .import_bytes("one.bc3", b"C;C1;Cap\nI;C1;IT1;Item;m2;5\nR;IT1;MAT;R1;Res;1;12,5\n")
            .unwrap();

        let mut writer = InMemoryBudgetWriter::new();
        let project_id = persist_budget(&mut writer, "Obra", "CLP", &result).await.unwrap();

        assert_eq!(project_id, 1);
        assert_eq!(
            writer.calls,
            vec![
                WriteCall::Project { id: 1, name: "Obra".into(), currency: "CLP".into() },
                WriteCall::Chapter { id: 2, project_id: 1, code: "C1".into(), name: "Cap".into() },
                WriteCall::Resource { id: 3, code: "R1".into(), unit_cost: Decimal::new(125, 1) },
                WriteCall::Item { id: 4, chapter_id: 2, code: "IT1".into(), quantity: Decimal::new(5, 0) },
                WriteCall::BreakdownLine { id: 5, item_id: 4, resource_id: 3, coeff: Decimal::new(1, 0) },
                WriteCall::ItemPrice { item_id: 4, price: Decimal::new(1250, 2) },
            ]
        );
    }
}
