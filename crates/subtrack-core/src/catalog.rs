//! Catalog search
//!
//! A [`CatalogSnapshot`] is loaded once per request from the published
//! catalog and answers every lookup for that request, so search, popular and
//! category listings share a single database read.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::analytics::monthly_amount;
use crate::collation::NameOrder;
use crate::models::{BillingPeriod, CatalogEntry, CatalogStatus, Category};

/// Most results returned by a search
pub const SEARCH_LIMIT: usize = 30;

/// Default size of the popular list
pub const POPULAR_LIMIT: usize = 8;

/// A published catalog entry as shown to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub category: Category,
    pub category_name: String,
    pub price: f64,
    pub period: BillingPeriod,
    pub suggested_monthly_price: f64,
    pub subscribers_count: i64,
}

impl From<&CatalogEntry> for CatalogItem {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.trim().to_string(),
            icon: entry.icon.trim().to_string(),
            category: entry.category,
            category_name: entry.category.label().to_string(),
            price: entry.price,
            period: entry.period,
            suggested_monthly_price: monthly_amount(entry.price, entry.period.months()),
            subscribers_count: entry.subscribers_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub slug: Category,
    pub name: String,
}

/// Published catalog, ranked by popularity
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    items: Vec<CatalogItem>,
}

impl CatalogSnapshot {
    /// Keep published entries with a non-blank name, most subscribers first,
    /// then by name in collation order.
    pub fn new(entries: &[CatalogEntry]) -> Self {
        let mut items: Vec<CatalogItem> = entries
            .iter()
            .filter(|e| e.status == CatalogStatus::Published)
            .map(CatalogItem::from)
            .filter(|item| !item.name.is_empty())
            .collect();

        let mut order = NameOrder::new();
        items.sort_by(|a, b| {
            b.subscribers_count
                .cmp(&a.subscribers_count)
                .then_with(|| order.compare(&a.name, &b.name))
        });

        Self { items }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Case-insensitive substring match on name or category label
    pub fn search(&self, query: &str, category: Option<Category>) -> Vec<CatalogItem> {
        let needle = query.trim().to_lowercase();
        self.items
            .iter()
            .filter(|item| category.map_or(true, |c| item.category == c))
            .filter(|item| {
                needle.is_empty()
                    || item.name.to_lowercase().contains(&needle)
                    || item.category_name.to_lowercase().contains(&needle)
            })
            .take(SEARCH_LIMIT)
            .cloned()
            .collect()
    }

    pub fn popular(&self, limit: usize) -> Vec<CatalogItem> {
        self.items.iter().take(limit).cloned().collect()
    }

    /// Categories with at least one published entry, in display order
    pub fn categories(&self) -> Vec<CategoryInfo> {
        let in_use: HashSet<Category> = self.items.iter().map(|item| item.category).collect();
        Category::ALL
            .iter()
            .filter(|c| in_use.contains(c))
            .map(|c| CategoryInfo {
                slug: *c,
                name: c.label().to_string(),
            })
            .collect()
    }
}
