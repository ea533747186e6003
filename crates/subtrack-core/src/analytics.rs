//! Spend Aggregator
//!
//! Normalizes every subscription to a monthly amount and groups the result
//! for the home dashboard:
//!
//! - **Categories** - ranked by spend, capped at [`MAX_CATEGORY_GROUPS`]
//!   with the long tail folded into [`OTHER_CATEGORY`]
//! - **Cards** - ranked by spend per payment method, uncapped
//!
//! Pure functions over data already loaded from the database.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::Subscription;

/// Bucket name for empty categories and for the folded tail
pub const OTHER_CATEGORY: &str = "Other";

/// Card group for subscriptions without a payment method
pub const NO_CARD_LABEL: &str = "No card";

/// Most category groups ever displayed
pub const MAX_CATEGORY_GROUPS: usize = 4;

/// Groups kept as-is when the cap kicks in; the rest fold into "Other"
pub const TOP_CATEGORY_GROUPS: usize = 3;

/// Price spread over the billing period. Periods below 1 count as 1.
pub fn monthly_amount(price: f64, period: i64) -> f64 {
    price / period.max(1) as f64
}

/// The fields the aggregator reads from a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct SpendItem {
    pub price: f64,
    pub period: i64,
    /// Category display label
    pub category: String,
    pub payment_method_label: Option<String>,
}

impl SpendItem {
    pub fn monthly_amount(&self) -> f64 {
        monthly_amount(self.price, self.period)
    }
}

impl From<&Subscription> for SpendItem {
    fn from(sub: &Subscription) -> Self {
        Self {
            price: sub.price,
            period: sub.period.months(),
            category: sub.category.label().to_string(),
            payment_method_label: sub.payment_method_label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub name: String,
    pub amount: f64,
    /// Percentage of the displayed total
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub groups: Vec<CategoryStat>,
    /// Sum of the displayed group amounts
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardStat {
    pub label: String,
    pub amount: f64,
    pub share: f64,
    pub subscriptions_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardBreakdown {
    pub cards: Vec<CardStat>,
    pub total: f64,
}

struct Group {
    name: String,
    amount: f64,
    count: usize,
}

/// Sum monthly amounts per key in first-seen order, then stable-sort by
/// amount descending so ties keep their first-seen order.
fn rank_groups<'a, I, F>(items: I, key: F) -> Vec<Group>
where
    I: IntoIterator<Item = &'a SpendItem>,
    F: Fn(&SpendItem) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for item in items {
        let name = key(item);
        let amount = item.monthly_amount();
        match index.get(&name) {
            Some(&i) => {
                groups[i].amount += amount;
                groups[i].count += 1;
            }
            None => {
                index.insert(name.clone(), groups.len());
                groups.push(Group {
                    name,
                    amount,
                    count: 1,
                });
            }
        }
    }

    groups.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    groups
}

fn share(amount: f64, total: f64) -> f64 {
    if total > 0.0 {
        amount / total * 100.0
    } else {
        0.0
    }
}

/// Group monthly spend by category label.
///
/// With more than [`MAX_CATEGORY_GROUPS`] groups, the top
/// [`TOP_CATEGORY_GROUPS`] are kept and everything else is folded into
/// "Other", reusing an "Other" group already in the top slice.
pub fn category_breakdown(items: &[SpendItem]) -> CategoryBreakdown {
    let ranked = rank_groups(items, |item| match item.category.trim() {
        "" => OTHER_CATEGORY.to_string(),
        label => label.to_string(),
    });

    let displayed: Vec<(String, f64)> = if ranked.len() > MAX_CATEGORY_GROUPS {
        ranked
            .into_iter()
            .enumerate()
            .fold(Vec::with_capacity(MAX_CATEGORY_GROUPS), |mut acc, (i, group)| {
                if i < TOP_CATEGORY_GROUPS {
                    acc.push((group.name, group.amount));
                } else if let Some(other) = acc.iter_mut().find(|(name, _)| name == OTHER_CATEGORY)
                {
                    other.1 += group.amount;
                } else {
                    acc.push((OTHER_CATEGORY.to_string(), group.amount));
                }
                acc
            })
    } else {
        ranked.into_iter().map(|g| (g.name, g.amount)).collect()
    };

    let total: f64 = displayed.iter().map(|(_, amount)| amount).sum();
    let groups = displayed
        .into_iter()
        .map(|(name, amount)| CategoryStat {
            name,
            amount,
            share: share(amount, total),
        })
        .collect();

    CategoryBreakdown { groups, total }
}

/// Group monthly spend by payment method label
pub fn card_breakdown(items: &[SpendItem]) -> CardBreakdown {
    let ranked = rank_groups(items, |item| {
        match item.payment_method_label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => NO_CARD_LABEL.to_string(),
        }
    });

    let total: f64 = ranked.iter().map(|g| g.amount).sum();
    let cards = ranked
        .into_iter()
        .map(|g| CardStat {
            share: share(g.amount, total),
            label: g.name,
            amount: g.amount,
            subscriptions_count: g.count,
        })
        .collect();

    CardBreakdown { cards, total }
}

/// Up to two upper-cased initials from a display name
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Figures shown at the top of the home page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeSummary {
    pub user_initials: String,
    pub monthly_total: f64,
    pub subscriptions_count: usize,
    pub category_stats: Vec<CategoryStat>,
    pub category_total: f64,
    pub card_stats: Vec<CardStat>,
    pub card_total: f64,
}

impl HomeSummary {
    pub fn build(user_name: &str, items: &[SpendItem]) -> Self {
        let categories = category_breakdown(items);
        let cards = card_breakdown(items);

        Self {
            user_initials: initials(user_name),
            monthly_total: items.iter().map(SpendItem::monthly_amount).sum(),
            subscriptions_count: items.len(),
            category_stats: categories.groups,
            category_total: categories.total,
            card_stats: cards.cards,
            card_total: cards.total,
        }
    }
}
