//! Dashboard aggregates. Everything here is recomputed from the full row set
//! on every request.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{CategoryEntity, ProductEntity, QuoteRequestEntity, QuoteStatus};

pub const DEFAULT_DAILY_WINDOW: u32 = 30;
pub const DEFAULT_TOP_PRODUCTS: usize = 5;

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct StatusBreakdown {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending_pct: f64,
    pub approved_pct: f64,
    pub rejected_pct: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ProductDemand {
    pub product_id: Uuid,
    pub name: String,
    pub requests: usize,
    pub total_quantity: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct CategoryShare {
    pub category: String,
    pub products: usize,
    pub percentage: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct DashboardStats {
    pub status: StatusBreakdown,
    pub daily: Vec<DailyCount>,
    pub monthly: Vec<MonthlyCount>,
    pub top_products: Vec<ProductDemand>,
    pub categories: Vec<CategoryShare>,
    pub product_count: usize,
    pub category_count: usize,
    pub user_count: usize,
}

/// Share of `part` in `total` in percent, rounded to one decimal.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}

pub fn status_breakdown(rows: &[QuoteRequestEntity]) -> StatusBreakdown {
    let count = |status: QuoteStatus| {
        rows.iter()
            .filter(|row| row.status == status.as_str())
            .count()
    };
    let total = rows.len();
    let pending = count(QuoteStatus::Pending);
    let approved = count(QuoteStatus::Approved);
    let rejected = count(QuoteStatus::Rejected);

    StatusBreakdown {
        total,
        pending,
        approved,
        rejected,
        pending_pct: percentage(pending, total),
        approved_pct: percentage(approved, total),
        rejected_pct: percentage(rejected, total),
    }
}

/// Zero-filled counts for the `days` calendar days ending at `today`,
/// oldest first.
pub fn requests_by_day(
    rows: &[QuoteRequestEntity],
    today: NaiveDate,
    days: u32,
) -> Vec<DailyCount> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for row in rows {
        *per_day.entry(row.created_at.date_naive()).or_default() += 1;
    }

    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset as u64)))
        .map(|date| DailyCount {
            date,
            count: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

pub fn requests_by_month(rows: &[QuoteRequestEntity]) -> Vec<MonthlyCount> {
    let mut per_month: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for row in rows {
        let date = row.created_at.date_naive();
        *per_month.entry((date.year(), date.month())).or_default() += 1;
    }

    per_month
        .into_iter()
        .map(|((year, month), count)| MonthlyCount {
            month: format!("{:04}-{:02}", year, month),
            count,
        })
        .collect()
}

/// Most requested products by number of rows; ties go to the name.
pub fn top_products(
    rows: &[QuoteRequestEntity],
    products: &[ProductEntity],
    limit: usize,
) -> Vec<ProductDemand> {
    let names: HashMap<Uuid, &str> = products.iter().map(|p| (p.id, p.name.as_str())).collect();

    let mut demand: HashMap<Uuid, (usize, i64)> = HashMap::new();
    for row in rows {
        let entry = demand.entry(row.product_id).or_default();
        entry.0 += 1;
        entry.1 += row.quantity as i64;
    }

    let mut ranked: Vec<ProductDemand> = demand
        .into_iter()
        .map(|(product_id, (requests, total_quantity))| ProductDemand {
            product_id,
            name: names
                .get(&product_id)
                .map(|name| name.to_string())
                .unwrap_or_else(|| "Unknown product".to_string()),
            requests,
            total_quantity,
        })
        .collect();
    ranked.sort_by(|a, b| b.requests.cmp(&a.requests).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

pub fn products_by_category(
    products: &[ProductEntity],
    categories: &[CategoryEntity],
) -> Vec<CategoryShare> {
    let names: HashMap<Uuid, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for product in products {
        let name = product
            .category_id
            .and_then(|id| names.get(&id).copied())
            .unwrap_or("Uncategorized");
        *counts.entry(name).or_default() += 1;
    }

    let total = products.len();
    let mut shares: Vec<CategoryShare> = counts
        .into_iter()
        .map(|(category, products)| CategoryShare {
            category: category.to_string(),
            products,
            percentage: percentage(products, total),
        })
        .collect();
    shares.sort_by(|a, b| {
        b.products
            .cmp(&a.products)
            .then_with(|| a.category.cmp(&b.category))
    });
    shares
}

pub fn dashboard(
    rows: &[QuoteRequestEntity],
    products: &[ProductEntity],
    categories: &[CategoryEntity],
    user_count: usize,
    today: NaiveDate,
) -> DashboardStats {
    DashboardStats {
        status: status_breakdown(rows),
        daily: requests_by_day(rows, today, DEFAULT_DAILY_WINDOW),
        monthly: requests_by_month(rows),
        top_products: top_products(rows, products, DEFAULT_TOP_PRODUCTS),
        categories: products_by_category(products, categories),
        product_count: products.len(),
        category_count: categories.len(),
        user_count,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn request(
        product_id: Uuid,
        status: QuoteStatus,
        y: i32,
        m: u32,
        d: u32,
    ) -> QuoteRequestEntity {
        let at = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        QuoteRequestEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            subject: "Quote request for 1 product".to_string(),
            message: String::new(),
            product_id,
            quantity: 2,
            custom_specifications: None,
            status: status.as_str().to_string(),
            admin_notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn product(name: &str, category_id: Option<Uuid>) -> ProductEntity {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        ProductEntity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            price: None,
            image_url: None,
            category_id,
            specifications: None,
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn breakdown_counts_and_percentages() {
        let p = Uuid::new_v4();
        let rows = vec![
            request(p, QuoteStatus::Pending, 2025, 3, 1),
            request(p, QuoteStatus::Approved, 2025, 3, 1),
            request(p, QuoteStatus::Approved, 2025, 3, 2),
        ];

        let breakdown = status_breakdown(&rows);

        assert_eq!(
            (
                breakdown.total,
                breakdown.pending,
                breakdown.approved,
                breakdown.rejected
            ),
            (3, 1, 2, 0)
        );
        assert_eq!(breakdown.pending_pct, 33.3);
        assert_eq!(breakdown.approved_pct, 66.7);
        assert_eq!(breakdown.rejected_pct, 0.0);
    }

    #[test]
    fn empty_dataset_has_zero_percentages() {
        let breakdown = status_breakdown(&[]);
        assert_eq!(breakdown.total, 0);
        assert_eq!(breakdown.pending_pct, 0.0);
    }

    #[test]
    fn daily_counts_are_zero_filled_and_oldest_first() {
        let p = Uuid::new_v4();
        let rows = vec![
            request(p, QuoteStatus::Pending, 2025, 3, 10),
            request(p, QuoteStatus::Pending, 2025, 3, 10),
            request(p, QuoteStatus::Pending, 2025, 3, 8),
            request(p, QuoteStatus::Pending, 2025, 1, 1),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let daily = requests_by_day(&rows, today, 3);

        let counts: Vec<(u32, usize)> = daily.iter().map(|d| (d.date.day(), d.count)).collect();
        assert_eq!(counts, vec![(8, 1), (9, 0), (10, 2)]);
    }

    #[test]
    fn monthly_counts_are_sorted_by_month() {
        let p = Uuid::new_v4();
        let rows = vec![
            request(p, QuoteStatus::Pending, 2025, 3, 10),
            request(p, QuoteStatus::Pending, 2024, 12, 31),
            request(p, QuoteStatus::Rejected, 2025, 3, 1),
        ];

        let monthly = requests_by_month(&rows);

        assert_eq!(
            monthly,
            vec![
                MonthlyCount { month: "2024-12".to_string(), count: 1 },
                MonthlyCount { month: "2025-03".to_string(), count: 2 },
            ]
        );
    }

    #[test]
    fn top_products_rank_by_request_count() {
        let widget = product("Widget", None);
        let gadget = product("Gadget", None);
        let rows = vec![
            request(widget.id, QuoteStatus::Pending, 2025, 3, 1),
            request(gadget.id, QuoteStatus::Pending, 2025, 3, 1),
            request(gadget.id, QuoteStatus::Approved, 2025, 3, 2),
            request(Uuid::new_v4(), QuoteStatus::Pending, 2025, 3, 2),
        ];

        let top = top_products(&rows, &[widget.clone(), gadget.clone()], 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Gadget");
        assert_eq!((top[0].requests, top[0].total_quantity), (2, 4));
        assert_eq!(top[1].name, "Unknown product");
    }

    #[test]
    fn products_without_a_known_category_are_uncategorized() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let tools = CategoryEntity {
            id: Uuid::new_v4(),
            name: "Tools".to_string(),
            description: None,
            created_at: at,
        };
        let products = vec![
            product("Hammer", Some(tools.id)),
            product("Saw", Some(tools.id)),
            product("Mystery", Some(Uuid::new_v4())),
            product("Loose", None),
        ];

        let shares = products_by_category(&products, &[tools]);

        assert_eq!(
            shares,
            vec![
                CategoryShare {
                    category: "Tools".to_string(),
                    products: 2,
                    percentage: 50.0,
                },
                CategoryShare {
                    category: "Uncategorized".to_string(),
                    products: 2,
                    percentage: 50.0,
                },
            ]
        );
    }
}
