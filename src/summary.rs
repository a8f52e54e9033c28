//! Per-period totals across categories, and the period's attested "fully paid" flag.
//!
//! The flag is read and written verbatim. Nothing here derives it from the paid flags of the
//! period's expenses.

use crate::model::{Amount, Category, Expense, Period};
use crate::{Db, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The total of every category in a period. Categories without expenses map to zero.
pub type CategoryTotals = BTreeMap<Category, Amount>;

pub async fn category_totals(db: &Db, period: Period) -> Result<CategoryTotals> {
    let mut totals = CategoryTotals::new();
    for category in Category::ALL {
        let total = db.sum_amounts_by_category(period, category).await?;
        totals.insert(category, total);
    }
    Ok(totals)
}

/// The total across every category of `totals`.
pub fn gross_total(totals: &CategoryTotals) -> Result<Amount> {
    Amount::checked_sum(totals.values().copied())
}

/// Returns the user's attestation that `period` is fully paid.
pub async fn attested_fully_paid(db: &Db, period: Period) -> Result<bool> {
    db.get_period_status(period).await
}

/// Records the user's attestation that `period` is, or is not, fully paid.
pub async fn attest_fully_paid(db: &Db, period: Period, paid: bool) -> Result<()> {
    db.set_period_status(period, paid).await
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: Period,
    pub totals: CategoryTotals,
    pub gross: Amount,
    pub fully_paid: bool,
}

pub async fn period_summary(db: &Db, period: Period) -> Result<PeriodSummary> {
    let totals = category_totals(db, period).await?;
    Ok(PeriodSummary {
        period,
        gross: gross_total(&totals)?,
        totals,
        fully_paid: attested_fully_paid(db, period).await?,
    })
}

/// The market view of a period: the market expense items next to the totals of all other
/// categories.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub period: Period,
    /// Totals of every category except market expenses.
    pub other_totals: CategoryTotals,
    pub market_items: Vec<Expense>,
    pub market_total: Amount,
    /// Total across all categories, market expenses included.
    pub gross: Amount,
    pub fully_paid: bool,
}

pub async fn market_summary(db: &Db, period: Period) -> Result<MarketSummary> {
    let mut other_totals = category_totals(db, period).await?;
    let gross = gross_total(&other_totals)?;
    let market_total = other_totals
        .remove(&Category::MarketExpenses)
        .unwrap_or(Amount::ZERO);
    Ok(MarketSummary {
        period,
        other_totals,
        market_items: db.list_expenses(period, Category::MarketExpenses).await?,
        market_total,
        gross,
        fully_paid: attested_fully_paid(db, period).await?,
    })
}

/// The attested flag of each month of `year`, January first.
pub async fn year_overview(db: &Db, year: i32) -> Result<Vec<(Period, bool)>> {
    let stored = db.list_period_statuses(year).await?;
    Ok(Period::months_of(year)?
        .into_iter()
        .map(|p| (p, stored.get(&p).copied().unwrap_or(false)))
        .collect())
}
