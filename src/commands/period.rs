use crate::commands::{column, Out};
use crate::model::{Category, Period};
use crate::summary::{self, CategoryTotals, MarketSummary, PeriodSummary};
use crate::{Db, Result};

fn paid_label(fully_paid: bool) -> &'static str {
    if fully_paid {
        "fully paid"
    } else {
        "not fully paid"
    }
}

fn render_totals(message: &mut String, totals: &CategoryTotals) {
    for (category, total) in totals {
        message.push_str(&format!("\n  {:<30}{}", category.to_string(), column(total)));
    }
}

pub async fn period_summary(db: &Db, period: Period) -> Result<Out<PeriodSummary>> {
    let s = summary::period_summary(db, period).await?;
    let mut message = format!("Summary for {period} ({})", paid_label(s.fully_paid));
    render_totals(&mut message, &s.totals);
    message.push_str(&format!("\n  {:<30}{}", "gross", column(s.gross)));
    Ok(Out::new(message, s))
}

pub async fn period_market(db: &Db, period: Period) -> Result<Out<MarketSummary>> {
    let s = summary::market_summary(db, period).await?;
    let mut message = format!(
        "Market expenses for {period} ({})",
        paid_label(s.fully_paid)
    );
    for item in &s.market_items {
        message.push_str(&format!(
            "\n  #{:<5} {:<30}{}",
            item.id.to_string(),
            item.title,
            column(item.amount)
        ));
    }
    message.push_str(&format!(
        "\n  {:<37}{}",
        Category::MarketExpenses.to_string(),
        column(s.market_total)
    ));
    render_totals(&mut message, &s.other_totals);
    message.push_str(&format!("\n  {:<30}{}", "gross", column(s.gross)));
    Ok(Out::new(message, s))
}

pub async fn period_status(db: &Db, period: Period) -> Result<Out<bool>> {
    let paid = summary::attested_fully_paid(db, period).await?;
    Ok(Out::new(format!("{period} is {}", paid_label(paid)), paid))
}

pub async fn period_set_status(db: &Db, period: Period, paid: bool) -> Result<Out<bool>> {
    summary::attest_fully_paid(db, period, paid).await?;
    Ok(Out::new(
        format!("{period} is now marked {}", paid_label(paid)),
        paid,
    ))
}

pub async fn period_year(db: &Db, year: i32) -> Result<Out<Vec<(Period, bool)>>> {
    let overview = summary::year_overview(db, year).await?;
    let mut message = format!("Payment status for {year}");
    for (period, paid) in &overview {
        message.push_str(&format!("\n  {period}  {}", paid_label(*paid)));
    }
    Ok(Out::new(message, overview))
}
