use crate::commands::{column, Out};
use crate::model::DailyRecord;
use crate::reconcile::{reconcile, Balance, Reconciliation};
use crate::{Db, Result};
use chrono::NaiveDate;
use serde::Serialize;

/// A day's takings next to the comparison of its two tills.
#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub record: DailyRecord,
    /// `false` when nothing was recorded for the day and the zeroed record is shown.
    pub saved: bool,
    pub reconciliation: Reconciliation,
    pub balance: Balance,
}

impl DayReport {
    fn new(record: DailyRecord, saved: bool) -> Result<Self> {
        let reconciliation = reconcile(&record)?;
        Ok(Self {
            record,
            saved,
            balance: reconciliation.balance(),
            reconciliation,
        })
    }

    fn render(&self) -> String {
        let r = &self.record;
        let c = &self.reconciliation;
        let mut s = format!("Takings for {}", r.date);
        if !self.saved {
            s.push_str(" (nothing recorded)");
        }
        s.push_str(&format!(
            "\n          {:>12}{:>12}{:>12}\n  Till A  {}{}{}\n  Till B  {}{}{}\n  Variance {} ({})",
            "cash",
            "card",
            "total",
            column(r.till_a_cash),
            column(r.till_a_card),
            column(c.till_a_total),
            column(r.till_b_cash),
            column(r.till_b_card),
            column(c.till_b_total),
            c.variance,
            self.balance,
        ));
        s
    }
}

/// Shows the takings of `date`. A day that was never saved shows as all zeros.
pub async fn day_show(db: &Db, date: NaiveDate) -> Result<Out<DayReport>> {
    let (record, saved) = match db.get_daily_record(date).await? {
        Some(record) => (record, true),
        None => (DailyRecord::zeroed(date), false),
    };
    let report = DayReport::new(record, saved)?;
    Ok(Out::new(report.render(), report))
}

/// Saves `record`, replacing whatever was stored for its date.
pub async fn day_save(db: &Db, record: DailyRecord) -> Result<Out<DayReport>> {
    db.save_daily_record(&record).await?;
    let report = DayReport::new(record, true)?;
    Ok(Out::new(format!("Saved. {}", report.render()), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Amount;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_day_show_unsaved_is_neutral() {
        let env = TestEnv::new().await;
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let out = day_show(&env.db(), date).await.unwrap();
        let report = out.structure().unwrap();
        assert!(!report.saved);
        assert_eq!(report.balance, Balance::Neutral);
        assert!(out.message().contains("nothing recorded"));
    }

    #[tokio::test]
    async fn test_day_save_then_show() {
        let env = TestEnv::new().await;
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let record = DailyRecord::new(
            date,
            Amount::cents(50000),
            Amount::cents(20000),
            Amount::cents(30000),
            Amount::cents(35000),
        );
        day_save(&env.db(), record).await.unwrap();

        let out = day_show(&env.db(), date).await.unwrap();
        let report = out.structure().unwrap();
        assert!(report.saved);
        assert_eq!(report.record, record);
        assert_eq!(report.reconciliation.variance, Amount::cents(5000));
        assert_eq!(report.balance, Balance::Surplus);
        assert!(out.message().contains("50.00 (surplus)"));
    }
}
