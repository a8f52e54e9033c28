//! The per-period "fully paid" attestation.
//!
//! The flag is whatever the user last set. It is not derived from the paid flags of the period's
//! expenses.

use super::{decode_bool, encode_bool, Db};
use crate::error::Context;
use crate::model::Period;
use crate::Result;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

impl Db {
    /// Returns the attested flag for `period`, `false` if it was never set.
    pub async fn get_period_status(&self, period: Period) -> Result<bool> {
        let _access = self.read_access().await?;
        let value: Option<i64> =
            sqlx::query_scalar("SELECT is_fully_paid FROM period_status WHERE period = ?")
                .bind(period.to_string())
                .fetch_optional(self.pool())
                .await
                .with_context(|| format!("Failed to read the status of {period}"))?;
        match value {
            Some(v) => decode_bool("is_fully_paid", v),
            None => Ok(false),
        }
    }

    /// Records the attested flag for `period`, replacing any earlier value.
    pub async fn set_period_status(&self, period: Period, paid: bool) -> Result<()> {
        let _access = self.write_access().await?;
        sqlx::query(
            "INSERT INTO period_status (period, is_fully_paid) VALUES (?, ?) \
            ON CONFLICT(period) DO UPDATE SET is_fully_paid = excluded.is_fully_paid",
        )
        .bind(period.to_string())
        .bind(encode_bool(paid))
        .execute(self.pool())
        .await
        .with_context(|| format!("Failed to set the status of {period}"))?;
        debug!("Set period {period} fully paid = {paid}");
        Ok(())
    }

    /// Returns the stored flags of `year`. Months that were never set are absent.
    pub async fn list_period_statuses(&self, year: i32) -> Result<BTreeMap<Period, bool>> {
        let _access = self.read_access().await?;
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT period, is_fully_paid FROM period_status WHERE period LIKE ? ORDER BY period",
        )
        .bind(format!("{year:04}-%"))
        .fetch_all(self.pool())
        .await
        .with_context(|| format!("Failed to read the period statuses of {year}"))?;
        rows.into_iter()
            .map(|(period, paid)| {
                Ok((
                    Period::from_str(&period)?,
                    decode_bool("is_fully_paid", paid)?,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Period;
    use crate::test::TestEnv;
    use std::str::FromStr;

    fn period(s: &str) -> Period {
        Period::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_untouched_period_is_not_paid() {
        let env = TestEnv::new().await;
        assert!(!env.db().get_period_status(period("2026-03")).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let env = TestEnv::new().await;
        let db = env.db();
        db.set_period_status(period("2026-03"), true).await.unwrap();
        assert!(db.get_period_status(period("2026-03")).await.unwrap());
        db.set_period_status(period("2026-03"), false).await.unwrap();
        assert!(!db.get_period_status(period("2026-03")).await.unwrap());
        // Other periods are unaffected
        assert!(!db.get_period_status(period("2026-04")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_period_statuses_for_year() {
        let env = TestEnv::new().await;
        let db = env.db();
        db.set_period_status(period("2026-01"), true).await.unwrap();
        db.set_period_status(period("2026-02"), false).await.unwrap();
        db.set_period_status(period("2027-01"), true).await.unwrap();

        let statuses = db.list_period_statuses(2026).await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses.get(&period("2026-01")), Some(&true));
        assert_eq!(statuses.get(&period("2026-02")), Some(&false));
    }
}
