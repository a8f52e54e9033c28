//! Daily till records, keyed by date.

use super::{decode_amount, decode_date, encode_amount, encode_date, Db};
use crate::error::Context;
use crate::model::DailyRecord;
use crate::Result;
use chrono::NaiveDate;
use tracing::debug;

#[derive(sqlx::FromRow)]
struct DailyRow {
    date: String,
    till_a_cash: String,
    till_a_card: String,
    till_b_cash: String,
    till_b_card: String,
}

impl DailyRow {
    fn decode(self) -> Result<DailyRecord> {
        Ok(DailyRecord {
            date: decode_date(&self.date)?,
            till_a_cash: decode_amount("till_a_cash", &self.till_a_cash)?,
            till_a_card: decode_amount("till_a_card", &self.till_a_card)?,
            till_b_cash: decode_amount("till_b_cash", &self.till_b_cash)?,
            till_b_card: decode_amount("till_b_card", &self.till_b_card)?,
        })
    }
}

impl Db {
    /// Returns the record for `date`, or `None` if nothing was ever saved for it.
    pub async fn get_daily_record(&self, date: NaiveDate) -> Result<Option<DailyRecord>> {
        let _access = self.read_access().await?;
        let row: Option<DailyRow> = sqlx::query_as(
            "SELECT date, till_a_cash, till_a_card, till_b_cash, till_b_card \
            FROM daily_records WHERE date = ?",
        )
        .bind(encode_date(date))
        .fetch_optional(self.pool())
        .await
        .with_context(|| format!("Failed to read the daily record for {date}"))?;
        row.map(DailyRow::decode).transpose()
    }

    /// Inserts or wholly replaces the record for `record.date`.
    pub async fn save_daily_record(&self, record: &DailyRecord) -> Result<()> {
        record.validate()?;
        let _access = self.write_access().await?;
        sqlx::query(
            "INSERT INTO daily_records (date, till_a_cash, till_a_card, till_b_cash, till_b_card) \
            VALUES (?, ?, ?, ?, ?) \
            ON CONFLICT(date) DO UPDATE SET \
                till_a_cash = excluded.till_a_cash, \
                till_a_card = excluded.till_a_card, \
                till_b_cash = excluded.till_b_cash, \
                till_b_card = excluded.till_b_card",
        )
        .bind(encode_date(record.date))
        .bind(encode_amount(record.till_a_cash))
        .bind(encode_amount(record.till_a_card))
        .bind(encode_amount(record.till_b_cash))
        .bind(encode_amount(record.till_b_card))
        .execute(self.pool())
        .await
        .with_context(|| format!("Failed to save the daily record for {}", record.date))?;
        debug!("Saved daily record for {}", record.date);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Amount, DailyRecord};
    use crate::test::TestEnv;
    use crate::{Db, ErrorKind};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn jan_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn record(a_cash: &str, a_card: &str, b_cash: &str, b_card: &str) -> DailyRecord {
        DailyRecord::new(
            jan_15(),
            Amount::from_str(a_cash).unwrap(),
            Amount::from_str(a_card).unwrap(),
            Amount::from_str(b_cash).unwrap(),
            Amount::from_str(b_card).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_get_never_saved_is_none() {
        let env = TestEnv::new().await;
        let found = env.db().get_daily_record(jan_15()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_save_then_get_round_trips() {
        let env = TestEnv::new().await;
        let r = record("500", "200", "300", "350");
        env.db().save_daily_record(&r).await.unwrap();
        let found = env.db().get_daily_record(jan_15()).await.unwrap();
        assert_eq!(found, Some(r));
    }

    #[tokio::test]
    async fn test_save_replaces_wholesale() {
        let env = TestEnv::new().await;
        env.db()
            .save_daily_record(&record("1.10", "2.20", "3.30", "4.40"))
            .await
            .unwrap();
        let replacement = record("0", "0", "9.99", "0");
        env.db().save_daily_record(&replacement).await.unwrap();
        // Saving the same values again is idempotent
        env.db().save_daily_record(&replacement).await.unwrap();

        let found = env.db().get_daily_record(jan_15()).await.unwrap().unwrap();
        assert_eq!(found, replacement);
        assert!(found.till_a_cash.is_zero());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_records")
            .fetch_one(env.db().pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_repeated_save_load_keeps_precision() {
        let env = TestEnv::new().await;
        let mut r = record("0.10", "0.20", "0.30", "1234567.89");
        for _ in 0..5 {
            env.db().save_daily_record(&r).await.unwrap();
            r = env.db().get_daily_record(jan_15()).await.unwrap().unwrap();
        }
        assert_eq!(r, record("0.10", "0.20", "0.30", "1234567.89"));
        assert_eq!(r.till_b_card.to_string(), "1234567.89");
    }

    #[tokio::test]
    async fn test_negative_amount_is_rejected() {
        let env = TestEnv::new().await;
        let err = env
            .db()
            .save_daily_record(&record("-1", "0", "0", "0"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(env.db().get_daily_record(jan_15()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let env = TestEnv::new().await;
        let r = record("500", "200", "300", "350");
        env.db().save_daily_record(&r).await.unwrap();
        let path = env.db().path().to_path_buf();
        env.db().close().await;

        let db = Db::load(&path).await.unwrap();
        assert_eq!(db.get_daily_record(jan_15()).await.unwrap(), Some(r));
    }
}
