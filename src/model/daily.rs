use crate::model::Amount;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The counts of both tills for one calendar day. There is at most one per date.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub till_a_cash: Amount,
    pub till_a_card: Amount,
    pub till_b_cash: Amount,
    pub till_b_card: Amount,
}

impl DailyRecord {
    pub fn new(
        date: NaiveDate,
        till_a_cash: Amount,
        till_a_card: Amount,
        till_b_cash: Amount,
        till_b_card: Amount,
    ) -> Self {
        Self {
            date,
            till_a_cash,
            till_a_card,
            till_b_cash,
            till_b_card,
        }
    }

    /// A record with all four amounts at zero. This is what a missing date means, but storage
    /// never returns it in place of "not found".
    pub fn zeroed(date: NaiveDate) -> Self {
        Self::new(date, Amount::ZERO, Amount::ZERO, Amount::ZERO, Amount::ZERO)
    }

    /// Checks that no amount is negative.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("till_a_cash", self.till_a_cash),
            ("till_a_card", self.till_a_card),
            ("till_b_cash", self.till_b_cash),
            ("till_b_card", self.till_b_card),
        ];
        for (name, amount) in fields {
            if amount.is_negative() {
                return Err(Error::validation(format!(
                    "{name} must not be negative for {}, got {amount}",
                    self.date
                )));
            }
        }
        Ok(())
    }
}
