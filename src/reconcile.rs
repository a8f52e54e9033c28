//! Reconciles the two tills of a day against each other. Pure arithmetic, no I/O.

use crate::model::{Amount, DailyRecord};
use crate::Result;
use serde::{Deserialize, Serialize};

/// How till A compares to till B.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Balance {
    /// Till A holds more than till B.
    Surplus,
    /// Till A holds less than till B.
    Shortage,
    /// The tills agree exactly.
    Neutral,
}

serde_plain::derive_display_from_serialize!(Balance);

/// The totals of both tills and the difference between them.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Reconciliation {
    pub till_a_total: Amount,
    pub till_b_total: Amount,
    /// `till_a_total - till_b_total`
    pub variance: Amount,
}

impl Reconciliation {
    pub fn balance(&self) -> Balance {
        if self.variance.is_positive() {
            Balance::Surplus
        } else if self.variance.is_negative() {
            Balance::Shortage
        } else {
            Balance::Neutral
        }
    }
}

/// Totals both tills of `record` and their variance. Fails only if a total cannot be kept to
/// the cent, which amounts below [`Amount::LIMIT`] never reach.
pub fn reconcile(record: &DailyRecord) -> Result<Reconciliation> {
    let till_a_total = record.till_a_cash.checked_add(record.till_a_card)?;
    let till_b_total = record.till_b_cash.checked_add(record.till_b_card)?;
    Ok(Reconciliation {
        till_a_total,
        till_b_total,
        variance: till_a_total.checked_sub(till_b_total)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn record(a_cash: &str, a_card: &str, b_cash: &str, b_card: &str) -> DailyRecord {
        DailyRecord::new(
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            Amount::from_str(a_cash).unwrap(),
            Amount::from_str(a_card).unwrap(),
            Amount::from_str(b_cash).unwrap(),
            Amount::from_str(b_card).unwrap(),
        )
    }

    #[test]
    fn test_surplus_and_shortage() {
        let r = reconcile(&record("500", "200", "300", "350")).unwrap();
        assert_eq!(r.till_a_total, Amount::cents(70000));
        assert_eq!(r.till_b_total, Amount::cents(65000));
        assert_eq!(r.variance, Amount::cents(5000));
        assert_eq!(r.balance(), Balance::Surplus);

        let r = reconcile(&record("100", "0", "100", "0.01")).unwrap();
        assert_eq!(r.variance, Amount::cents(-1));
        assert_eq!(r.balance(), Balance::Shortage);
    }

    #[test]
    fn test_all_zero_is_neutral() {
        let r = reconcile(&DailyRecord::zeroed(
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        ))
        .unwrap();
        assert!(r.variance.is_zero());
        assert_eq!(r.balance(), Balance::Neutral);
    }

    #[test]
    fn test_amounts_that_float_would_miss_are_neutral() {
        // 0.1 + 0.2 != 0.3 in binary floating point
        let r = reconcile(&record("0.10", "0.20", "0.30", "0")).unwrap();
        assert_eq!(r.variance, Amount::ZERO);
        assert_eq!(r.balance(), Balance::Neutral);
    }

    #[test]
    fn test_variance_is_difference_of_totals() {
        for (a, b, c, d) in [
            ("1.01", "2.02", "3.03", "4.04"),
            ("999999.99", "0.01", "0", "1000000"),
            ("12.34", "0", "0", "12.34"),
        ] {
            let r = reconcile(&record(a, b, c, d)).unwrap();
            assert_eq!(r.variance, r.till_a_total.checked_sub(r.till_b_total).unwrap());
        }
    }

    #[test]
    fn test_largest_takings() {
        let largest = "999999999999999.99";
        let r = reconcile(&record(largest, largest, "0", largest)).unwrap();
        assert_eq!(r.till_a_total.to_string(), "1999999999999999.98");
        assert_eq!(r.till_b_total.to_string(), largest);
        assert_eq!(r.variance.to_string(), largest);
        assert_eq!(r.balance(), Balance::Surplus);

        let r = reconcile(&record("0", "0", largest, largest)).unwrap();
        assert_eq!(r.variance.to_string(), "-1999999999999999.98");
        assert_eq!(r.balance(), Balance::Shortage);
    }

    #[test]
    fn test_balance_display() {
        assert_eq!(Balance::Surplus.to_string(), "surplus");
        assert_eq!(Balance::Neutral.to_string(), "neutral");
    }
}
