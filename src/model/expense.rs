use crate::model::{Amount, Category, Period};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The storage-assigned identity of an expense. Ids are never reused, even after a delete.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(i64);

impl ExpenseId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ExpenseId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExpenseId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(ExpenseId)
            .map_err(|_| Error::validation(format!("'{s}' is not an expense id")))
    }
}

/// A stored expense line item.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub period: Period,
    pub category: Category,
    pub sub_category: Option<String>,
    /// Payer or subscriber name, or a description.
    pub title: String,
    /// Subscriber or account number.
    pub reference_number: Option<String>,
    pub amount: Amount,
    pub is_paid: bool,
}

/// An expense that has not been stored yet and so has no id.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NewExpense {
    pub period: Period,
    pub category: Category,
    pub sub_category: Option<String>,
    pub title: String,
    pub reference_number: Option<String>,
    pub amount: Amount,
    pub is_paid: bool,
}

impl NewExpense {
    /// Creates an unpaid expense with no sub-category or reference number.
    pub fn new(period: Period, category: Category, title: impl Into<String>, amount: Amount) -> Self {
        Self {
            period,
            category,
            sub_category: None,
            title: title.into(),
            reference_number: None,
            amount,
            is_paid: false,
        }
    }

    pub fn with_sub_category(mut self, sub_category: impl Into<String>) -> Self {
        self.sub_category = Some(sub_category.into());
        self
    }

    pub fn with_reference_number(mut self, reference_number: impl Into<String>) -> Self {
        self.reference_number = Some(reference_number.into());
        self
    }

    pub fn paid(mut self, is_paid: bool) -> Self {
        self.is_paid = is_paid;
        self
    }

    /// Trims the text fields and turns blank optional fields into `None`. Fails if the title is
    /// blank, or if a reference number is given for a category that does not carry one.
    pub(crate) fn normalized(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::validation("An expense requires a title"));
        }
        let reference_number = blank_to_none(self.reference_number);
        if reference_number.is_some() && !self.category.has_reference_number() {
            return Err(Error::validation(format!(
                "{} expenses do not take a reference number",
                self.category
            )));
        }
        Ok(Self {
            title,
            sub_category: blank_to_none(self.sub_category),
            reference_number,
            ..self
        })
    }
}

fn blank_to_none(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
