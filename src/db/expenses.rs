//! Expense line items, grouped by period and category.

use super::{decode_amount, decode_bool, encode_amount, encode_bool, Db};
use crate::error::Context;
use crate::model::{Amount, Category, Expense, ExpenseId, NewExpense, Period};
use crate::{Error, Result};
use std::str::FromStr;
use tracing::debug;

const SELECT_EXPENSE: &str = "SELECT id, period, category, sub_category, title, \
    reference_number, amount, is_paid FROM expenses";

#[derive(sqlx::FromRow)]
struct ExpenseRow {
    id: i64,
    period: String,
    category: String,
    sub_category: Option<String>,
    title: String,
    reference_number: Option<String>,
    amount: String,
    is_paid: i64,
}

impl ExpenseRow {
    fn decode(self) -> Result<Expense> {
        let category = Category::from_str(&self.category).map_err(|_| {
            Error::validation(format!(
                "Expense {} has an unknown category '{}'",
                self.id, self.category
            ))
        })?;
        Ok(Expense {
            id: ExpenseId::from(self.id),
            period: Period::from_str(&self.period)?,
            category,
            sub_category: self.sub_category,
            title: self.title,
            reference_number: self.reference_number,
            amount: decode_amount("amount", &self.amount)?,
            is_paid: decode_bool("is_paid", self.is_paid)?,
        })
    }
}

impl Db {
    /// Stores a new expense and returns its assigned id.
    pub async fn add_expense(&self, expense: NewExpense) -> Result<ExpenseId> {
        let expense = expense.normalized()?;
        let _access = self.write_access().await?;
        let result = sqlx::query(
            "INSERT INTO expenses \
            (period, category, sub_category, title, reference_number, amount, is_paid) \
            VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(expense.period.to_string())
        .bind(expense.category.to_string())
        .bind(expense.sub_category.as_deref())
        .bind(expense.title.as_str())
        .bind(expense.reference_number.as_deref())
        .bind(encode_amount(expense.amount))
        .bind(encode_bool(expense.is_paid))
        .execute(self.pool())
        .await
        .context("Failed to add the expense")?;
        let id = ExpenseId::from(result.last_insert_rowid());
        debug!(
            "Added expense {id} to {} {} for {}",
            expense.period, expense.category, expense.amount
        );
        Ok(id)
    }

    /// Returns the expense with `id`, or `None` if there is none.
    pub async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let _access = self.read_access().await?;
        let row: Option<ExpenseRow> = sqlx::query_as(&format!("{SELECT_EXPENSE} WHERE id = ?"))
            .bind(id.value())
            .fetch_optional(self.pool())
            .await
            .with_context(|| format!("Failed to read expense {id}"))?;
        row.map(ExpenseRow::decode).transpose()
    }

    /// Returns the expenses of `period` in `category`, in the order they were added.
    pub async fn list_expenses(&self, period: Period, category: Category) -> Result<Vec<Expense>> {
        let _access = self.read_access().await?;
        let rows: Vec<ExpenseRow> = sqlx::query_as(&format!(
            "{SELECT_EXPENSE} WHERE period = ? AND category = ? ORDER BY id"
        ))
        .bind(period.to_string())
        .bind(category.to_string())
        .fetch_all(self.pool())
        .await
        .with_context(|| format!("Failed to list {category} expenses for {period}"))?;
        rows.into_iter().map(ExpenseRow::decode).collect()
    }

    /// Returns every expense of `period`, ordered by category and then by insertion.
    pub async fn list_expenses_in_period(&self, period: Period) -> Result<Vec<Expense>> {
        let _access = self.read_access().await?;
        let rows: Vec<ExpenseRow> =
            sqlx::query_as(&format!("{SELECT_EXPENSE} WHERE period = ? ORDER BY id"))
                .bind(period.to_string())
                .fetch_all(self.pool())
                .await
                .with_context(|| format!("Failed to list expenses for {period}"))?;
        let mut expenses = rows
            .into_iter()
            .map(ExpenseRow::decode)
            .collect::<Result<Vec<_>>>()?;
        // Stable, so insertion order survives within a category
        expenses.sort_by_key(|e| e.category);
        Ok(expenses)
    }

    /// Sets the paid flag of one expense. Nothing else about the expense changes.
    pub async fn set_expense_paid(&self, id: ExpenseId, paid: bool) -> Result<()> {
        let _access = self.write_access().await?;
        let result = sqlx::query("UPDATE expenses SET is_paid = ? WHERE id = ?")
            .bind(encode_bool(paid))
            .bind(id.value())
            .execute(self.pool())
            .await
            .with_context(|| format!("Failed to update expense {id}"))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Expense", id));
        }
        debug!("Set expense {id} paid = {paid}");
        Ok(())
    }

    /// Flips the paid flag of one expense and returns the new value.
    pub async fn toggle_expense_paid(&self, id: ExpenseId) -> Result<bool> {
        let expense = self
            .get_expense(id)
            .await?
            .ok_or_else(|| Error::not_found("Expense", id))?;
        let paid = !expense.is_paid;
        self.set_expense_paid(id, paid).await?;
        Ok(paid)
    }

    /// Permanently deletes one expense. Deleting an id that does not exist, including one that
    /// was already deleted, is a `NotFound` error.
    pub async fn delete_expense(&self, id: ExpenseId) -> Result<()> {
        let _access = self.write_access().await?;
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id.value())
            .execute(self.pool())
            .await
            .with_context(|| format!("Failed to delete expense {id}"))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Expense", id));
        }
        debug!("Deleted expense {id}");
        Ok(())
    }

    /// The exact sum of the amounts of `period` in `category`; zero when there are none.
    pub async fn sum_amounts_by_category(
        &self,
        period: Period,
        category: Category,
    ) -> Result<Amount> {
        let _access = self.read_access().await?;
        // Summed here rather than with SQL SUM(), which would go through floating point
        let amounts: Vec<String> =
            sqlx::query_scalar("SELECT amount FROM expenses WHERE period = ? AND category = ?")
                .bind(period.to_string())
                .bind(category.to_string())
                .fetch_all(self.pool())
                .await
                .with_context(|| format!("Failed to total {category} expenses for {period}"))?;
        amounts.iter().try_fold(Amount::ZERO, |total, a| {
            total.checked_add(decode_amount("amount", a)?)
        })
    }
}
