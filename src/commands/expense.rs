use crate::commands::{column, Out};
use crate::model::{Category, Expense, ExpenseId, NewExpense, Period};
use crate::{Amount, Db, Error, Result};

fn render_line(e: &Expense) -> String {
    let mut line = format!(
        "  #{:<5} {:<30} {}  {}",
        e.id.to_string(),
        e.category.to_string(),
        column(e.amount),
        if e.is_paid { "paid  " } else { "unpaid" }
    );
    line.push_str(&format!("  {}", e.title));
    if let Some(sub) = &e.sub_category {
        line.push_str(&format!(" / {sub}"));
    }
    if let Some(reference) = &e.reference_number {
        line.push_str(&format!(" [{reference}]"));
    }
    line
}

/// Lists the expenses of `period`, either of one category or of all of them.
pub async fn expense_list(
    db: &Db,
    period: Period,
    category: Option<Category>,
) -> Result<Out<Vec<Expense>>> {
    let expenses = match category {
        Some(category) => db.list_expenses(period, category).await?,
        None => db.list_expenses_in_period(period).await?,
    };
    if expenses.is_empty() {
        return Ok(Out::new(format!("No expenses for {period}"), expenses));
    }
    let total = Amount::checked_sum(expenses.iter().map(|e| e.amount))?;
    let mut message = format!("Expenses for {period}");
    for e in &expenses {
        message.push('\n');
        message.push_str(&render_line(e));
    }
    message.push_str(&format!("\n  Total {total}"));
    Ok(Out::new(message, expenses))
}

pub async fn expense_add(db: &Db, expense: NewExpense) -> Result<Out<Expense>> {
    let id = db.add_expense(expense).await?;
    let added = fetch(db, id).await?;
    Ok(Out::new(format!("Added\n{}", render_line(&added)), added))
}

pub async fn expense_paid(db: &Db, id: ExpenseId, paid: bool) -> Result<Out<Expense>> {
    db.set_expense_paid(id, paid).await?;
    let expense = fetch(db, id).await?;
    Ok(Out::new(render_line(&expense), expense))
}

pub async fn expense_toggle(db: &Db, id: ExpenseId) -> Result<Out<Expense>> {
    db.toggle_expense_paid(id).await?;
    let expense = fetch(db, id).await?;
    Ok(Out::new(render_line(&expense), expense))
}

pub async fn expense_delete(db: &Db, id: ExpenseId) -> Result<Out<()>> {
    db.delete_expense(id).await?;
    Ok(format!("Deleted expense #{id}").into())
}

async fn fetch(db: &Db, id: ExpenseId) -> Result<Expense> {
    db.get_expense(id)
        .await?
        .ok_or_else(|| Error::not_found("Expense", id))
}
