//! Types that represent the core data model: daily till counts, expenses and the values they
//! are keyed and measured by.
mod amount;
mod category;
mod daily;
mod expense;
mod period;

pub use amount::Amount;
pub use category::Category;
pub use daily::DailyRecord;
pub use expense::{Expense, ExpenseId, NewExpense};
pub use period::Period;
