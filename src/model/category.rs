use serde::{Deserialize, Serialize};

/// The closed set of expense kinds that partition the expenses of a period.
///
/// Storage keeps the kebab-case name (e.g. `self-employment-contribution`) as text and does not
/// itself check membership; typed callers can only produce members of this set.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Electricity,
    Internet,
    SelfEmploymentContribution,
    MobilePhones,
    NaturalGas,
    MarketExpenses,
}

serde_plain::derive_display_from_serialize!(Category);
serde_plain::derive_fromstr_from_deserialize!(Category);

impl Category {
    /// Every category, in the order they are presented.
    pub const ALL: [Category; 6] = [
        Category::Electricity,
        Category::Internet,
        Category::SelfEmploymentContribution,
        Category::MobilePhones,
        Category::NaturalGas,
        Category::MarketExpenses,
    ];

    /// Whether items in this category carry a subscriber/account number. Contributions are
    /// recorded against a person's name only.
    pub fn has_reference_number(&self) -> bool {
        !matches!(self, Category::SelfEmploymentContribution)
    }
}
