//! The recurrence interval enum.

use std::fmt;

use chrono::NaiveDate;
use serde::{de::Deserializer, Deserialize, Serialize};

use crate::calendar;

/// Cadence at which a recurrence produces ledger entries.
///
/// Input is matched case-insensitively. `annually` is accepted as an alias of
/// [`Interval::Yearly`], and any text that matches nothing is read as
/// [`Interval::Monthly`]. That fallback is intentional: stored definitions with
/// legacy or misspelled cadences keep producing monthly entries instead of
/// failing to load.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl Interval {
    pub const ALL: [Interval; 6] = [
        Interval::Daily,
        Interval::Weekly,
        Interval::Biweekly,
        Interval::Monthly,
        Interval::Quarterly,
        Interval::Yearly,
    ];

    /// Parses an interval name. Never fails; unknown names map to `Monthly`.
    pub fn parse(value: &str) -> Self {
        Self::recognize(value).unwrap_or(Interval::Monthly)
    }

    /// Returns the interval only when `value` names one explicitly.
    pub fn recognize(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Interval::Daily),
            "weekly" => Some(Interval::Weekly),
            "biweekly" => Some(Interval::Biweekly),
            "monthly" => Some(Interval::Monthly),
            "quarterly" => Some(Interval::Quarterly),
            "yearly" | "annually" => Some(Interval::Yearly),
            _ => None,
        }
    }

    /// Calculates the next occurrence after `from`.
    pub fn next_date(self, from: NaiveDate) -> NaiveDate {
        calendar::advance(from, self)
    }

    pub fn label(self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Biweekly => "biweekly",
            Interval::Monthly => "monthly",
            Interval::Quarterly => "quarterly",
            Interval::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Interval::parse(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Interval::parse("WEEKLY"), Interval::Weekly);
        assert_eq!(Interval::parse("BiWeekly"), Interval::Biweekly);
        assert_eq!(Interval::parse(" quarterly "), Interval::Quarterly);
    }

    #[test]
    fn annually_is_an_alias_of_yearly() {
        assert_eq!(Interval::parse("annually"), Interval::Yearly);
        assert_eq!(Interval::parse("Yearly"), Interval::Yearly);
    }

    #[test]
    fn unknown_names_fall_back_to_monthly() {
        assert_eq!(Interval::parse("fortnightly"), Interval::Monthly);
        assert_eq!(Interval::parse(""), Interval::Monthly);
        assert_eq!(Interval::recognize("fortnightly"), None);
    }

    #[test]
    fn deserialization_uses_the_lenient_parser() {
        let parsed: Interval = serde_json::from_str("\"Annually\"").expect("deserialize");
        assert_eq!(parsed, Interval::Yearly);
        let fallback: Interval = serde_json::from_str("\"every-other-tuesday\"").expect("fallback");
        assert_eq!(fallback, Interval::Monthly);
        assert_eq!(
            serde_json::to_string(&Interval::Biweekly).expect("serialize"),
            "\"biweekly\""
        );
    }
}
