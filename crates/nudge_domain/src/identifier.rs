//! Identifier scheme shared by scheduling and removal.
//!
//! A weekday family is stored as one request per day under
//! `"{base}_{weekday}"`. Already-scheduled notifications depend on this exact
//! format, so both directions go through these helpers.

use crate::weekday::Weekday;

pub const WEEKDAY_SEPARATOR: char = '_';

/// Identifier of the single inactivity reminder.
pub const INACTIVITY_REMINDER_ID: &str = "dev.nudge.notifications.inactivity-reminder";

pub fn derive_weekday_id(base: &str, day: Weekday) -> String {
    format!("{base}{WEEKDAY_SEPARATOR}{}", day.value())
}

pub fn derive_weekday_ids(base: &str, days: impl IntoIterator<Item = Weekday>) -> Vec<String> {
    days.into_iter()
        .map(|day| derive_weekday_id(base, day))
        .collect()
}

/// Prefix shared by every member of a weekday family.
pub fn weekday_prefix(base: &str) -> String {
    format!("{base}{WEEKDAY_SEPARATOR}")
}

/// Splits a derived id back into its base and weekday. Returns `None` for
/// ids that were not produced by [`derive_weekday_id`].
pub fn parse_weekday_id(id: &str) -> Option<(&str, Weekday)> {
    let (base, suffix) = id.rsplit_once(WEEKDAY_SEPARATOR)?;
    if suffix.len() != 1 {
        return None;
    }
    let value: i64 = suffix.parse().ok()?;
    let day = Weekday::new(value).ok()?;
    Some((base, day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_bit_exact_ids() {
        assert_eq!(derive_weekday_id("water", Weekday::SUNDAY), "water_1");
        assert_eq!(derive_weekday_id("water", Weekday::SATURDAY), "water_7");
        assert_eq!(derive_weekday_id("a_b", Weekday::MONDAY), "a_b_2");
    }

    #[test]
    fn parse_inverts_derive() {
        for day in Weekday::all() {
            let id = derive_weekday_id("stretch_break", day);
            assert_eq!(parse_weekday_id(&id), Some(("stretch_break", day)));
        }
    }

    #[test]
    fn parse_rejects_foreign_ids() {
        assert_eq!(parse_weekday_id("plain"), None);
        assert_eq!(parse_weekday_id("water_8"), None);
        assert_eq!(parse_weekday_id("water_01"), None);
        assert_eq!(parse_weekday_id("water_"), None);
    }

    #[test]
    fn derived_ids_share_the_prefix() {
        let prefix = weekday_prefix("water");
        let ids = derive_weekday_ids("water", Weekday::all());
        assert_eq!(ids.len(), 7);
        assert!(ids.iter().all(|id| id.starts_with(&prefix)));
    }
}
