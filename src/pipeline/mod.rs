// Reconciliation pipeline stages: parse, clean, detect, analyze, consolidate,
// and merge externally supplied corrections back into the sources.

pub mod clean;
pub mod consolidate;
pub mod correction;
pub mod disruption;
pub mod inconsistency;
pub mod tabular;

use chrono::NaiveDate;

/// Parse a date field the way the source exports write them: the supplier
/// feed uses `MM/DD/YYYY`, everything else ISO `YYYY-MM-DD`. Trying the
/// slash format first also settles the MM/DD vs DD/MM ambiguity in favor of
/// the supplier's US convention.
pub(crate) fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_supported_date_formats() {
        assert_eq!(
            parse_record_date("03/15/2024"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(
            parse_record_date(" 2024-03-15 "),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn unparsable_dates_are_none() {
        assert_eq!(parse_record_date("March 15"), None);
        assert_eq!(parse_record_date(""), None);
        assert_eq!(parse_record_date("15/03/2024"), None);
    }
}
