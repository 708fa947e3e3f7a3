use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};

/// Bucket size for the bookings-over-time
/// series.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeGrouping {
  Week,
  #[default]
  Month
}

impl TimeGrouping {
  #[must_use]
  pub fn key(
    self,
    date: NaiveDate
  ) -> String {
    match self {
      | TimeGrouping::Week => {
        week_key(date)
      }
      | TimeGrouping::Month => {
        month_key(date)
      }
    }
  }

  #[must_use]
  pub fn label(self) -> &'static str {
    match self {
      | TimeGrouping::Week => "Week",
      | TimeGrouping::Month => "Month"
    }
  }
}

/// `YYYY-Www`. The week number comes from
/// the Thursday of the date's Monday-based
/// week; the year label is the date's own
/// calendar year, so the last days of
/// December can read `YYYY-W01`.
///
/// The number is the ISO week of that
/// Thursday. Counting whole weeks from
/// January 4 instead would give `W00`
/// when the Thursday is January 1-3 and
/// lag ISO by one for much of the year.
#[must_use]
pub fn week_key(
  date: NaiveDate
) -> String {
  let day_nr = date
    .weekday()
    .num_days_from_monday()
    as i64;
  let thursday = date
    .checked_add_signed(Duration::days(
      3 - day_nr
    ))
    .unwrap_or(date);
  let week = thursday.ordinal0() / 7 + 1;

  format!(
    "{}-W{:02}",
    date.year(),
    week
  )
}

/// `YYYY-MM`, month 1-indexed.
#[must_use]
pub fn month_key(
  date: NaiveDate
) -> String {
  format!(
    "{}-{:02}",
    date.year(),
    date.month()
  )
}

/// Parses a booking date as the server
/// sends it: a bare `YYYY-MM-DD`, an RFC
/// 3339 timestamp (read in `timezone`), or
/// any string that starts with a date.
pub fn resolve_booking_date(
  raw: &str,
  timezone: &Tz
) -> Option<NaiveDate> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Some(date);
  }

  if let Ok(ts) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(
      ts.with_timezone(timezone)
        .date_naive()
    );
  }

  let parsed = token
    .get(..10)
    .and_then(|prefix| {
      NaiveDate::parse_from_str(
        prefix, "%Y-%m-%d"
      )
      .ok()
    });
  if parsed.is_none() {
    tracing::trace!(
      raw = token,
      "booking date not parseable"
    );
  }
  parsed
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn month_key_is_zero_padded() {
    assert_eq!(
      month_key(ymd(2024, 1, 10)),
      "2024-01"
    );
    assert_eq!(
      month_key(ymd(2024, 12, 31)),
      "2024-12"
    );
  }

  #[test]
  fn week_key_matches_iso_week_inside_year(
  ) {
    assert_eq!(
      week_key(ymd(2024, 1, 10)),
      "2024-W02"
    );
    assert_eq!(
      week_key(ymd(2024, 1, 4)),
      "2024-W01"
    );
    assert_eq!(
      week_key(ymd(2026, 1, 1)),
      "2026-W01"
    );
    assert_eq!(
      week_key(ymd(2020, 12, 31)),
      "2020-W53"
    );
  }

  #[test]
  fn week_number_counts_from_the_first_thursday(
  ) {
    assert_eq!(
      week_key(ymd(2025, 1, 1)),
      "2025-W01"
    );
    assert_eq!(
      week_key(ymd(2025, 1, 15)),
      "2025-W03"
    );
    assert_eq!(
      week_key(ymd(2026, 1, 8)),
      "2026-W02"
    );
  }

  #[test]
  fn week_key_keeps_calendar_year_label_at_boundaries(
  ) {
    // 2024-12-31 is in ISO week 1 of 2025
    assert_eq!(
      week_key(ymd(2024, 12, 31)),
      "2024-W01"
    );
    // 2021-01-01 is in ISO week 53 of 2020
    assert_eq!(
      week_key(ymd(2021, 1, 1)),
      "2021-W53"
    );
  }

  #[test]
  fn week_numbers_stay_in_range_for_every_day(
  ) {
    let mut day = ymd(2019, 1, 1);
    let end = ymd(2032, 12, 31);
    while day <= end {
      let key = week_key(day);
      let week: u32 = key[6..]
        .parse()
        .expect("numeric week");
      assert!(
        (1..=53).contains(&week),
        "{key} out of range"
      );
      assert_eq!(key.len(), 8);
      day = day.succ_opt().expect("next day");
    }
  }

  #[test]
  fn grouping_selects_keyer() {
    let date = ymd(2024, 2, 5);
    assert_eq!(
      TimeGrouping::Month.key(date),
      "2024-02"
    );
    assert_eq!(
      TimeGrouping::Week.key(date),
      "2024-W06"
    );
  }

  #[test]
  fn resolves_plain_and_timestamped_dates() {
    let tz = chrono_tz::Asia::Kolkata;
    assert_eq!(
      resolve_booking_date(
        "2024-01-10",
        &tz
      ),
      Some(ymd(2024, 1, 10))
    );
    assert_eq!(
      resolve_booking_date(
        "2024-01-10T20:00:00Z",
        &tz
      ),
      Some(ymd(2024, 1, 11))
    );
    assert_eq!(
      resolve_booking_date(
        "2024-01-10T08:00:00.000",
        &tz
      ),
      Some(ymd(2024, 1, 10))
    );
    assert_eq!(
      resolve_booking_date("soon", &tz),
      None
    );
    assert_eq!(
      resolve_booking_date("  ", &tz),
      None
    );
  }
}
