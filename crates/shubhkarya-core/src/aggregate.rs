use std::collections::BTreeMap;
use std::convert::Infallible;
use std::str::FromStr;

use chrono_tz::Tz;
use shubhkarya_shared::BookingRecord;
use tracing::debug;

use crate::datekey::{
  TimeGrouping,
  resolve_booking_date
};
use crate::status::StatusBucket;

/// Status selector of the history screen.
///
/// `Raw` compares against the record's raw
/// status lower-cased, not against its
/// bucket: `accepted` does not match a
/// record stored as `Confirmed`.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub enum StatusFilter {
  #[default]
  All,
  Raw(String)
}

impl StatusFilter {
  #[must_use]
  pub fn parse(input: &str) -> Self {
    let token = input.trim();
    if token.is_empty()
      || token.eq_ignore_ascii_case("all")
    {
      StatusFilter::All
    } else {
      StatusFilter::Raw(
        token.to_lowercase()
      )
    }
  }

  #[must_use]
  pub fn matches(
    &self,
    record: &BookingRecord
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Raw(wanted) => {
        record
          .raw_status_lower()
          .is_some_and(|s| s == *wanted)
      }
    }
  }

  #[must_use]
  pub fn as_str(&self) -> &str {
    match self {
      | StatusFilter::All => "all",
      | StatusFilter::Raw(value) => {
        value.as_str()
      }
    }
  }
}

impl FromStr for StatusFilter {
  type Err = Infallible;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Ok(Self::parse(s))
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct BookingQuery {
  pub status:      StatusFilter,
  /// Empty means no date filter. A full
  /// `YYYY-MM-DD` selects one day, shorter
  /// prefixes select a month or year.
  pub date_prefix: String,
  pub grouping:    TimeGrouping
}

impl BookingQuery {
  #[must_use]
  pub fn matches_date(
    &self,
    record: &BookingRecord
  ) -> bool {
    if self.date_prefix.is_empty() {
      return true;
    }
    record.resolved_date().is_some_and(
      |date| {
        date.starts_with(
          self.date_prefix.as_str()
        )
      }
    )
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingAggregate<'a> {
  pub total:         usize,
  pub filtered:      Vec<&'a BookingRecord>,
  pub status_counts:
    BTreeMap<StatusBucket, usize>,
  pub time_buckets:  BTreeMap<String, usize>
}

impl BookingAggregate<'_> {
  #[must_use]
  pub fn count(
    &self,
    bucket: &StatusBucket
  ) -> usize {
    self
      .status_counts
      .get(bucket)
      .copied()
      .unwrap_or(0)
  }

  /// Bucket keys in ascending order; the
  /// fixed-width keys sort
  /// chronologically.
  #[must_use]
  pub fn sorted_bucket_keys(
    &self
  ) -> Vec<&str> {
    self
      .time_buckets
      .keys()
      .map(String::as_str)
      .collect()
  }

  #[must_use]
  pub fn series(
    &self
  ) -> Vec<(String, usize)> {
    self
      .time_buckets
      .iter()
      .map(|(key, count)| {
        (key.clone(), *count)
      })
      .collect()
  }
}

#[derive(Debug, Clone)]
pub struct BookingAggregator {
  timezone: Tz
}

impl BookingAggregator {
  #[must_use]
  pub fn new(timezone: Tz) -> Self {
    Self {
      timezone
    }
  }

  /// Filtered list and status counts
  /// honour both filters; the time series
  /// honours only the status filter.
  #[tracing::instrument(skip_all, fields(
    records = records.len(),
    status = query.status.as_str(),
    date = %query.date_prefix
  ))]
  pub fn aggregate<'a>(
    &self,
    records: &'a [BookingRecord],
    query: &BookingQuery
  ) -> BookingAggregate<'a> {
    let filtered: Vec<&BookingRecord> =
      records
        .iter()
        .filter(|record| {
          query.status.matches(record)
            && query.matches_date(record)
        })
        .collect();

    let status_counts = count_statuses(
      filtered.iter().copied()
    );

    let mut time_buckets =
      BTreeMap::<String, usize>::new();
    for record in records {
      if !query.status.matches(record) {
        continue;
      }
      let Some(date) = record
        .resolved_date()
        .and_then(|raw| {
          resolve_booking_date(
            raw,
            &self.timezone
          )
        })
      else {
        continue;
      };
      *time_buckets
        .entry(query.grouping.key(date))
        .or_insert(0) += 1;
    }

    debug!(
      filtered = filtered.len(),
      buckets = time_buckets.len(),
      "aggregated bookings"
    );

    BookingAggregate {
      total: records.len(),
      filtered,
      status_counts,
      time_buckets
    }
  }
}

/// Per-bucket counts over any record set.
pub fn count_statuses<'a, I>(
  records: I
) -> BTreeMap<StatusBucket, usize>
where
  I: IntoIterator<Item = &'a BookingRecord>
{
  let mut counts = BTreeMap::new();
  for record in records {
    *counts
      .entry(StatusBucket::normalize(
        record.status.as_deref()
      ))
      .or_insert(0) += 1;
  }
  counts
}
