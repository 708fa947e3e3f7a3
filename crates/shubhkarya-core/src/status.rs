use std::fmt;

use serde::{
  Serialize,
  Serializer
};

/// Canonical booking status. Every screen
/// buckets through [`StatusBucket::normalize`].
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
pub enum StatusBucket {
  Pending,
  Confirmed,
  Completed,
  Cancelled,
  Rejected,
  Unknown,
  Other(String)
}

impl StatusBucket {
  /// Lower-cases the raw label, folds
  /// `accepted` into `confirmed`, and maps
  /// missing or blank labels to `unknown`.
  #[must_use]
  pub fn normalize(
    raw: Option<&str>
  ) -> Self {
    let Some(raw) = raw else {
      return StatusBucket::Unknown;
    };
    if raw.is_empty() {
      return StatusBucket::Unknown;
    }

    let lower = raw.to_lowercase();
    match lower.as_str() {
      | "pending" => StatusBucket::Pending,
      | "accepted" | "confirmed" => {
        StatusBucket::Confirmed
      }
      | "completed" => {
        StatusBucket::Completed
      }
      | "cancelled" => {
        StatusBucket::Cancelled
      }
      | "rejected" => {
        StatusBucket::Rejected
      }
      | "unknown" => StatusBucket::Unknown,
      | _ => StatusBucket::Other(lower)
    }
  }

  #[must_use]
  pub fn as_key(&self) -> &str {
    match self {
      | StatusBucket::Pending => "pending",
      | StatusBucket::Confirmed => {
        "confirmed"
      }
      | StatusBucket::Completed => {
        "completed"
      }
      | StatusBucket::Cancelled => {
        "cancelled"
      }
      | StatusBucket::Rejected => {
        "rejected"
      }
      | StatusBucket::Unknown => "unknown",
      | StatusBucket::Other(key) => {
        key.as_str()
      }
    }
  }

  /// Accepted and confirmed bookings are
  /// the ones a pandit has committed to.
  #[must_use]
  pub fn is_confirmed(&self) -> bool {
    *self == StatusBucket::Confirmed
  }
}

impl fmt::Display for StatusBucket {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

impl Serialize for StatusBucket {
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(self.as_key())
  }
}

#[cfg(test)]
mod tests {
  use super::StatusBucket;

  #[test]
  fn normalizes_case_and_synonyms() {
    assert_eq!(
      StatusBucket::normalize(Some("Pending")),
      StatusBucket::Pending
    );
    assert_eq!(
      StatusBucket::normalize(Some("ACCEPTED")),
      StatusBucket::Confirmed
    );
    assert_eq!(
      StatusBucket::normalize(Some("Confirmed")),
      StatusBucket::Confirmed
    );
    assert_eq!(
      StatusBucket::normalize(None),
      StatusBucket::Unknown
    );
    assert_eq!(
      StatusBucket::normalize(Some("")),
      StatusBucket::Unknown
    );
  }

  #[test]
  fn keeps_unrecognized_labels_lowercased() {
    let bucket =
      StatusBucket::normalize(Some("On Hold"));
    assert_eq!(
      bucket,
      StatusBucket::Other("on hold".to_string())
    );
    assert_eq!(bucket.to_string(), "on hold");
  }
}
