//! Wire types exchanged with the booking
//! backend.
//!
//! Field names follow the JSON the server
//! emits (`_id`, `panditid`, `createdAt`,
//! ...); the Rust side uses snake_case
//! names and `serde` renames.

use serde::{
  Deserialize,
  Deserializer,
  Serialize
};

pub const UNKNOWN_NAME: &str =
  "Unknown";

fn null_as_default<'de, D, T>(
  deserializer: D
) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>
{
  Ok(
    Option::<T>::deserialize(
      deserializer
    )?
    .unwrap_or_default()
  )
}

fn non_empty(
  value: Option<&str>
) -> Option<&str> {
  value.filter(|v| !v.trim().is_empty())
}

/// Nested document reference. The server
/// populates it with an object, but older
/// records carry only the bare id.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(untagged)]
pub enum RecordRef {
  Populated(RefSummary),
  Id(String),
  Other(serde_json::Value)
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct RefSummary {
  #[serde(rename = "_id", default)]
  pub id:    Option<String>,
  #[serde(default)]
  pub name:  Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub email: Option<String>
}

impl RecordRef {
  pub fn name(&self) -> Option<&str> {
    match self {
      | RecordRef::Populated(summary) => {
        non_empty(summary.name.as_deref())
      }
      | _ => None
    }
  }

  pub fn id(&self) -> Option<&str> {
    match self {
      | RecordRef::Populated(summary) => {
        non_empty(summary.id.as_deref())
      }
      | RecordRef::Id(id) => {
        non_empty(Some(id.as_str()))
      }
      | RecordRef::Other(_) => None
    }
  }

  pub fn phone(&self) -> Option<&str> {
    match self {
      | RecordRef::Populated(summary) => {
        non_empty(summary.phone.as_deref())
      }
      | _ => None
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct BookingRecord {
  #[serde(
    rename = "_id",
    alias = "id",
    default,
    deserialize_with = "null_as_default"
  )]
  pub id:         String,
  #[serde(default)]
  pub status:     Option<String>,
  #[serde(default)]
  pub puja_date:  Option<String>,
  #[serde(default)]
  pub date:       Option<String>,
  #[serde(default)]
  pub puja_time:  Option<String>,
  #[serde(rename = "panditid", default)]
  pub pandit:     Option<RecordRef>,
  #[serde(rename = "userid", default)]
  pub devotee:    Option<RecordRef>,
  #[serde(rename = "serviceid", default)]
  pub service:    Option<RecordRef>,
  #[serde(default)]
  pub location:   Option<String>,
  #[serde(rename = "createdAt", default)]
  pub created_at: Option<String>,
  #[serde(rename = "SamanList", default)]
  pub saman_list: Option<String>
}

impl BookingRecord {
  /// Scheduled date as sent by the
  /// server. `puja_date` wins over the
  /// legacy `date` field; blank values
  /// count as absent.
  pub fn resolved_date(
    &self
  ) -> Option<&str> {
    non_empty(self.puja_date.as_deref())
      .or_else(|| {
        non_empty(self.date.as_deref())
      })
  }

  pub fn raw_status_lower(
    &self
  ) -> Option<String> {
    self
      .status
      .as_deref()
      .map(str::to_lowercase)
  }

  pub fn pandit_name(&self) -> &str {
    self
      .pandit
      .as_ref()
      .and_then(RecordRef::name)
      .unwrap_or(UNKNOWN_NAME)
  }

  pub fn devotee_name(&self) -> &str {
    self
      .devotee
      .as_ref()
      .and_then(RecordRef::name)
      .unwrap_or(UNKNOWN_NAME)
  }

  pub fn service_name(&self) -> &str {
    self
      .service
      .as_ref()
      .and_then(RecordRef::name)
      .unwrap_or(UNKNOWN_NAME)
  }

  /// Raw status with the first letter
  /// upper-cased, as shown in tables.
  pub fn status_label(&self) -> String {
    match non_empty(
      self.status.as_deref()
    ) {
      | Some(raw) => {
        let mut chars = raw.chars();
        match chars.next() {
          | Some(first) => {
            first
              .to_uppercase()
              .chain(chars)
              .collect()
          }
          | None => {
            UNKNOWN_NAME.to_string()
          }
        }
      }
      | None => UNKNOWN_NAME.to_string()
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct Pandit {
  #[serde(
    rename = "_id",
    alias = "id",
    default,
    deserialize_with = "null_as_default"
  )]
  pub id:                String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub name:              String,
  #[serde(default)]
  pub email:             Option<String>,
  #[serde(default)]
  pub phone:             Option<String>,
  #[serde(default)]
  pub city:              Option<String>,
  #[serde(rename = "experienceYears", default)]
  pub experience_years:
    Option<serde_json::Value>,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub languages:         Vec<String>,
  #[serde(
    alias = "speciality",
    default,
    deserialize_with = "null_as_default"
  )]
  pub specialties:       Vec<String>,
  #[serde(default)]
  pub bio:               Option<String>,
  #[serde(default)]
  pub profile_photo_url: Option<String>,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub is_verified:       bool
}

impl Pandit {
  /// Experience as text; the server
  /// stores either a number or the raw
  /// form string.
  pub fn experience_text(
    &self
  ) -> Option<String> {
    match self.experience_years.as_ref()?
    {
      | serde_json::Value::String(s) => {
        Some(s.trim().to_string())
      }
      | serde_json::Value::Number(n) => {
        Some(n.to_string())
      }
      | _ => None
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct Devotee {
  #[serde(
    rename = "_id",
    alias = "id",
    default,
    deserialize_with = "null_as_default"
  )]
  pub id:      String,
  #[serde(default)]
  pub name:    Option<String>,
  #[serde(default)]
  pub email:   Option<String>,
  #[serde(default)]
  pub phone:   Option<String>,
  #[serde(default)]
  pub city:    Option<String>,
  #[serde(default)]
  pub address: Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct Pooja {
  #[serde(
    rename = "_id",
    alias = "id",
    default,
    deserialize_with = "null_as_default"
  )]
  pub id:          String,
  #[serde(default)]
  pub name:        Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(rename = "imageUrl", default)]
  pub image_url:   Option<String>
}

/// Public service card shown on the
/// home page. `image` is used as sent.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct Service {
  #[serde(
    rename = "_id",
    alias = "id",
    default,
    deserialize_with = "null_as_default"
  )]
  pub id:          String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub image:       Option<String>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct BookingCreate {
  #[serde(rename = "userid")]
  pub user_id:    String,
  #[serde(rename = "panditid")]
  pub pandit_id:  String,
  #[serde(rename = "serviceid")]
  pub service_id: String,
  pub puja_date:  String,
  pub puja_time:  String,
  pub location:   String,
  #[serde(rename = "SamanList")]
  pub saman_list: String,
  #[serde(rename = "userName")]
  pub user_name:  String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct BookingStatusUpdate {
  pub status: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
pub struct BookingStatusResponse {
  #[serde(default)]
  pub booking: Option<BookingRecord>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct PoojaForm {
  pub name:        String,
  pub description: String,
  #[serde(rename = "imageUrl")]
  pub image_url:   String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct DevoteeUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>
}

impl DevoteeUpdate {
  pub fn is_empty(&self) -> bool {
    self.phone.is_none()
      && self.city.is_none()
      && self.address.is_none()
  }
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct ReviewCreate {
  pub name:    String,
  pub rating:  u8,
  pub comment: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct PanditSignupPayload {
  pub name:              String,
  pub phone:             String,
  pub email:             String,
  pub password:          String,
  pub city:              String,
  #[serde(rename = "experienceYears")]
  pub experience_years:  String,
  pub languages:         Vec<String>,
  pub specialties:       Vec<String>,
  pub bio:               String,
  pub profile_photo_url: String
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn booking_accepts_populated_and_bare_refs(
  ) {
    let raw = r#"[
      {"_id":"b1","status":"Pending","puja_date":"2024-01-10",
       "panditid":{"_id":"p1","name":"Sharma"},"userid":"u1"},
      {"_id":"b2","date":"2024-02-05","panditid":null,"serviceid":42}
    ]"#;

    let records: Vec<BookingRecord> =
      serde_json::from_str(raw)
        .expect("parse bookings");

    assert_eq!(records[0].pandit_name(), "Sharma");
    assert_eq!(records[0].devotee_name(), UNKNOWN_NAME);
    assert_eq!(
      records[0]
        .devotee
        .as_ref()
        .and_then(RecordRef::id),
      Some("u1")
    );
    assert_eq!(records[1].pandit_name(), UNKNOWN_NAME);
    assert_eq!(records[1].service_name(), UNKNOWN_NAME);
    assert_eq!(
      records[1].resolved_date(),
      Some("2024-02-05")
    );
  }

  #[test]
  fn puja_date_wins_unless_blank() {
    let mut record = BookingRecord {
      puja_date: Some(
        "2024-03-01".to_string()
      ),
      date: Some(
        "2023-12-31".to_string()
      ),
      ..BookingRecord::default()
    };
    assert_eq!(
      record.resolved_date(),
      Some("2024-03-01")
    );

    record.puja_date =
      Some(String::new());
    assert_eq!(
      record.resolved_date(),
      Some("2023-12-31")
    );

    record.date = None;
    assert_eq!(
      record.resolved_date(),
      None
    );
  }

  #[test]
  fn status_label_capitalizes_raw_value() {
    let mut record =
      BookingRecord::default();
    assert_eq!(record.status_label(), "Unknown");

    record.status =
      Some("completed".to_string());
    assert_eq!(record.status_label(), "Completed");
  }

  #[test]
  fn pandit_experience_accepts_number_or_string(
  ) {
    let raw = r#"[
      {"_id":"p1","name":"A","experienceYears":12,"is_verified":true},
      {"_id":"p2","name":"B","experienceYears":"7","speciality":["Griha Pravesh"]}
    ]"#;
    let pandits: Vec<Pandit> =
      serde_json::from_str(raw)
        .expect("parse pandits");

    assert_eq!(
      pandits[0].experience_text().as_deref(),
      Some("12")
    );
    assert_eq!(
      pandits[1].experience_text().as_deref(),
      Some("7")
    );
    assert_eq!(
      pandits[1].specialties,
      vec!["Griha Pravesh".to_string()]
    );
    assert!(!pandits[1].is_verified);
  }

  #[test]
  fn booking_create_uses_server_field_names(
  ) {
    let payload = BookingCreate {
      user_id:    "u1".to_string(),
      pandit_id:  "p1".to_string(),
      service_id: "s1".to_string(),
      puja_date:  "2024-05-01".to_string(),
      puja_time:  "09:30".to_string(),
      location:   "Pune".to_string(),
      saman_list: String::new(),
      user_name:  "Asha".to_string()
    };
    let value = serde_json::to_value(&payload)
      .expect("serialize payload");

    assert_eq!(value["userid"], "u1");
    assert_eq!(value["panditid"], "p1");
    assert_eq!(value["serviceid"], "s1");
    assert_eq!(value["SamanList"], "");
    assert_eq!(value["userName"], "Asha");
  }

  #[test]
  fn service_tolerates_missing_fields() {
    let raw = r#"[
      {"_id":"s1","name":"Havan","image":"https://cdn.example.org/havan.jpg"},
      {"_id":"s2","name":null}
    ]"#;
    let services: Vec<Service> =
      serde_json::from_str(raw)
        .expect("parse services");

    assert_eq!(services[0].name, "Havan");
    assert_eq!(
      services[0].image.as_deref(),
      Some("https://cdn.example.org/havan.jpg")
    );
    assert_eq!(services[1].name, "");
    assert_eq!(services[1].description, None);
  }
}
