//! Screen view-models. Each one owns its
//! state, loads through [`BookingApi`],
//! and derives everything it shows from
//! that state on demand.
//!
//! [`BookingApi`]: crate::api::BookingApi

pub mod devotee_dashboard;
pub mod directory;
pub mod history;
pub mod home;
pub mod overview;
pub mod pandit_dashboard;
pub mod poojas;
pub mod signup;

use std::time::{
  Duration,
  Instant
};

use tracing::warn;

use crate::api::ApiError;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum FlashKind {
  Success,
  Error
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
  pub kind:   FlashKind,
  pub text:   String,
  expires_at: Instant
}

impl FlashMessage {
  #[must_use]
  pub fn is_error(&self) -> bool {
    self.kind == FlashKind::Error
  }

  #[must_use]
  pub fn expires_at(&self) -> Instant {
    self.expires_at
  }
}

/// A form message that disappears on its
/// own after `ttl`.
#[derive(Debug, Clone)]
pub struct Flash {
  ttl:     Duration,
  current: Option<FlashMessage>
}

impl Flash {
  #[must_use]
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      current: None
    }
  }

  pub fn success(
    &mut self,
    text: impl Into<String>,
    now: Instant
  ) {
    self.set(
      FlashKind::Success,
      text.into(),
      now
    );
  }

  pub fn error(
    &mut self,
    text: impl Into<String>,
    now: Instant
  ) {
    self.set(
      FlashKind::Error,
      text.into(),
      now
    );
  }

  pub fn clear(&mut self) {
    self.current = None;
  }

  /// The message if it has not expired
  /// yet at `now`.
  #[must_use]
  pub fn current(
    &self,
    now: Instant
  ) -> Option<&FlashMessage> {
    self
      .current
      .as_ref()
      .filter(|msg| now < msg.expires_at)
  }

  fn set(
    &mut self,
    kind: FlashKind,
    text: String,
    now: Instant
  ) {
    self.current = Some(FlashMessage {
      kind,
      text,
      expires_at: now + self.ttl
    });
  }
}

/// Stores a fetched list, or logs and keeps
/// what was there before.
pub(crate) fn settle<T>(
  slot: &mut Vec<T>,
  result: Result<Vec<T>, ApiError>,
  what: &'static str
) -> bool {
  match result {
    | Ok(items) => {
      *slot = items;
      true
    }
    | Err(err) => {
      warn!(
        error = %err,
        what,
        "fetch failed; keeping previous data"
      );
      false
    }
  }
}

pub(crate) fn contains_ci(
  haystack: Option<&str>,
  needle_lower: &str
) -> bool {
  haystack.is_some_and(|text| {
    text
      .to_lowercase()
      .contains(needle_lower)
  })
}

#[cfg(test)]
pub(crate) mod testing {
  //! In-memory backend for view-model
  //! tests.

  use std::sync::Mutex;

  use async_trait::async_trait;
  use shubhkarya_shared::{
    BookingCreate,
    BookingRecord,
    Devotee,
    DevoteeUpdate,
    Pandit,
    PanditSignupPayload,
    Pooja,
    PoojaForm,
    ReviewCreate,
    Service
  };

  use crate::api::{
    ApiError,
    BookingApi,
    BookingScope
  };

  #[derive(Debug, Default)]
  pub struct FakeApi {
    pub bookings:  Mutex<Vec<BookingRecord>>,
    pub pandits:   Mutex<Vec<Pandit>>,
    pub devotees:  Mutex<Vec<Devotee>>,
    pub poojas:    Mutex<Vec<Pooja>>,
    pub services:  Mutex<Vec<Service>>,
    pub fail:      Mutex<bool>,
    pub calls:     Mutex<Vec<String>>,
    pub created:   Mutex<Vec<BookingCreate>>,
    pub reviews:   Mutex<Vec<ReviewCreate>>,
    pub signups:
      Mutex<Vec<PanditSignupPayload>>,
    pub scopes:    Mutex<Vec<BookingScope>>,
    pub reject_with: Mutex<Option<String>>
  }

  impl FakeApi {
    pub fn set_failing(&self, fail: bool) {
      *self.fail.lock().expect("lock") = fail;
    }

    pub fn calls(&self) -> Vec<String> {
      self.calls.lock().expect("lock").clone()
    }

    fn record(
      &self,
      call: impl Into<String>
    ) -> Result<(), ApiError> {
      self
        .calls
        .lock()
        .expect("lock")
        .push(call.into());
      if *self.fail.lock().expect("lock") {
        return Err(ApiError::Network(
          "connection refused".to_string()
        ));
      }
      if let Some(message) = self
        .reject_with
        .lock()
        .expect("lock")
        .clone()
      {
        return Err(ApiError::Http {
          status:         400,
          server_message: Some(message)
        });
      }
      Ok(())
    }
  }

  #[async_trait]
  impl BookingApi for FakeApi {
    async fn list_bookings(
      &self,
      scope: &BookingScope
    ) -> Result<Vec<BookingRecord>, ApiError>
    {
      self.record("list_bookings")?;
      self
        .scopes
        .lock()
        .expect("lock")
        .push(scope.clone());
      Ok(
        self
          .bookings
          .lock()
          .expect("lock")
          .clone()
      )
    }

    async fn create_booking(
      &self,
      payload: &BookingCreate
    ) -> Result<(), ApiError> {
      self.record("create_booking")?;
      self
        .created
        .lock()
        .expect("lock")
        .push(payload.clone());
      Ok(())
    }

    async fn update_booking_status(
      &self,
      booking_id: &str,
      status: &str
    ) -> Result<Option<BookingRecord>, ApiError>
    {
      self.record(format!(
        "update_booking_status:{booking_id}"
      ))?;
      let bookings =
        self.bookings.lock().expect("lock");
      Ok(
        bookings
          .iter()
          .find(|b| b.id == booking_id)
          .cloned()
          .map(|mut b| {
            b.status = Some(status.to_string());
            b
          })
      )
    }

    async fn list_pandits(
      &self
    ) -> Result<Vec<Pandit>, ApiError> {
      self.record("list_pandits")?;
      Ok(
        self
          .pandits
          .lock()
          .expect("lock")
          .clone()
      )
    }

    async fn list_verified_pandits(
      &self
    ) -> Result<Vec<Pandit>, ApiError> {
      self.record("list_verified_pandits")?;
      Ok(
        self
          .pandits
          .lock()
          .expect("lock")
          .iter()
          .filter(|p| p.is_verified)
          .cloned()
          .collect()
      )
    }

    async fn verify_pandit(
      &self,
      pandit_id: &str
    ) -> Result<(), ApiError> {
      self.record(format!(
        "verify_pandit:{pandit_id}"
      ))?;
      for pandit in self
        .pandits
        .lock()
        .expect("lock")
        .iter_mut()
      {
        if pandit.id == pandit_id {
          pandit.is_verified = true;
        }
      }
      Ok(())
    }

    async fn delete_pandit(
      &self,
      pandit_id: &str
    ) -> Result<(), ApiError> {
      self.record(format!(
        "delete_pandit:{pandit_id}"
      ))?;
      self
        .pandits
        .lock()
        .expect("lock")
        .retain(|p| p.id != pandit_id);
      Ok(())
    }

    async fn signup_pandit(
      &self,
      payload: &PanditSignupPayload
    ) -> Result<(), ApiError> {
      self.record("signup_pandit")?;
      self
        .signups
        .lock()
        .expect("lock")
        .push(payload.clone());
      Ok(())
    }

    async fn list_devotees(
      &self
    ) -> Result<Vec<Devotee>, ApiError> {
      self.record("list_devotees")?;
      Ok(
        self
          .devotees
          .lock()
          .expect("lock")
          .clone()
      )
    }

    async fn update_devotee(
      &self,
      devotee_id: &str,
      patch: &DevoteeUpdate
    ) -> Result<(), ApiError> {
      self.record(format!(
        "update_devotee:{devotee_id}"
      ))?;
      for devotee in self
        .devotees
        .lock()
        .expect("lock")
        .iter_mut()
      {
        if devotee.id == devotee_id {
          if let Some(city) = &patch.city {
            devotee.city = Some(city.clone());
          }
          if let Some(phone) = &patch.phone {
            devotee.phone =
              Some(phone.clone());
          }
        }
      }
      Ok(())
    }

    async fn list_poojas(
      &self
    ) -> Result<Vec<Pooja>, ApiError> {
      self.record("list_poojas")?;
      Ok(
        self
          .poojas
          .lock()
          .expect("lock")
          .clone()
      )
    }

    async fn add_pooja(
      &self,
      form: &PoojaForm
    ) -> Result<(), ApiError> {
      self.record("add_pooja")?;
      let mut poojas =
        self.poojas.lock().expect("lock");
      let id = format!("pj{}", poojas.len() + 1);
      poojas.push(Pooja {
        id,
        name: Some(form.name.clone()),
        description: Some(
          form.description.clone()
        ),
        image_url: Some(
          form.image_url.clone()
        )
      });
      Ok(())
    }

    async fn update_pooja(
      &self,
      pooja_id: &str,
      form: &PoojaForm
    ) -> Result<(), ApiError> {
      self.record(format!(
        "update_pooja:{pooja_id}"
      ))?;
      for pooja in self
        .poojas
        .lock()
        .expect("lock")
        .iter_mut()
      {
        if pooja.id == pooja_id {
          pooja.name =
            Some(form.name.clone());
          pooja.description = Some(
            form.description.clone()
          );
        }
      }
      Ok(())
    }

    async fn delete_pooja(
      &self,
      pooja_id: &str
    ) -> Result<(), ApiError> {
      self.record(format!(
        "delete_pooja:{pooja_id}"
      ))?;
      self
        .poojas
        .lock()
        .expect("lock")
        .retain(|p| p.id != pooja_id);
      Ok(())
    }

    async fn create_review(
      &self,
      review: &ReviewCreate
    ) -> Result<(), ApiError> {
      self.record("create_review")?;
      self
        .reviews
        .lock()
        .expect("lock")
        .push(review.clone());
      Ok(())
    }

    async fn list_services(
      &self
    ) -> Result<Vec<Service>, ApiError> {
      self.record("list_services")?;
      Ok(
        self
          .services
          .lock()
          .expect("lock")
          .clone()
      )
    }
  }
}
