//! Backend REST API as seen by the view-models.

mod error;
mod http;

use async_trait::async_trait;
use shubhkarya_shared::{
    BookingCreate, BookingRecord, Devotee, DevoteeUpdate, Pandit, PanditSignupPayload, Pooja,
    PoojaForm, ReviewCreate, Service,
};

pub use error::ApiError;
pub use http::HttpApiClient;

/// Which bookings a list call returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BookingScope {
    #[default]
    All,
    Devotee(String),
    Pandit(String),
}

#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn list_bookings(&self, scope: &BookingScope) -> Result<Vec<BookingRecord>, ApiError>;

    async fn create_booking(&self, payload: &BookingCreate) -> Result<(), ApiError>;

    /// Returns the updated record when the server echoes it back.
    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: &str,
    ) -> Result<Option<BookingRecord>, ApiError>;

    async fn list_pandits(&self) -> Result<Vec<Pandit>, ApiError>;

    async fn list_verified_pandits(&self) -> Result<Vec<Pandit>, ApiError>;

    async fn verify_pandit(&self, pandit_id: &str) -> Result<(), ApiError>;

    async fn delete_pandit(&self, pandit_id: &str) -> Result<(), ApiError>;

    async fn signup_pandit(&self, payload: &PanditSignupPayload) -> Result<(), ApiError>;

    async fn list_devotees(&self) -> Result<Vec<Devotee>, ApiError>;

    async fn update_devotee(&self, devotee_id: &str, patch: &DevoteeUpdate)
    -> Result<(), ApiError>;

    async fn list_poojas(&self) -> Result<Vec<Pooja>, ApiError>;

    async fn add_pooja(&self, form: &PoojaForm) -> Result<(), ApiError>;

    async fn update_pooja(&self, pooja_id: &str, form: &PoojaForm) -> Result<(), ApiError>;

    async fn delete_pooja(&self, pooja_id: &str) -> Result<(), ApiError>;

    async fn create_review(&self, review: &ReviewCreate) -> Result<(), ApiError>;

    async fn list_services(&self) -> Result<Vec<Service>, ApiError>;
}
