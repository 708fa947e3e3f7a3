use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shubhkarya_shared::{
    BookingCreate, BookingRecord, BookingStatusResponse, BookingStatusUpdate, Devotee,
    DevoteeUpdate, Pandit, PanditSignupPayload, Pooja, PoojaForm, ReviewCreate, Service,
};
use tracing::{debug, instrument, warn};

use super::error::extract_server_message;
use super::{ApiError, BookingApi, BookingScope};
use crate::config::Config;
use crate::session::Session;

const BOOKINGS_VIEW: &str = "/api/bookings/view";
const BOOKINGS_CREATE: &str = "/api/bookings/create";
const BOOKINGS_STATUS: &str = "/api/bookings/status";
const PANDITS_VIEW: &str = "/api/pandits/view";
const PANDITS_VERIFIED: &str = "/api/pandits/verified";
const PANDITS_VERIFY: &str = "/api/pandits/verify";
const PANDITS_DELETE: &str = "/api/pandits/delete";
const PANDITS_SIGNUP: &str = "/api/pandits/signup";
const USERS_VIEW: &str = "/api/users/view";
const USERS_UPDATE: &str = "/api/users/update";
const POOJAS_VIEW: &str = "/api/poojas/view";
const POOJAS_ADD: &str = "/api/poojas/add";
const POOJAS_UPDATE: &str = "/api/poojas/update";
const POOJAS_DELETE: &str = "/api/poojas/delete";
const REVIEWS_CREATE: &str = "/api/reviews/create";
const SERVICES_VIEW: &str = "/api/services/view";

/// reqwest-backed [`BookingApi`].
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|err| ApiError::Config(format!("invalid base url {base_url:?}: {err}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Config(format!("failed building HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ApiError> {
        Self::new(&cfg.api.base_url, cfg.api_timeout())
    }

    /// Attaches the session token, if any, as a bearer header on every call.
    pub fn with_session(mut self, session: Option<&Session>) -> Self {
        self.token = session.and_then(|s| s.token.clone());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| ApiError::Config(format!("invalid endpoint {path}: {err}")))
    }

    fn url_with_id(&self, path: &str, id: &str) -> Result<Url, ApiError> {
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("base url cannot take a path: {path}")))?
            .push(id);
        Ok(url)
    }

    async fn send<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        debug!(%method, %url, "sending request");
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let server_message = extract_server_message(&body);
        warn!(
            %method,
            %url,
            status = status.as_u16(),
            server_message = ?server_message,
            "request failed"
        );
        Err(ApiError::Http {
            status: status.as_u16(),
            server_message,
        })
    }

    /// List endpoints answer `null` or an empty body when nothing matches.
    async fn get_list<T: DeserializeOwned + Send>(&self, url: Url) -> Result<Vec<T>, ApiError> {
        let response = self.send::<()>(Method::GET, url, None).await?;
        let bytes = response.bytes().await.map_err(ApiError::from_reqwest)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let list: Option<Vec<T>> =
            serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(list.unwrap_or_default())
    }
}

#[async_trait]
impl BookingApi for HttpApiClient {
    #[instrument(skip(self))]
    async fn list_bookings(&self, scope: &BookingScope) -> Result<Vec<BookingRecord>, ApiError> {
        let mut url = self.url(BOOKINGS_VIEW)?;
        match scope {
            BookingScope::All => {}
            BookingScope::Devotee(user_id) => {
                url.query_pairs_mut().append_pair("userid", user_id);
            }
            BookingScope::Pandit(pandit_id) => {
                url.query_pairs_mut().append_pair("panditid", pandit_id);
            }
        }
        self.get_list(url).await
    }

    #[instrument(skip(self, payload), fields(pandit = %payload.pandit_id, date = %payload.puja_date))]
    async fn create_booking(&self, payload: &BookingCreate) -> Result<(), ApiError> {
        let url = self.url(BOOKINGS_CREATE)?;
        self.send(Method::POST, url, Some(payload)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: &str,
    ) -> Result<Option<BookingRecord>, ApiError> {
        let url = self.url_with_id(BOOKINGS_STATUS, booking_id)?;
        let body = BookingStatusUpdate {
            status: status.to_string(),
        };
        let response = self.send(Method::PUT, url, Some(&body)).await?;
        let text = response.text().await.map_err(ApiError::from_reqwest)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let parsed: BookingStatusResponse =
            serde_json::from_str(&text).map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(parsed.booking)
    }

    #[instrument(skip(self))]
    async fn list_pandits(&self) -> Result<Vec<Pandit>, ApiError> {
        self.get_list(self.url(PANDITS_VIEW)?).await
    }

    #[instrument(skip(self))]
    async fn list_verified_pandits(&self) -> Result<Vec<Pandit>, ApiError> {
        self.get_list(self.url(PANDITS_VERIFIED)?).await
    }

    #[instrument(skip(self))]
    async fn verify_pandit(&self, pandit_id: &str) -> Result<(), ApiError> {
        let url = self.url_with_id(PANDITS_VERIFY, pandit_id)?;
        self.send::<()>(Method::PUT, url, None).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_pandit(&self, pandit_id: &str) -> Result<(), ApiError> {
        let url = self.url_with_id(PANDITS_DELETE, pandit_id)?;
        self.send::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }

    #[instrument(skip(self, payload), fields(email = %payload.email))]
    async fn signup_pandit(&self, payload: &PanditSignupPayload) -> Result<(), ApiError> {
        let url = self.url(PANDITS_SIGNUP)?;
        self.send(Method::POST, url, Some(payload)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_devotees(&self) -> Result<Vec<Devotee>, ApiError> {
        self.get_list(self.url(USERS_VIEW)?).await
    }

    #[instrument(skip(self, patch))]
    async fn update_devotee(
        &self,
        devotee_id: &str,
        patch: &DevoteeUpdate,
    ) -> Result<(), ApiError> {
        let url = self.url_with_id(USERS_UPDATE, devotee_id)?;
        self.send(Method::PUT, url, Some(patch)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_poojas(&self) -> Result<Vec<Pooja>, ApiError> {
        self.get_list(self.url(POOJAS_VIEW)?).await
    }

    #[instrument(skip(self, form), fields(name = %form.name))]
    async fn add_pooja(&self, form: &PoojaForm) -> Result<(), ApiError> {
        let url = self.url(POOJAS_ADD)?;
        self.send(Method::POST, url, Some(form)).await?;
        Ok(())
    }

    #[instrument(skip(self, form), fields(name = %form.name))]
    async fn update_pooja(&self, pooja_id: &str, form: &PoojaForm) -> Result<(), ApiError> {
        let url = self.url_with_id(POOJAS_UPDATE, pooja_id)?;
        self.send(Method::PUT, url, Some(form)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_pooja(&self, pooja_id: &str) -> Result<(), ApiError> {
        let url = self.url_with_id(POOJAS_DELETE, pooja_id)?;
        self.send::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }

    #[instrument(skip(self, review), fields(rating = review.rating))]
    async fn create_review(&self, review: &ReviewCreate) -> Result<(), ApiError> {
        let url = self.url(REVIEWS_CREATE)?;
        self.send(Method::POST, url, Some(review)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_services(&self) -> Result<Vec<Service>, ApiError> {
        self.get_list(self.url(SERVICES_VIEW)?).await
    }
}
