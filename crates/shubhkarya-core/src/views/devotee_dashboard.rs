//! Devotee home: bookings, verified pandits, the booking calendar and the
//! booking and review forms.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use chrono_tz::Tz;
use shubhkarya_shared::{BookingCreate, BookingRecord, Pandit, Pooja, ReviewCreate};
use tracing::{info, instrument, warn};

use super::{Flash, contains_ci, settle};
use crate::api::{BookingApi, BookingScope};
use crate::calendar::CalendarMonth;
use crate::datekey::resolve_booking_date;
use crate::session::Session;
use crate::status::StatusBucket;

pub const SELECT_PANDIT: &str = "Please select a Pandit.";
pub const SELECT_SERVICE: &str = "Please select the Puja/service.";
pub const FILL_BOOKING_DETAILS: &str = "Please fill all booking details.";
pub const USER_NOT_FOUND: &str = "User not found. Please login again.";
pub const BOOKING_CREATED: &str = "Puja booked successfully! Awaiting Pandit confirmation.";
pub const BOOKING_FAILED: &str = "Failed to book puja. Please try again later.";

pub const REVIEW_INCOMPLETE: &str = "Please complete all fields and provide star rating.";
pub const REVIEW_THANKS: &str = "Thank you for your review!";
pub const REVIEW_FAILED: &str = "Failed to submit review.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    pub pandit_id: Option<String>,
    pub service_id: Option<String>,
    pub puja_date: String,
    pub puja_time: String,
    pub location: String,
    /// Free-text list of items the devotee will arrange.
    pub saman_list: String,
}

impl BookingForm {
    /// First failing rule wins, in the order the form is filled in.
    pub fn to_payload(&self, session: Option<&Session>) -> Result<BookingCreate, &'static str> {
        let pandit_id = filled(self.pandit_id.as_deref()).ok_or(SELECT_PANDIT)?;
        let service_id = filled(self.service_id.as_deref()).ok_or(SELECT_SERVICE)?;
        let (Some(puja_date), Some(puja_time), Some(location)) = (
            filled(Some(self.puja_date.as_str())),
            filled(Some(self.puja_time.as_str())),
            filled(Some(self.location.as_str())),
        ) else {
            return Err(FILL_BOOKING_DETAILS);
        };
        let session = session
            .filter(|s| !s.user_id.trim().is_empty())
            .ok_or(USER_NOT_FOUND)?;

        Ok(BookingCreate {
            user_id: session.user_id.clone(),
            pandit_id: pandit_id.to_string(),
            service_id: service_id.to_string(),
            puja_date: puja_date.to_string(),
            puja_time: puja_time.to_string(),
            location: location.to_string(),
            saman_list: self.saman_list.trim().to_string(),
            user_name: session.name.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewForm {
    pub name: String,
    pub comment: String,
    /// 1..=5 stars, 0 while unset.
    pub rating: u8,
}

impl ReviewForm {
    pub fn to_payload(&self) -> Result<ReviewCreate, &'static str> {
        let name = self.name.trim();
        let comment = self.comment.trim();
        if name.is_empty() || comment.is_empty() || !(1..=5).contains(&self.rating) {
            return Err(REVIEW_INCOMPLETE);
        }
        Ok(ReviewCreate {
            name: name.to_string(),
            rating: self.rating,
            comment: comment.to_string(),
        })
    }
}

fn filled(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardLoading {
    pub bookings: bool,
    pub pandits: bool,
    pub poojas: bool,
}

impl DashboardLoading {
    pub fn any(&self) -> bool {
        self.bookings || self.pandits || self.poojas
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DevoteeStats<'a> {
    pub total: usize,
    pub pending: usize,
    /// Accepted and confirmed together.
    pub accepted: usize,
    pub rejected: usize,
    pub upcoming: Option<&'a BookingRecord>,
}

pub struct DevoteeDashboard {
    api: Arc<dyn BookingApi>,
    session: Option<Session>,
    timezone: Tz,
    bookings: Vec<BookingRecord>,
    pandits: Vec<Pandit>,
    poojas: Vec<Pooja>,
    loading: DashboardLoading,
    pub booking_search: String,
    pub pandit_search: String,
    calendar: CalendarMonth,
    pub booking_form: BookingForm,
    booking_flash: Flash,
    submitting_booking: bool,
    pub review_form: ReviewForm,
    review_flash: Flash,
    submitting_review: bool,
}

impl DevoteeDashboard {
    pub fn new(
        api: Arc<dyn BookingApi>,
        session: Option<Session>,
        timezone: Tz,
        today: NaiveDate,
        booking_clear: Duration,
        review_clear: Duration,
    ) -> Self {
        Self {
            api,
            session,
            timezone,
            bookings: Vec::new(),
            pandits: Vec::new(),
            poojas: Vec::new(),
            loading: DashboardLoading::default(),
            booking_search: String::new(),
            pandit_search: String::new(),
            calendar: CalendarMonth::containing(today),
            booking_form: BookingForm::default(),
            booking_flash: Flash::new(booking_clear),
            submitting_booking: false,
            review_form: ReviewForm::default(),
            review_flash: Flash::new(review_clear),
            submitting_review: false,
        }
    }

    fn booking_scope(&self) -> Option<BookingScope> {
        self.session
            .as_ref()
            .map(|s| BookingScope::Devotee(s.user_id.clone()))
    }

    /// Bookings, verified pandits and poojas are fetched concurrently; each
    /// settles on its own.
    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        self.loading = DashboardLoading {
            bookings: self.session.is_some(),
            pandits: true,
            poojas: true,
        };
        let scope = self.booking_scope();
        let api = Arc::clone(&self.api);

        let (bookings, pandits, poojas) = tokio::join!(
            async {
                match &scope {
                    Some(scope) => Some(api.list_bookings(scope).await),
                    None => None,
                }
            },
            api.list_verified_pandits(),
            api.list_poojas(),
        );

        self.loading = DashboardLoading::default();
        match bookings {
            Some(result) => {
                settle(&mut self.bookings, result, "bookings");
            }
            None => warn!("no session; skipping booking fetch"),
        }
        settle(&mut self.pandits, pandits, "verified pandits");
        settle(&mut self.poojas, poojas, "poojas");
    }

    async fn reload_bookings(&mut self) {
        let Some(scope) = self.booking_scope() else {
            return;
        };
        self.loading.bookings = true;
        let result = self.api.list_bookings(&scope).await;
        self.loading.bookings = false;
        settle(&mut self.bookings, result, "bookings");
    }

    pub fn loading(&self) -> DashboardLoading {
        self.loading
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn bookings(&self) -> &[BookingRecord] {
        &self.bookings
    }

    pub fn pandits(&self) -> &[Pandit] {
        &self.pandits
    }

    pub fn poojas(&self) -> &[Pooja] {
        &self.poojas
    }

    fn booking_date(&self, record: &BookingRecord) -> Option<NaiveDate> {
        record
            .resolved_date()
            .and_then(|raw| resolve_booking_date(raw, &self.timezone))
    }

    /// `upcoming` is the earliest booking on or after `today` that is not
    /// completed.
    pub fn stats(&self, today: NaiveDate) -> DevoteeStats<'_> {
        let mut stats = DevoteeStats {
            total: self.bookings.len(),
            pending: 0,
            accepted: 0,
            rejected: 0,
            upcoming: None,
        };
        let mut next: Option<(NaiveDate, &BookingRecord)> = None;

        for record in &self.bookings {
            let bucket = StatusBucket::normalize(record.status.as_deref());
            match bucket {
                StatusBucket::Pending => stats.pending += 1,
                StatusBucket::Confirmed => stats.accepted += 1,
                StatusBucket::Rejected => stats.rejected += 1,
                _ => {}
            }
            if bucket == StatusBucket::Completed {
                continue;
            }
            if let Some(date) = self.booking_date(record).filter(|d| *d >= today)
                && next.is_none_or(|(best, _)| date < best)
            {
                next = Some((date, record));
            }
        }

        stats.upcoming = next.map(|(_, record)| record);
        stats
    }

    /// Matches pandit, service, date or location.
    pub fn filtered_bookings(&self) -> Vec<&BookingRecord> {
        let needle = self.booking_search.trim().to_lowercase();
        self.bookings
            .iter()
            .filter(|b| {
                needle.is_empty()
                    || contains_ci(Some(b.pandit_name()), &needle)
                    || contains_ci(Some(b.service_name()), &needle)
                    || contains_ci(b.resolved_date(), &needle)
                    || contains_ci(b.location.as_deref(), &needle)
            })
            .collect()
    }

    /// Matches name, city or any specialty.
    pub fn filtered_pandits(&self) -> Vec<&Pandit> {
        let needle = self.pandit_search.trim().to_lowercase();
        self.pandits
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || contains_ci(Some(p.name.as_str()), &needle)
                    || contains_ci(p.city.as_deref(), &needle)
                    || p.specialties
                        .iter()
                        .any(|s| contains_ci(Some(s.as_str()), &needle))
            })
            .collect()
    }

    pub fn calendar(&self) -> CalendarMonth {
        self.calendar
    }

    pub fn show_previous_month(&mut self) {
        self.calendar = self.calendar.prev();
    }

    pub fn show_next_month(&mut self) {
        self.calendar = self.calendar.next();
    }

    pub fn show_month(&mut self, month: CalendarMonth) {
        self.calendar = month;
    }

    /// Days of the shown month that carry at least one booking.
    pub fn booked_days(&self) -> BTreeSet<NaiveDate> {
        self.bookings
            .iter()
            .filter_map(|b| self.booking_date(b))
            .filter(|d| self.calendar.contains(*d))
            .collect()
    }

    /// Picking a calendar day fills the booking date.
    pub fn select_day(&mut self, date: NaiveDate) {
        self.booking_form.puja_date = date.format("%Y-%m-%d").to_string();
    }

    /// A new pandit invalidates the chosen service.
    pub fn select_pandit(&mut self, pandit_id: &str) {
        self.booking_form.pandit_id = Some(pandit_id.to_string());
        self.booking_form.service_id = None;
    }

    pub fn select_service(&mut self, service_id: &str) {
        self.booking_form.service_id = Some(service_id.to_string());
    }

    pub fn booking_flash(&self) -> &Flash {
        &self.booking_flash
    }

    pub fn review_flash(&self) -> &Flash {
        &self.review_flash
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting_booking || self.submitting_review
    }

    /// Validates, posts and re-fetches. `now` stamps the resulting message.
    #[instrument(skip(self, now))]
    pub async fn submit_booking(&mut self, now: Instant) -> bool {
        let payload = match self.booking_form.to_payload(self.session.as_ref()) {
            Ok(payload) => payload,
            Err(message) => {
                self.booking_flash.error(message, now);
                return false;
            }
        };

        self.submitting_booking = true;
        let result = self.api.create_booking(&payload).await;
        self.submitting_booking = false;

        match result {
            Ok(()) => {
                info!(pandit = %payload.pandit_id, date = %payload.puja_date, "booking created");
                self.booking_flash.success(BOOKING_CREATED, now);
                self.booking_form = BookingForm::default();
                self.reload_bookings().await;
                true
            }
            Err(err) => {
                warn!(error = %err, "booking failed");
                self.booking_flash
                    .error(err.user_message(BOOKING_FAILED), now);
                false
            }
        }
    }

    #[instrument(skip(self, now))]
    pub async fn submit_review(&mut self, now: Instant) -> bool {
        let review = match self.review_form.to_payload() {
            Ok(review) => review,
            Err(message) => {
                self.review_flash.error(message, now);
                return false;
            }
        };

        self.submitting_review = true;
        let result = self.api.create_review(&review).await;
        self.submitting_review = false;

        match result {
            Ok(()) => {
                self.review_flash.success(REVIEW_THANKS, now);
                // The reviewer's name stays filled in for the next review.
                self.review_form.comment.clear();
                self.review_form.rating = 0;
                true
            }
            Err(err) => {
                warn!(error = %err, "review failed");
                self.review_flash.error(REVIEW_FAILED, now);
                false
            }
        }
    }
}
