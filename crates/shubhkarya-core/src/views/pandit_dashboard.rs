//! Pandit home: incoming bookings, earnings and accept/reject.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate};
use chrono_tz::Tz;
use shubhkarya_shared::{BookingRecord, RecordRef};
use tracing::{info, instrument, warn};

use super::{contains_ci, settle};
use crate::aggregate::StatusFilter;
use crate::api::{ApiError, BookingApi, BookingScope};
use crate::datekey::resolve_booking_date;
use crate::session::Session;
use crate::status::StatusBucket;

/// Flat fee credited per accepted booking.
pub const EARNING_PER_BOOKING: u64 = 500;

const PANEL_SIZE: usize = 5;
const TOP_SERVICES: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanditFilters {
    /// Exact `YYYY-MM-DD`; empty for any day.
    pub date: String,
    pub devotee_name: String,
    pub status: StatusFilter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanditStats {
    pub total: usize,
    pub accepted: usize,
    pub pending: usize,
    pub rejected: usize,
    pub unique_devotees: usize,
    pub earnings: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevoteeContact {
    pub id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

pub struct PanditDashboard {
    api: Arc<dyn BookingApi>,
    session: Session,
    timezone: Tz,
    bookings: Vec<BookingRecord>,
    loading: bool,
    pub filters: PanditFilters,
}

impl PanditDashboard {
    pub fn new(api: Arc<dyn BookingApi>, session: Session, timezone: Tz) -> Self {
        Self {
            api,
            session,
            timezone,
            bookings: Vec::new(),
            loading: false,
            filters: PanditFilters::default(),
        }
    }

    #[instrument(skip(self), fields(pandit = %self.session.user_id))]
    pub async fn load(&mut self) {
        self.loading = true;
        let scope = BookingScope::Pandit(self.session.user_id.clone());
        let result = self.api.list_bookings(&scope).await;
        self.loading = false;
        settle(&mut self.bookings, result, "pandit bookings");
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn bookings(&self) -> &[BookingRecord] {
        &self.bookings
    }

    pub fn clear_filters(&mut self) {
        self.filters = PanditFilters::default();
    }

    fn booking_date(&self, record: &BookingRecord) -> Option<NaiveDate> {
        record
            .resolved_date()
            .and_then(|raw| resolve_booking_date(raw, &self.timezone))
    }

    fn newest_first(&self) -> Vec<&BookingRecord> {
        let mut sorted: Vec<&BookingRecord> = self.bookings.iter().collect();
        // Records without a parseable createdAt sink to the end.
        sorted.sort_by_key(|b| {
            Reverse(
                b.created_at
                    .as_deref()
                    .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok()),
            )
        });
        sorted
    }

    /// All three filters applied, newest first.
    pub fn filtered(&self) -> Vec<&BookingRecord> {
        let wanted_date = self.filters.date.trim();
        let needle = self.filters.devotee_name.trim().to_lowercase();
        self.newest_first()
            .into_iter()
            .filter(|b| {
                wanted_date.is_empty()
                    || self
                        .booking_date(b)
                        .is_some_and(|d| d.format("%Y-%m-%d").to_string() == wanted_date)
            })
            .filter(|b| {
                needle.is_empty()
                    || contains_ci(b.devotee.as_ref().and_then(RecordRef::name), &needle)
            })
            .filter(|b| self.filters.status.matches(b))
            .collect()
    }

    pub fn stats(&self) -> PanditStats {
        let mut stats = PanditStats {
            total: self.bookings.len(),
            ..PanditStats::default()
        };
        let mut devotees = HashSet::new();
        for record in &self.bookings {
            match StatusBucket::normalize(record.status.as_deref()) {
                StatusBucket::Confirmed => stats.accepted += 1,
                StatusBucket::Pending => stats.pending += 1,
                StatusBucket::Rejected => stats.rejected += 1,
                _ => {}
            }
            if let Some(key) = devotee_key(record) {
                devotees.insert(key);
            }
        }
        stats.unique_devotees = devotees.len();
        stats.earnings = stats.accepted as u64 * EARNING_PER_BOOKING;
        stats
    }

    /// Most booked services, ties broken by name.
    pub fn top_services(&self) -> Vec<ServiceCount> {
        let mut counts = BTreeMap::<&str, usize>::new();
        for record in &self.bookings {
            *counts.entry(record.service_name()).or_insert(0) += 1;
        }
        let mut ranked: Vec<ServiceCount> = counts
            .into_iter()
            .map(|(name, count)| ServiceCount {
                name: name.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        ranked.truncate(TOP_SERVICES);
        ranked
    }

    /// Accepted bookings from yesterday onwards, soonest first.
    pub fn upcoming(&self, today: NaiveDate) -> Vec<&BookingRecord> {
        let cutoff = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        let mut dated: Vec<(NaiveDate, &BookingRecord)> = self
            .bookings
            .iter()
            .filter(|b| StatusBucket::normalize(b.status.as_deref()).is_confirmed())
            .filter_map(|b| self.booking_date(b).map(|d| (d, b)))
            .filter(|(d, _)| *d >= cutoff)
            .collect();
        dated.sort_by_key(|(d, _)| *d);
        dated
            .into_iter()
            .take(PANEL_SIZE)
            .map(|(_, b)| b)
            .collect()
    }

    pub fn recent(&self) -> Vec<&BookingRecord> {
        self.newest_first().into_iter().take(PANEL_SIZE).collect()
    }

    /// Everyone who has booked this pandit, in first-seen order.
    pub fn devotees(&self) -> Vec<DevoteeContact> {
        let mut seen = HashSet::new();
        let mut contacts = Vec::new();
        for record in self.newest_first() {
            let Some(key) = devotee_key(record) else {
                continue;
            };
            if !seen.insert(key) {
                continue;
            }
            let (id, email) = match record.devotee.as_ref() {
                Some(RecordRef::Populated(summary)) => (summary.id.clone(), summary.email.clone()),
                Some(RecordRef::Id(id)) => (Some(id.clone()), None),
                _ => (None, None),
            };
            contacts.push(DevoteeContact {
                id,
                name: record.devotee_name().to_string(),
                phone: record
                    .devotee
                    .as_ref()
                    .and_then(RecordRef::phone)
                    .map(str::to_string),
                email,
            });
        }
        contacts
    }

    /// Sends the new status and swaps the server's copy into place. When the
    /// server does not echo the record, only the status is patched locally.
    #[instrument(skip(self))]
    pub async fn update_status(&mut self, booking_id: &str, status: &str) -> Result<(), ApiError> {
        let updated = match self.api.update_booking_status(booking_id, status).await {
            Ok(updated) => updated,
            Err(err) => {
                warn!(error = %err, "status update failed");
                return Err(err);
            }
        };

        let Some(slot) = self.bookings.iter_mut().find(|b| b.id == booking_id) else {
            warn!("updated booking is not in the loaded list");
            return Ok(());
        };
        match updated {
            Some(record) => *slot = record,
            None => slot.status = Some(status.to_string()),
        }
        info!(status, "booking status updated");
        Ok(())
    }
}

fn devotee_key(record: &BookingRecord) -> Option<String> {
    let devotee = record.devotee.as_ref()?;
    devotee
        .id()
        .or_else(|| devotee.name())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use shubhkarya_shared::RefSummary;

    use super::*;
    use crate::session::Role;
    use crate::views::testing::FakeApi;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn devotee(id: &str, name: &str) -> Option<RecordRef> {
        Some(RecordRef::Populated(RefSummary {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            phone: Some("9876543210".to_string()),
            email: None,
        }))
    }

    fn service(name: &str) -> Option<RecordRef> {
        Some(RecordRef::Populated(RefSummary {
            name: Some(name.to_string()),
            ..RefSummary::default()
        }))
    }

    fn booking(
        id: &str,
        status: &str,
        puja_date: &str,
        created_at: Option<&str>,
        who: (&str, &str),
        what: &str,
    ) -> BookingRecord {
        BookingRecord {
            id: id.to_string(),
            status: Some(status.to_string()),
            puja_date: Some(puja_date.to_string()),
            created_at: created_at.map(str::to_string),
            devotee: devotee(who.0, who.1),
            service: service(what),
            ..BookingRecord::default()
        }
    }

    async fn loaded() -> (Arc<FakeApi>, PanditDashboard) {
        let api = Arc::new(FakeApi::default());
        *api.bookings.lock().expect("lock") = vec![
            booking(
                "b1",
                "Accepted",
                "2024-03-10",
                Some("2024-02-01T10:00:00Z"),
                ("u1", "Asha"),
                "Satyanarayan Katha",
            ),
            booking(
                "b2",
                "Pending",
                "2024-03-12",
                Some("2024-02-03T10:00:00Z"),
                ("u2", "Ravi"),
                "Griha Pravesh",
            ),
            booking(
                "b3",
                "confirmed",
                "2024-03-04",
                Some("2024-02-02T10:00:00Z"),
                ("u1", "Asha"),
                "Satyanarayan Katha",
            ),
            booking("b4", "Rejected", "2024-03-20", None, ("u3", "Meera"), "Havan"),
        ];
        let session = Session::new("p1", "Sharma", Role::Pandit);
        let mut view = PanditDashboard::new(api.clone(), session, chrono_tz::Asia::Kolkata);
        view.load().await;
        (api, view)
    }

    #[tokio::test]
    async fn loads_bookings_for_the_pandit() {
        let (api, view) = loaded().await;
        assert!(!view.is_loading());
        assert_eq!(
            api.scopes.lock().expect("lock").as_slice(),
            &[BookingScope::Pandit("p1".to_string())]
        );
        let ids: Vec<_> = view.filtered().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b3", "b1", "b4"]);
    }

    #[tokio::test]
    async fn stats_count_accepted_and_confirmed_together() {
        let (_, view) = loaded().await;
        let stats = view.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.unique_devotees, 3);
        assert_eq!(stats.earnings, 1_000);
    }

    #[tokio::test]
    async fn filters_combine() {
        let (_, mut view) = loaded().await;
        view.filters.devotee_name = "ash".to_string();
        assert_eq!(view.filtered().len(), 2);

        view.filters.date = "2024-03-04".to_string();
        assert_eq!(view.filtered().len(), 1);

        view.clear_filters();
        view.filters.status = StatusFilter::parse("pending");
        assert_eq!(view.filtered()[0].id, "b2");
    }

    #[tokio::test]
    async fn panels() {
        let (_, view) = loaded().await;

        let top = view.top_services();
        assert_eq!(top[0].name, "Satyanarayan Katha");
        assert_eq!(top[0].count, 2);
        assert_eq!(top.len(), 3);

        let upcoming: Vec<_> = view
            .upcoming(date("2024-03-05"))
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(upcoming, vec!["b3", "b1"]);
        assert_eq!(view.upcoming(date("2024-03-06")).len(), 1);

        assert_eq!(view.recent().len(), 4);

        let devotees = view.devotees();
        assert_eq!(devotees.len(), 3);
        assert_eq!(devotees[0].name, "Ravi");
        assert_eq!(devotees[0].phone.as_deref(), Some("9876543210"));
    }

    #[tokio::test]
    async fn status_update_replaces_record_in_place() {
        let (api, mut view) = loaded().await;
        view.update_status("b2", "Accepted").await.expect("update");

        assert_eq!(view.bookings()[1].id, "b2");
        assert_eq!(view.bookings()[1].status.as_deref(), Some("Accepted"));
        assert_eq!(view.stats().accepted, 3);

        api.set_failing(true);
        assert!(view.update_status("b4", "Accepted").await.is_err());
        assert_eq!(view.bookings()[3].status.as_deref(), Some("Rejected"));
    }
}
