//! Booking history screen.

use std::sync::Arc;

use chrono_tz::Tz;
use shubhkarya_shared::BookingRecord;
use tracing::{debug, instrument};

use super::settle;
use crate::aggregate::{BookingAggregate, BookingAggregator, BookingQuery, StatusFilter};
use crate::api::{BookingApi, BookingScope};
use crate::datekey::TimeGrouping;

pub struct BookingHistoryView {
    api: Arc<dyn BookingApi>,
    scope: BookingScope,
    aggregator: BookingAggregator,
    bookings: Vec<BookingRecord>,
    loading: bool,
    query: BookingQuery,
}

impl BookingHistoryView {
    pub fn new(api: Arc<dyn BookingApi>, scope: BookingScope, timezone: Tz) -> Self {
        Self {
            api,
            scope,
            aggregator: BookingAggregator::new(timezone),
            bookings: Vec::new(),
            loading: false,
            query: BookingQuery::default(),
        }
    }

    #[instrument(skip(self), fields(scope = ?self.scope))]
    pub async fn load(&mut self) {
        self.loading = true;
        let result = self.api.list_bookings(&self.scope).await;
        self.loading = false;
        if settle(&mut self.bookings, result, "bookings") {
            debug!(count = self.bookings.len(), "booking history loaded");
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn bookings(&self) -> &[BookingRecord] {
        &self.bookings
    }

    pub fn query(&self) -> &BookingQuery {
        &self.query
    }

    pub fn set_status_filter(&mut self, input: &str) {
        self.query.status = StatusFilter::parse(input);
    }

    pub fn set_date_filter(&mut self, prefix: &str) {
        self.query.date_prefix = prefix.trim().to_string();
    }

    pub fn set_grouping(&mut self, grouping: TimeGrouping) {
        self.query.grouping = grouping;
    }

    pub fn clear_filters(&mut self) {
        self.query.status = StatusFilter::All;
        self.query.date_prefix.clear();
    }

    /// Recomputed from scratch on every call.
    pub fn summary(&self) -> BookingAggregate<'_> {
        self.aggregator.aggregate(&self.bookings, &self.query)
    }

    pub fn chart_title(&self) -> String {
        format!("Bookings per {}", self.query.grouping.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusBucket;
    use crate::views::testing::FakeApi;

    fn booking(id: &str, status: &str, puja_date: &str) -> BookingRecord {
        BookingRecord {
            id: id.to_string(),
            status: Some(status.to_string()),
            puja_date: Some(puja_date.to_string()),
            ..BookingRecord::default()
        }
    }

    #[tokio::test]
    async fn load_then_filter_recomputes_summary() {
        let api = Arc::new(FakeApi::default());
        *api.bookings.lock().expect("lock") = vec![
            booking("a", "Pending", "2024-01-10"),
            booking("b", "Accepted", "2024-01-12"),
            booking("c", "rejected", "2024-03-01"),
        ];
        let mut view = BookingHistoryView::new(
            api.clone(),
            BookingScope::Devotee("u1".to_string()),
            chrono_tz::Asia::Kolkata,
        );

        view.load().await;
        assert!(!view.is_loading());
        assert_eq!(view.summary().filtered.len(), 3);
        assert_eq!(
            api.scopes.lock().expect("lock").as_slice(),
            &[BookingScope::Devotee("u1".to_string())]
        );

        view.set_date_filter("2024-01");
        let summary = view.summary();
        assert_eq!(summary.filtered.len(), 2);
        assert_eq!(summary.count(&StatusBucket::Confirmed), 1);
        assert_eq!(summary.series().len(), 2);

        view.clear_filters();
        assert_eq!(view.summary().filtered.len(), 3);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_bookings() {
        let api = Arc::new(FakeApi::default());
        *api.bookings.lock().expect("lock") = vec![booking("a", "Pending", "2024-01-10")];
        let mut view =
            BookingHistoryView::new(api.clone(), BookingScope::All, chrono_tz::Asia::Kolkata);
        view.load().await;

        api.set_failing(true);
        view.load().await;

        assert!(!view.is_loading());
        assert_eq!(view.bookings().len(), 1);
    }

    #[test]
    fn chart_title_follows_grouping() {
        let api = Arc::new(FakeApi::default());
        let mut view = BookingHistoryView::new(api, BookingScope::All, chrono_tz::UTC);
        assert_eq!(view.chart_title(), "Bookings per Month");
        view.set_grouping(TimeGrouping::Week);
        assert_eq!(view.chart_title(), "Bookings per Week");
    }
}
