//! Admin landing counts.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::api::{BookingApi, BookingScope};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverviewCounts {
    pub devotees: usize,
    pub pandits: usize,
    pub bookings: usize,
}

pub struct AdminOverview {
    api: Arc<dyn BookingApi>,
    counts: OverviewCounts,
    loading: bool,
}

impl AdminOverview {
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self {
            api,
            counts: OverviewCounts::default(),
            loading: false,
        }
    }

    /// The three lists are fetched together; counts change only when all of
    /// them arrive.
    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        self.loading = true;
        let api = Arc::clone(&self.api);
        let (devotees, pandits, bookings) = tokio::join!(
            api.list_devotees(),
            api.list_pandits(),
            api.list_bookings(&BookingScope::All),
        );
        self.loading = false;

        match (devotees, pandits, bookings) {
            (Ok(devotees), Ok(pandits), Ok(bookings)) => {
                self.counts = OverviewCounts {
                    devotees: devotees.len(),
                    pandits: pandits.len(),
                    bookings: bookings.len(),
                };
            }
            (devotees, pandits, bookings) => {
                let failed = [
                    devotees.err().map(|e| format!("devotees: {e}")),
                    pandits.err().map(|e| format!("pandits: {e}")),
                    bookings.err().map(|e| format!("bookings: {e}")),
                ];
                warn!(
                    failed = ?failed.iter().flatten().collect::<Vec<_>>(),
                    "overview fetch failed; keeping previous counts"
                );
            }
        }
    }

    pub fn counts(&self) -> OverviewCounts {
        self.counts
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}
