//! Admin directories of pandits and devotees.

use std::sync::Arc;

use shubhkarya_shared::{Devotee, DevoteeUpdate, Pandit};
use tracing::{info, instrument, warn};

use super::{contains_ci, settle};
use crate::api::{ApiError, BookingApi};

pub const DEFAULT_PANDIT_PHOTO: &str = "/images/default-pandit.png";
const UPLOADS_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanditFilters {
    pub name: String,
    pub city: String,
    /// Matched exactly against the stored experience.
    pub experience: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub total: usize,
    pub verified: usize,
    pub pending: usize,
}

/// Where a pandit's photo can be fetched from. Uploaded files live on the
/// API host; anything else is used as given.
pub fn photo_url(pandit: &Pandit, api_base: &str) -> String {
    match pandit
        .profile_photo_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    {
        Some(url) if url.starts_with(UPLOADS_PREFIX) => {
            format!("{}{}", api_base.trim_end_matches('/'), url)
        }
        Some(url) => url.to_string(),
        None => DEFAULT_PANDIT_PHOTO.to_string(),
    }
}

pub struct PanditDirectory {
    api: Arc<dyn BookingApi>,
    api_base: String,
    pandits: Vec<Pandit>,
    loading: bool,
    pub filters: PanditFilters,
}

impl PanditDirectory {
    pub fn new(api: Arc<dyn BookingApi>, api_base: impl Into<String>) -> Self {
        Self {
            api,
            api_base: api_base.into(),
            pandits: Vec::new(),
            loading: false,
            filters: PanditFilters::default(),
        }
    }

    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        self.loading = true;
        let result = self.api.list_pandits().await;
        self.loading = false;
        settle(&mut self.pandits, result, "pandits");
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn pandits(&self) -> &[Pandit] {
        &self.pandits
    }

    pub fn filtered(&self) -> Vec<&Pandit> {
        let name = self.filters.name.trim().to_lowercase();
        let city = self.filters.city.trim().to_lowercase();
        let experience = self.filters.experience.trim();
        self.pandits
            .iter()
            .filter(|p| name.is_empty() || contains_ci(Some(p.name.as_str()), &name))
            .filter(|p| city.is_empty() || contains_ci(p.city.as_deref(), &city))
            .filter(|p| {
                experience.is_empty() || p.experience_text().as_deref() == Some(experience)
            })
            .collect()
    }

    pub fn stats(&self) -> DirectoryStats {
        let verified = self.pandits.iter().filter(|p| p.is_verified).count();
        DirectoryStats {
            total: self.pandits.len(),
            verified,
            pending: self.pandits.len() - verified,
        }
    }

    pub fn photo_url(&self, pandit: &Pandit) -> String {
        photo_url(pandit, &self.api_base)
    }

    #[instrument(skip(self))]
    pub async fn verify(&mut self, pandit_id: &str) -> Result<(), ApiError> {
        if let Err(err) = self.api.verify_pandit(pandit_id).await {
            warn!(error = %err, "verify failed");
            return Err(err);
        }
        info!("pandit verified");
        self.load().await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&mut self, pandit_id: &str) -> Result<(), ApiError> {
        if let Err(err) = self.api.delete_pandit(pandit_id).await {
            warn!(error = %err, "delete failed");
            return Err(err);
        }
        info!("pandit deleted");
        self.load().await;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevoteeFilters {
    pub name: String,
    pub city: String,
}

pub struct DevoteeDirectory {
    api: Arc<dyn BookingApi>,
    devotees: Vec<Devotee>,
    loading: bool,
    pub filters: DevoteeFilters,
}

impl DevoteeDirectory {
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self {
            api,
            devotees: Vec::new(),
            loading: false,
            filters: DevoteeFilters::default(),
        }
    }

    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        self.loading = true;
        let result = self.api.list_devotees().await;
        self.loading = false;
        settle(&mut self.devotees, result, "devotees");
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn devotees(&self) -> &[Devotee] {
        &self.devotees
    }

    pub fn filtered(&self) -> Vec<&Devotee> {
        let name = self.filters.name.trim().to_lowercase();
        let city = self.filters.city.trim().to_lowercase();
        self.devotees
            .iter()
            .filter(|d| name.is_empty() || contains_ci(d.name.as_deref(), &name))
            .filter(|d| city.is_empty() || contains_ci(d.city.as_deref(), &city))
            .collect()
    }

    /// Name and email are not editable; the patch only carries contact fields.
    #[instrument(skip(self, patch))]
    pub async fn update(&mut self, devotee_id: &str, patch: &DevoteeUpdate) -> Result<(), ApiError> {
        if patch.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.api.update_devotee(devotee_id, patch).await {
            warn!(error = %err, "devotee update failed");
            return Err(err);
        }
        info!("devotee updated");
        self.load().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::views::testing::FakeApi;

    fn pandit(id: &str, name: &str, city: &str, years: u32, verified: bool) -> Pandit {
        Pandit {
            id: id.to_string(),
            name: name.to_string(),
            city: Some(city.to_string()),
            experience_years: Some(json!(years)),
            is_verified: verified,
            ..Pandit::default()
        }
    }

    #[test]
    fn photo_url_resolution() {
        let mut p = Pandit::default();
        assert_eq!(photo_url(&p, "http://localhost:5000"), DEFAULT_PANDIT_PHOTO);

        p.profile_photo_url = Some("/uploads/p1.jpg".to_string());
        assert_eq!(
            photo_url(&p, "http://localhost:5000/"),
            "http://localhost:5000/uploads/p1.jpg"
        );

        p.profile_photo_url = Some("https://cdn.example.org/p1.jpg".to_string());
        assert_eq!(
            photo_url(&p, "http://localhost:5000"),
            "https://cdn.example.org/p1.jpg"
        );
    }

    #[tokio::test]
    async fn pandit_filters_and_counts() {
        let api = Arc::new(FakeApi::default());
        *api.pandits.lock().expect("lock") = vec![
            pandit("p1", "Ramesh Sharma", "Varanasi", 12, true),
            pandit("p2", "Suresh Joshi", "Pune", 7, false),
            pandit("p3", "Mahesh Sharma", "Pune", 12, false),
        ];
        let mut dir = PanditDirectory::new(api, "http://localhost:5000");
        dir.load().await;

        assert_eq!(
            dir.stats(),
            DirectoryStats {
                total: 3,
                verified: 1,
                pending: 2
            }
        );

        dir.filters.name = "sharma".to_string();
        assert_eq!(dir.filtered().len(), 2);
        dir.filters.city = "pune".to_string();
        assert_eq!(dir.filtered().len(), 1);
        dir.filters = PanditFilters {
            experience: "1".to_string(),
            ..PanditFilters::default()
        };
        assert!(dir.filtered().is_empty());
        dir.filters.experience = "12".to_string();
        assert_eq!(dir.filtered().len(), 2);
    }

    #[tokio::test]
    async fn verify_and_delete_refetch() {
        let api = Arc::new(FakeApi::default());
        *api.pandits.lock().expect("lock") = vec![
            pandit("p1", "Ramesh", "Varanasi", 12, false),
            pandit("p2", "Suresh", "Pune", 7, false),
        ];
        let mut dir = PanditDirectory::new(api.clone(), "http://localhost:5000");
        dir.load().await;

        dir.verify("p1").await.expect("verify");
        assert_eq!(dir.stats().verified, 1);

        dir.delete("p2").await.expect("delete");
        assert_eq!(dir.pandits().len(), 1);
        assert_eq!(
            api.calls(),
            vec![
                "list_pandits",
                "verify_pandit:p1",
                "list_pandits",
                "delete_pandit:p2",
                "list_pandits"
            ]
        );
    }

    #[tokio::test]
    async fn devotee_update_refetches() {
        let api = Arc::new(FakeApi::default());
        *api.devotees.lock().expect("lock") = vec![
            Devotee {
                id: "u1".to_string(),
                name: Some("Asha".to_string()),
                city: Some("Pune".to_string()),
                ..Devotee::default()
            },
            Devotee {
                id: "u2".to_string(),
                name: Some("Ravi".to_string()),
                city: Some("Nashik".to_string()),
                ..Devotee::default()
            },
        ];
        let mut dir = DevoteeDirectory::new(api.clone());
        dir.load().await;

        dir.filters.city = "pun".to_string();
        assert_eq!(dir.filtered().len(), 1);

        let patch = DevoteeUpdate {
            city: Some("Nashik".to_string()),
            ..DevoteeUpdate::default()
        };
        dir.update("u1", &patch).await.expect("update");
        assert!(dir.filtered().is_empty());

        dir.update("u1", &DevoteeUpdate::default())
            .await
            .expect("empty patch");
        assert_eq!(api.calls().len(), 3);
    }
}
