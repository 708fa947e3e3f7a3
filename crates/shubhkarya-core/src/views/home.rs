//! Public landing page: service cards, the pooja catalog and verified
//! pandits.

use std::sync::Arc;

use shubhkarya_shared::{Pandit, Pooja, Service};
use tracing::{info, instrument, warn};

use crate::api::BookingApi;

pub const DEFAULT_IMAGE: &str = "/images/default-pooja.png";
/// How many pandits the landing page shows.
pub const FEATURED_PANDITS: usize = 10;

/// Absolute URLs are used as given; anything else is served by the API host.
pub fn image_url(path: Option<&str>, api_base: &str) -> String {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) if p.starts_with("http://") || p.starts_with("https://") => p.to_string(),
        Some(p) => format!("{}{}", api_base.trim_end_matches('/'), p),
        None => DEFAULT_IMAGE.to_string(),
    }
}

pub struct HomePage {
    api: Arc<dyn BookingApi>,
    api_base: String,
    pandits: Vec<Pandit>,
    poojas: Vec<Pooja>,
    services: Vec<Service>,
    selected: Option<String>,
    loading: bool,
}

impl HomePage {
    pub fn new(api: Arc<dyn BookingApi>, api_base: impl Into<String>) -> Self {
        Self {
            api,
            api_base: api_base.into(),
            pandits: Vec::new(),
            poojas: Vec::new(),
            services: Vec::new(),
            selected: None,
            loading: false,
        }
    }

    /// Any failed list empties all three; the page never mixes fresh and
    /// stale sections.
    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        self.loading = true;
        let api = Arc::clone(&self.api);
        let (pandits, poojas, services) =
            tokio::join!(api.list_pandits(), api.list_poojas(), api.list_services());
        self.loading = false;

        match (pandits, poojas, services) {
            (Ok(pandits), Ok(poojas), Ok(services)) => {
                self.pandits = pandits.into_iter().filter(|p| p.is_verified).collect();
                self.poojas = poojas;
                self.services = services;
                info!(
                    pandits = self.pandits.len(),
                    poojas = self.poojas.len(),
                    services = self.services.len(),
                    "home page loaded"
                );
            }
            (pandits, poojas, services) => {
                let failed = [
                    pandits.err().map(|e| format!("pandits: {e}")),
                    poojas.err().map(|e| format!("poojas: {e}")),
                    services.err().map(|e| format!("services: {e}")),
                ];
                warn!(
                    failed = ?failed.iter().flatten().collect::<Vec<_>>(),
                    "home page fetch failed"
                );
                self.pandits.clear();
                self.poojas.clear();
                self.services.clear();
            }
        }
        if self.selected_pooja().is_none() {
            self.selected = None;
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn poojas(&self) -> &[Pooja] {
        &self.poojas
    }

    /// Verified pandits only.
    pub fn pandits(&self) -> &[Pandit] {
        &self.pandits
    }

    pub fn featured_pandits(&self) -> &[Pandit] {
        &self.pandits[..self.pandits.len().min(FEATURED_PANDITS)]
    }

    /// Opens the detail view for a pooja. Unknown ids leave nothing selected.
    pub fn select_pooja(&mut self, pooja_id: &str) -> Option<&Pooja> {
        self.selected = self
            .poojas
            .iter()
            .any(|p| p.id == pooja_id)
            .then(|| pooja_id.to_string());
        self.selected_pooja()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_pooja(&self) -> Option<&Pooja> {
        let id = self.selected.as_deref()?;
        self.poojas.iter().find(|p| p.id == id)
    }

    pub fn pooja_image(&self, pooja: &Pooja) -> String {
        image_url(pooja.image_url.as_deref(), &self.api_base)
    }

    pub fn pandit_photo(&self, pandit: &Pandit) -> String {
        image_url(pandit.profile_photo_url.as_deref(), &self.api_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testing::FakeApi;

    fn pandit(id: &str, verified: bool) -> Pandit {
        Pandit {
            id: id.to_string(),
            name: format!("Pandit {id}"),
            is_verified: verified,
            ..Pandit::default()
        }
    }

    fn seeded() -> Arc<FakeApi> {
        let api = Arc::new(FakeApi::default());
        *api.pandits.lock().expect("lock") =
            vec![pandit("p1", true), pandit("p2", false), pandit("p3", true)];
        *api.poojas.lock().expect("lock") = vec![
            Pooja {
                id: "pj1".to_string(),
                name: Some("Satyanarayan".to_string()),
                description: Some("Full moon katha".to_string()),
                image_url: Some("/uploads/satya.jpg".to_string()),
            },
            Pooja {
                id: "pj2".to_string(),
                name: Some("Griha Pravesh".to_string()),
                ..Pooja::default()
            },
        ];
        *api.services.lock().expect("lock") = vec![Service {
            id: "s1".to_string(),
            name: "Havan".to_string(),
            ..Service::default()
        }];
        api
    }

    #[tokio::test]
    async fn keeps_only_verified_pandits() {
        let api = seeded();
        let mut home = HomePage::new(api.clone(), "http://localhost:5000");
        home.load().await;

        assert!(!home.is_loading());
        let ids: Vec<&str> = home.pandits().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
        assert_eq!(home.poojas().len(), 2);
        assert_eq!(home.services()[0].name, "Havan");

        let mut calls = api.calls();
        calls.sort();
        assert_eq!(calls, vec!["list_pandits", "list_poojas", "list_services"]);
    }

    #[tokio::test]
    async fn failed_fetch_empties_every_section() {
        let api = seeded();
        let mut home = HomePage::new(api.clone(), "http://localhost:5000");
        home.load().await;
        assert!(home.select_pooja("pj1").is_some());

        api.set_failing(true);
        home.load().await;

        assert!(home.pandits().is_empty());
        assert!(home.poojas().is_empty());
        assert!(home.services().is_empty());
        assert!(home.selected_pooja().is_none());
    }

    #[tokio::test]
    async fn pooja_detail_selection() {
        let mut home = HomePage::new(seeded(), "http://localhost:5000/");
        home.load().await;

        let pooja = home.select_pooja("pj1").cloned().expect("known pooja");
        assert_eq!(pooja.description.as_deref(), Some("Full moon katha"));
        assert_eq!(
            home.pooja_image(&pooja),
            "http://localhost:5000/uploads/satya.jpg"
        );

        assert!(home.select_pooja("missing").is_none());
        assert!(home.selected_pooja().is_none());

        home.select_pooja("pj2");
        home.clear_selection();
        assert!(home.selected_pooja().is_none());
    }

    #[tokio::test]
    async fn featured_pandits_are_capped() {
        let api = Arc::new(FakeApi::default());
        *api.pandits.lock().expect("lock") =
            (0..12).map(|i| pandit(&format!("p{i}"), true)).collect();
        let mut home = HomePage::new(api, "http://localhost:5000");
        home.load().await;

        assert_eq!(home.pandits().len(), 12);
        assert_eq!(home.featured_pandits().len(), FEATURED_PANDITS);
    }

    #[test]
    fn image_url_resolution() {
        assert_eq!(image_url(None, "http://h"), DEFAULT_IMAGE);
        assert_eq!(image_url(Some("  "), "http://h"), DEFAULT_IMAGE);
        assert_eq!(
            image_url(Some("https://cdn.example.org/a.png"), "http://h"),
            "https://cdn.example.org/a.png"
        );
        assert_eq!(image_url(Some("/img/a.png"), "http://h/"), "http://h/img/a.png");
    }
}
