//! Pooja catalog management.

use std::sync::Arc;

use shubhkarya_shared::{Pooja, PoojaForm};
use tracing::{instrument, warn};

use super::{contains_ci, settle};
use crate::api::BookingApi;

pub const NAME_REQUIRED: &str = "Pooja name is required";
pub const POOJA_UPDATED: &str = "Pooja updated successfully";
pub const POOJA_ADDED: &str = "Pooja added successfully";
pub const SAVE_FAILED: &str = "Something went wrong. Please try again.";
pub const POOJA_DELETED: &str = "Pooja deleted successfully";
pub const DELETE_FAILED: &str = "Failed to delete pooja";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogMessage {
    Success(String),
    Error(String),
}

impl CatalogMessage {
    pub fn text(&self) -> &str {
        match self {
            Self::Success(text) | Self::Error(text) => text,
        }
    }
}

pub struct PoojaCatalog {
    api: Arc<dyn BookingApi>,
    poojas: Vec<Pooja>,
    loading: bool,
    pub search: String,
    pub form: PoojaForm,
    editing: Option<String>,
    message: Option<CatalogMessage>,
}

impl PoojaCatalog {
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self {
            api,
            poojas: Vec::new(),
            loading: false,
            search: String::new(),
            form: PoojaForm::default(),
            editing: None,
            message: None,
        }
    }

    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        self.loading = true;
        let result = self.api.list_poojas().await;
        self.loading = false;
        settle(&mut self.poojas, result, "poojas");
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn poojas(&self) -> &[Pooja] {
        &self.poojas
    }

    pub fn message(&self) -> Option<&CatalogMessage> {
        self.message.as_ref()
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Name or description contains the search text.
    pub fn filtered(&self) -> Vec<&Pooja> {
        let needle = self.search.trim().to_lowercase();
        self.poojas
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || contains_ci(p.name.as_deref(), &needle)
                    || contains_ci(p.description.as_deref(), &needle)
            })
            .collect()
    }

    /// Loads an existing pooja into the form. Unknown ids are ignored.
    pub fn start_edit(&mut self, pooja_id: &str) -> bool {
        let Some(pooja) = self.poojas.iter().find(|p| p.id == pooja_id) else {
            return false;
        };
        self.form = PoojaForm {
            name: pooja.name.clone().unwrap_or_default(),
            description: pooja.description.clone().unwrap_or_default(),
            image_url: pooja.image_url.clone().unwrap_or_default(),
        };
        self.editing = Some(pooja.id.clone());
        true
    }

    pub fn cancel_edit(&mut self) {
        self.form = PoojaForm::default();
        self.editing = None;
    }

    /// Adds or updates depending on whether an edit is in progress.
    #[instrument(skip(self), fields(editing = ?self.editing))]
    pub async fn submit(&mut self) -> bool {
        if self.form.name.trim().is_empty() {
            self.message = Some(CatalogMessage::Error(NAME_REQUIRED.to_string()));
            return false;
        }

        let result = match self.editing.as_deref() {
            Some(id) => self
                .api
                .update_pooja(id, &self.form)
                .await
                .map(|()| POOJA_UPDATED),
            None => self.api.add_pooja(&self.form).await.map(|()| POOJA_ADDED),
        };

        match result {
            Ok(done) => {
                self.message = Some(CatalogMessage::Success(done.to_string()));
                self.cancel_edit();
                self.load().await;
                true
            }
            Err(err) => {
                warn!(error = %err, "saving pooja failed");
                self.message = Some(CatalogMessage::Error(SAVE_FAILED.to_string()));
                false
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&mut self, pooja_id: &str) -> bool {
        match self.api.delete_pooja(pooja_id).await {
            Ok(()) => {
                self.message = Some(CatalogMessage::Success(POOJA_DELETED.to_string()));
                if self.editing.as_deref() == Some(pooja_id) {
                    self.cancel_edit();
                }
                self.load().await;
                true
            }
            Err(err) => {
                warn!(error = %err, "deleting pooja failed");
                self.message = Some(CatalogMessage::Error(DELETE_FAILED.to_string()));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testing::FakeApi;

    fn pooja(id: &str, name: &str, description: &str) -> Pooja {
        Pooja {
            id: id.to_string(),
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            image_url: None,
        }
    }

    async fn catalog() -> (Arc<FakeApi>, PoojaCatalog) {
        let api = Arc::new(FakeApi::default());
        *api.poojas.lock().expect("lock") = vec![
            pooja("pj1", "Ganesh Puja", "Removes obstacles"),
            pooja("pj2", "Havan", "Fire ritual for Ganesh Chaturthi"),
            pooja("pj3", "Satyanarayan Katha", "Full moon katha"),
        ];
        let mut view = PoojaCatalog::new(api.clone());
        view.load().await;
        (api, view)
    }

    #[tokio::test]
    async fn search_covers_name_and_description() {
        let (_, mut view) = catalog().await;
        view.search = "ganesh".to_string();
        assert_eq!(view.filtered().len(), 2);
        view.search = "MOON".to_string();
        assert_eq!(view.filtered()[0].id, "pj3");
    }

    #[tokio::test]
    async fn add_requires_name() {
        let (api, mut view) = catalog().await;
        view.form.description = "no name".to_string();
        assert!(!view.submit().await);
        assert_eq!(view.message().map(CatalogMessage::text), Some(NAME_REQUIRED));
        assert_eq!(api.calls(), vec!["list_poojas"]);

        view.form.name = "Rudrabhishek".to_string();
        assert!(view.submit().await);
        assert_eq!(view.message().map(CatalogMessage::text), Some(POOJA_ADDED));
        assert_eq!(view.poojas().len(), 4);
        assert_eq!(view.form, PoojaForm::default());
    }

    #[tokio::test]
    async fn edit_then_update() {
        let (api, mut view) = catalog().await;
        assert!(!view.start_edit("missing"));
        assert!(view.start_edit("pj2"));
        assert_eq!(view.form.name, "Havan");

        view.form.name = "Maha Havan".to_string();
        assert!(view.submit().await);
        assert_eq!(view.message().map(CatalogMessage::text), Some(POOJA_UPDATED));
        assert_eq!(view.editing(), None);
        assert_eq!(view.poojas()[1].name.as_deref(), Some("Maha Havan"));
        assert!(api.calls().contains(&"update_pooja:pj2".to_string()));
    }

    #[tokio::test]
    async fn failures_set_fixed_messages() {
        let (api, mut view) = catalog().await;
        api.set_failing(true);

        view.form.name = "Anything".to_string();
        assert!(!view.submit().await);
        assert_eq!(
            view.message(),
            Some(&CatalogMessage::Error(SAVE_FAILED.to_string()))
        );
        assert_eq!(view.form.name, "Anything");

        assert!(!view.delete("pj1").await);
        assert_eq!(view.message().map(CatalogMessage::text), Some(DELETE_FAILED));
        assert_eq!(view.poojas().len(), 3);

        api.set_failing(false);
        assert!(view.delete("pj1").await);
        assert_eq!(view.message().map(CatalogMessage::text), Some(POOJA_DELETED));
        assert_eq!(view.poojas().len(), 2);
    }
}
