use std::sync::Arc;
use std::time::Instant;

use crate::images::{ImagePolicy, ImageStore};
use crate::repository::Storage;
use crate::service::{CatalogService, LeadService};

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub leads: LeadService,
    pub storage: Storage,
    pub admin_token: Option<Arc<str>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        storage: Storage,
        images: Arc<dyn ImageStore>,
        image_policy: ImagePolicy,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            catalog: CatalogService::new(storage.cars.clone(), images, image_policy),
            leads: LeadService::new(storage.contacts.clone(), storage.cars.clone()),
            storage,
            admin_token: admin_token.map(Arc::from),
            started_at: Instant::now(),
        }
    }
}
