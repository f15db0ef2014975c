use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::services::dataset::Dataset;

/// Shared request state. The dataset is immutable after startup, so
/// handlers share it through an `Arc` with no locking.
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub loaded_at: DateTime<Utc>,
    pub etag: String,
}

impl AppState {
    pub fn new(dataset: Dataset) -> Self {
        let loaded_at = Utc::now();
        let etag = format!(
            "\"parcels-{}-{}\"",
            dataset.parcel_count(),
            loaded_at.timestamp()
        );
        Self {
            dataset: Arc::new(dataset),
            loaded_at,
            etag,
        }
    }
}
