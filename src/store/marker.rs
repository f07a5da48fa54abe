use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use super::{SettingsStore, StoreError};

/// Settings key holding the RFC 3339 time of the last completed sweep.
pub const LAST_RUN_KEY: &str = "auto_absence_last_run";

/// Durable "last sweep finished at" scalar. Last writer wins.
#[async_trait]
pub trait RunMarker: Send + Sync {
    async fn last_run(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn record_run(&self, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Keeps the marker in the generic settings table, so it survives restarts
/// and is shared by every process pointing at the same database.
pub struct SettingsRunMarker<S: ?Sized> {
    settings: Arc<S>,
}

impl<S: ?Sized> SettingsRunMarker<S> {
    pub fn new(settings: Arc<S>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl<S: SettingsStore + ?Sized> RunMarker for SettingsRunMarker<S> {
    async fn last_run(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(raw) = self.settings.get(LAST_RUN_KEY).await? else {
            return Ok(None);
        };

        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                warn!(error = %e, value = %raw, "Unparsable last-run marker, treating as never run");
                Ok(None)
            }
        }
    }

    async fn record_run(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.settings.set(LAST_RUN_KEY, &at.to_rfc3339()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;

    #[actix_web::test]
    async fn missing_marker_reads_as_never_run() {
        let marker = SettingsRunMarker::new(Arc::new(MemoryStore::default()));
        assert_eq!(marker.last_run().await.unwrap(), None);
    }

    #[actix_web::test]
    async fn recorded_run_survives_a_fresh_marker() {
        let store = Arc::new(MemoryStore::default());
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();

        SettingsRunMarker::new(store.clone()).record_run(at).await.unwrap();

        // a new marker over the same store, as after a restart
        let reloaded = SettingsRunMarker::new(store);
        assert_eq!(reloaded.last_run().await.unwrap(), Some(at));
    }

    #[actix_web::test]
    async fn garbage_marker_reads_as_never_run() {
        let store = Arc::new(MemoryStore::default());
        store.set(LAST_RUN_KEY, "yesterday-ish").await.unwrap();

        let marker = SettingsRunMarker::new(store);
        assert_eq!(marker.last_run().await.unwrap(), None);
    }
}
