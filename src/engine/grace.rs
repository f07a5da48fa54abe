use tracing::{error, info, warn};

use super::{AttendanceEngine, EngineError};
use crate::store::{SettingsStore, StoreError};

pub const GRACE_PERIOD_KEY: &str = "auto_absence_grace_minutes";
pub const DEFAULT_GRACE_MINUTES: u32 = 15;
pub const MIN_GRACE_MINUTES: u32 = 5;
pub const MAX_GRACE_MINUTES: u32 = 60;

pub fn clamp_grace_minutes(minutes: i64) -> u32 {
    minutes.clamp(MIN_GRACE_MINUTES as i64, MAX_GRACE_MINUTES as i64) as u32
}

/// Reads the grace period. Unset or unparsable values fall back to the
/// default; stored values outside the bounds are clamped.
pub async fn read_grace_minutes<S: SettingsStore + ?Sized>(settings: &S) -> Result<u32, StoreError> {
    let Some(raw) = settings.get(GRACE_PERIOD_KEY).await? else {
        return Ok(DEFAULT_GRACE_MINUTES);
    };

    match raw.trim().parse::<i64>() {
        Ok(minutes) => Ok(clamp_grace_minutes(minutes)),
        Err(_) => {
            warn!(value = %raw, "Unparsable grace period, using default");
            Ok(DEFAULT_GRACE_MINUTES)
        }
    }
}

/// Clamps and persists; returns the value actually stored.
pub async fn write_grace_minutes<S: SettingsStore + ?Sized>(
    settings: &S,
    minutes: i64,
) -> Result<u32, StoreError> {
    let stored = clamp_grace_minutes(minutes);
    settings.set(GRACE_PERIOD_KEY, &stored.to_string()).await?;
    Ok(stored)
}

impl AttendanceEngine {
    pub async fn grace_period(&self) -> Result<u32, EngineError> {
        Ok(read_grace_minutes(self.store.as_ref()).await?)
    }

    /// `false` only when the settings store could not be written.
    pub async fn set_grace_period(&self, minutes: i64) -> bool {
        match write_grace_minutes(self.store.as_ref(), minutes).await {
            Ok(stored) => {
                info!(requested = minutes, stored, "Grace period updated");
                true
            }
            Err(e) => {
                error!(error = %e, requested = minutes, "Failed to update grace period");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::*;

    #[test]
    fn clamp_keeps_values_in_bounds() {
        assert_eq!(clamp_grace_minutes(100), 60);
        assert_eq!(clamp_grace_minutes(1), 5);
        assert_eq!(clamp_grace_minutes(-30), 5);
        assert_eq!(clamp_grace_minutes(15), 15);
        assert_eq!(clamp_grace_minutes(60), 60);
    }

    #[actix_web::test]
    async fn set_grace_period_stores_the_clamped_value() {
        let (engine, store, _) = engine(vec![], local(2026, 10, 17, 9, 0));

        for (requested, stored) in [(100, "60"), (1, "5"), (15, "15")] {
            assert!(engine.set_grace_period(requested).await);
            assert_eq!(store.setting(GRACE_PERIOD_KEY).as_deref(), Some(stored));
        }
        assert_eq!(engine.grace_period().await.unwrap(), 15);
    }

    #[actix_web::test]
    async fn unset_or_garbage_reads_as_default() {
        let (engine, store, _) = engine(vec![], local(2026, 10, 17, 9, 0));
        assert_eq!(engine.grace_period().await.unwrap(), DEFAULT_GRACE_MINUTES);

        store.set(GRACE_PERIOD_KEY, "fifteen").await.unwrap();
        assert_eq!(engine.grace_period().await.unwrap(), DEFAULT_GRACE_MINUTES);
    }

    #[actix_web::test]
    async fn out_of_range_stored_values_are_clamped_on_read() {
        let (engine, store, _) = engine(vec![], local(2026, 10, 17, 9, 0));
        store.set(GRACE_PERIOD_KEY, "240").await.unwrap();
        assert_eq!(engine.grace_period().await.unwrap(), 60);
    }

    #[actix_web::test]
    async fn unreachable_store_reports_failure() {
        let (engine, store, _) = engine(vec![], local(2026, 10, 17, 9, 0));
        store.set_offline(true);

        assert!(!engine.set_grace_period(20).await);
        assert!(engine.grace_period().await.is_err());
    }
}
