use crate::domain::ledger::Ledger;
use crate::domain::model::{Assignment, Bike, Recovery};
use crate::domain::ports::{RecoveryStore, Storage};
use crate::domain::preference::Preference;
use crate::domain::recovery_date::RecoveryDate;
use crate::utils::error::{AllocError, Result};
use crate::utils::validation::validate_file_extension;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const POINTS_FILE: &str = "points.json";
const RECOVERIES_DIR: &str = "recoveries";
const PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const LOCK_FILE: &str = "allocation.lock";

/// Runs take well under a second; a lock this old was left by a crashed process.
const LOCK_STALE_AFTER: TimeDelta = TimeDelta::minutes(10);

/// Contents of the lock file, for diagnosing who holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockSentinel {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

impl LockSentinel {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.acquired_at > LOCK_STALE_AFTER
    }
}

/// JSON documents laid out per recovery date:
///
/// ```text
/// points.json
/// recoveries/<date>/recovery.json
/// recoveries/<date>/bikes/<photo>
/// recoveries/<date>/preferences/<association>.json
/// recoveries/<date>/assigned-bikes.json
/// allocation.lock            (only while a run is in progress)
/// ```
#[derive(Debug, Clone)]
pub struct DocumentStore<S: Storage> {
    storage: S,
}

impl<S: Storage> DocumentStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn recovery_dir(date: &RecoveryDate) -> String {
        format!("{}/{}", RECOVERIES_DIR, date)
    }

    fn recovery_path(date: &RecoveryDate) -> String {
        format!("{}/recovery.json", Self::recovery_dir(date))
    }

    pub fn bikes_dir(date: &RecoveryDate) -> String {
        format!("{}/bikes", Self::recovery_dir(date))
    }

    fn preference_path(association: &str, date: &RecoveryDate) -> String {
        format!("{}/preferences/{}.json", Self::recovery_dir(date), association)
    }

    fn assignment_path(date: &RecoveryDate) -> String {
        format!("{}/assigned-bikes.json", Self::recovery_dir(date))
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        if !self.storage.exists(path).await? {
            return Ok(None);
        }
        let data = self.storage.read_file(path).await?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn create_json<T: Serialize + Sync>(&self, path: &str, value: &T) -> Result<bool> {
        let data = serde_json::to_vec_pretty(value)?;
        self.storage.create_file(path, &data).await
    }
}

#[async_trait]
impl<S: Storage> RecoveryStore for DocumentStore<S> {
    async fn add_recovery(&self, recovery: &Recovery) -> Result<bool> {
        let created = self
            .create_json(&Self::recovery_path(&recovery.date), recovery)
            .await?;
        if created {
            tracing::info!("Registered recovery {}", recovery.date);
        } else {
            tracing::debug!("Recovery {} was already registered", recovery.date);
        }
        Ok(created)
    }

    async fn list_recoveries(&self) -> Result<Vec<Recovery>> {
        let mut recoveries = Vec::new();
        for dir in self.storage.list_dirs(RECOVERIES_DIR).await? {
            let Ok(date) = RecoveryDate::parse(&dir) else {
                tracing::warn!("Ignoring unexpected directory {}/{}", RECOVERIES_DIR, dir);
                continue;
            };
            if let Some(recovery) = self.read_json::<Recovery>(&Self::recovery_path(&date)).await? {
                recoveries.push(recovery);
            }
        }
        recoveries.sort_by_key(|recovery| recovery.date);
        Ok(recoveries)
    }

    async fn load_bikes(&self, date: &RecoveryDate) -> Result<Vec<Bike>> {
        let dir = Self::bikes_dir(date);
        let mut bikes: Vec<Bike> = self
            .storage
            .list_files(&dir)
            .await?
            .into_iter()
            .filter(|name| validate_file_extension(name, &PHOTO_EXTENSIONS))
            .map(|name| Bike::from_photo(format!("{}/{}", dir, name), name))
            .collect();
        bikes.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.file_name.cmp(&b.file_name)));

        // the id is the file stem, so B1.jpg and B1.png would be the same bike
        bikes.dedup_by(|duplicate, kept| {
            let same = duplicate.id == kept.id;
            if same {
                tracing::warn!(
                    "Ignoring photo {} for {}: bike {} already comes from {}",
                    duplicate.file_name,
                    date,
                    kept.id,
                    kept.file_name
                );
            }
            same
        });

        if bikes.is_empty() {
            tracing::debug!("No bike photos found for {}", date);
        }
        Ok(bikes)
    }

    async fn load_preferences(
        &self,
        association: &str,
        date: &RecoveryDate,
    ) -> Result<Option<Preference>> {
        let preference = self
            .read_json(&Self::preference_path(association, date))
            .await?;
        if preference.is_none() {
            tracing::debug!("No preference submitted by {} for {}", association, date);
        }
        Ok(preference)
    }

    async fn submission_exists(&self, association: &str, date: &RecoveryDate) -> Result<bool> {
        self.storage
            .exists(&Self::preference_path(association, date))
            .await
    }

    async fn record_submission(
        &self,
        association: &str,
        date: &RecoveryDate,
        preference: &Preference,
    ) -> Result<bool> {
        self.create_json(&Self::preference_path(association, date), preference)
            .await
    }

    async fn load_ledger(&self) -> Result<Ledger> {
        let ledger = self.read_json(POINTS_FILE).await?;
        if ledger.is_none() {
            tracing::debug!("No points stored so far");
        }
        Ok(ledger.unwrap_or_default())
    }

    async fn save_ledger(&self, ledger: &Ledger) -> Result<()> {
        let data = serde_json::to_vec_pretty(ledger)?;
        self.storage.write_file(POINTS_FILE, &data).await
    }

    async fn load_assignment(&self, date: &RecoveryDate) -> Result<Option<Assignment>> {
        self.read_json(&Self::assignment_path(date)).await
    }

    async fn save_assignment(&self, date: &RecoveryDate, assignment: &Assignment) -> Result<bool> {
        let created = self
            .create_json(&Self::assignment_path(date), assignment)
            .await?;
        if !created {
            tracing::warn!("Assignment for {} was already stored", date);
        }
        Ok(created)
    }

    async fn try_lock_runs(&self) -> Result<bool> {
        let sentinel = LockSentinel::current();
        if self.create_json(LOCK_FILE, &sentinel).await? {
            tracing::debug!("Acquired {} (pid {})", LOCK_FILE, sentinel.pid);
            return Ok(true);
        }

        match self.read_json::<LockSentinel>(LOCK_FILE).await {
            Ok(Some(held)) if !held.is_stale(Utc::now()) => {
                tracing::debug!(
                    "{} is held by pid {} since {}",
                    LOCK_FILE,
                    held.pid,
                    held.acquired_at
                );
                Ok(false)
            }
            // released in between, the caller tries again
            Ok(None) => Ok(false),
            Ok(Some(held)) => {
                tracing::warn!(
                    "Recovering stale {} of pid {} (held since {})",
                    LOCK_FILE,
                    held.pid,
                    held.acquired_at
                );
                self.storage.remove_file(LOCK_FILE).await?;
                self.create_json(LOCK_FILE, &sentinel).await
            }
            Err(AllocError::SerializationError(e)) => {
                tracing::warn!("Recovering unreadable {}: {}", LOCK_FILE, e);
                self.storage.remove_file(LOCK_FILE).await?;
                self.create_json(LOCK_FILE, &sentinel).await
            }
            Err(e) => Err(e),
        }
    }

    async fn unlock_runs(&self) -> Result<()> {
        self.storage.remove_file(LOCK_FILE).await?;
        tracing::debug!("Released {}", LOCK_FILE);
        Ok(())
    }
}
