use crate::domain::ledger::Ledger;
use crate::domain::model::{Assignment, Bike, Recovery};
use crate::domain::preference::Preference;
use crate::domain::recovery_date::RecoveryDate;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Byte-level storage addressed by relative paths.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    /// Replaces the file as a whole; readers never observe a partial write.
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Writes only if nothing exists at `path`. Returns false when it already existed.
    fn create_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Removing a missing file is not an error.
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Names of the files directly inside `dir`, empty if the directory does not exist.
    fn list_files(&self, dir: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Names of the subdirectories directly inside `dir`.
    fn list_dirs(&self, dir: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

/// Everything the allocation needs from persistence.
#[async_trait]
pub trait RecoveryStore: Send + Sync {
    async fn add_recovery(&self, recovery: &Recovery) -> Result<bool>;
    async fn list_recoveries(&self) -> Result<Vec<Recovery>>;

    async fn load_bikes(&self, date: &RecoveryDate) -> Result<Vec<Bike>>;

    async fn load_preferences(
        &self,
        association: &str,
        date: &RecoveryDate,
    ) -> Result<Option<Preference>>;
    async fn submission_exists(&self, association: &str, date: &RecoveryDate) -> Result<bool>;
    async fn record_submission(
        &self,
        association: &str,
        date: &RecoveryDate,
        preference: &Preference,
    ) -> Result<bool>;

    async fn load_ledger(&self) -> Result<Ledger>;
    async fn save_ledger(&self, ledger: &Ledger) -> Result<()>;

    async fn load_assignment(&self, date: &RecoveryDate) -> Result<Option<Assignment>>;
    async fn save_assignment(&self, date: &RecoveryDate, assignment: &Assignment) -> Result<bool>;

    /// Takes the lock that keeps allocation runs of separate processes apart.
    /// Returns false while another live holder has it.
    async fn try_lock_runs(&self) -> Result<bool>;
    async fn unlock_runs(&self) -> Result<()>;
}
