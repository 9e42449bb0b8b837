use crate::core::normalizer::normalize_preferences;
use crate::domain::model::Association;
use crate::domain::ports::RecoveryStore;
use crate::domain::preference::{Preference, Tier};
use crate::domain::recovery_date::RecoveryDate;
use crate::utils::error::{AllocError, Result};
use chrono::NaiveDateTime;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Recorded(Preference),
    /// A previous submission for this association and date stands.
    AlreadySubmitted,
}

/// Accepts preference submissions while the recovery's deadline has not passed.
pub struct SubmissionService<S: RecoveryStore> {
    store: Arc<S>,
    associations: Vec<Association>,
    enforce_deadlines: bool,
}

impl<S: RecoveryStore> SubmissionService<S> {
    pub fn new(store: Arc<S>, associations: Vec<Association>) -> Self {
        Self {
            store,
            associations,
            enforce_deadlines: true,
        }
    }

    pub fn with_deadlines(mut self, enforce: bool) -> Self {
        self.enforce_deadlines = enforce;
        self
    }

    pub async fn submit<I, K, V>(
        &self,
        association: &str,
        date: &RecoveryDate,
        fields: I,
        now: NaiveDateTime,
    ) -> Result<SubmissionOutcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if !self.associations.iter().any(|a| a.id == association) {
            return Err(AllocError::UnknownAssociation {
                id: association.to_string(),
            });
        }

        if self.enforce_deadlines && !date.is_submission_open(now) {
            return Err(AllocError::SubmissionClosed {
                date: date.to_string(),
            });
        }

        if self.store.submission_exists(association, date).await? {
            tracing::info!("Preference of {} for {} was already submitted", association, date);
            return Ok(SubmissionOutcome::AlreadySubmitted);
        }

        let preference = normalize_preferences(fields)?;

        let bikes = self.store.load_bikes(date).await?;
        let unknown: Vec<&str> = preference
            .tiers
            .keys()
            .filter(|id| !bikes.iter().any(|bike| &bike.id == *id))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(
                "Preference of {} for {} names unknown bikes: {}",
                association,
                date,
                unknown.join(", ")
            );
        }

        if !self
            .store
            .record_submission(association, date, &preference)
            .await?
        {
            tracing::info!("Preference of {} for {} was already submitted", association, date);
            return Ok(SubmissionOutcome::AlreadySubmitted);
        }

        tracing::info!(
            "Stored preference of {} for {} ({} bikes wanted, quota {})",
            association,
            date,
            preference.tiers.len() - preference.count_at(Tier::NotInterested),
            preference
                .requested_quota
                .map(|q| q.to_string())
                .unwrap_or_else(|| "all".to_string())
        );
        Ok(SubmissionOutcome::Recorded(preference))
    }
}
