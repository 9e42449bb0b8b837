use crate::core::allocation::{AllocationEngine, AllocationInput, Claimant};
use crate::domain::model::{Assignment, Association};
use crate::domain::ports::RecoveryStore;
use crate::domain::recovery_date::RecoveryDate;
use crate::utils::error::{AllocError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const LOCK_RETRY: Duration = Duration::from_millis(100);

/// Hands out the assignment of a recovery date, computing it the first time it is asked for.
///
/// A single exclusive section covers every recovery date, so at most one
/// allocation runs at a time in the process. Share one coordinator (behind an
/// `Arc`) between all callers. Inside the section the store's run lock keeps
/// other processes on the same data out as well.
pub struct RunCoordinator<S: RecoveryStore> {
    store: Arc<S>,
    associations: Vec<Association>,
    engine: AllocationEngine,
    // the RNG is only ever used while computing, so it doubles as the section's guard
    section: Mutex<StdRng>,
}

impl<S: RecoveryStore> RunCoordinator<S> {
    pub fn new(store: Arc<S>, associations: Vec<Association>) -> Self {
        Self::with_rng(store, associations, StdRng::from_os_rng())
    }

    /// Reproducible runs, mainly for tests.
    pub fn with_seed(store: Arc<S>, associations: Vec<Association>, seed: u64) -> Self {
        Self::with_rng(store, associations, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: Arc<S>, associations: Vec<Association>, rng: StdRng) -> Self {
        Self {
            store,
            associations,
            engine: AllocationEngine::new(),
            section: Mutex::new(rng),
        }
    }

    pub async fn get_or_compute(&self, date: &RecoveryDate) -> Result<Assignment> {
        if let Some(assignment) = self.store.load_assignment(date).await? {
            return Ok(assignment);
        }

        let mut rng = self.section.lock().await;
        self.lock_runs(date).await?;

        let result = self.compute_once(date, &mut rng).await;

        if let Err(e) = self.store.unlock_runs().await {
            tracing::error!("Failed to release the run lock after {}: {}", date, e);
        }
        result
    }

    /// Waits for runs of other processes; there is no timeout, a crashed
    /// holder's lock goes stale instead.
    async fn lock_runs(&self, date: &RecoveryDate) -> Result<()> {
        let mut waiting = false;
        while !self.store.try_lock_runs().await? {
            if !waiting {
                tracing::info!("Another process is allocating, waiting before {}", date);
                waiting = true;
            }
            tokio::time::sleep(LOCK_RETRY).await;
        }
        Ok(())
    }

    async fn compute_once(&self, date: &RecoveryDate, rng: &mut StdRng) -> Result<Assignment> {
        // another request may have finished the run while we were waiting
        if let Some(assignment) = self.store.load_assignment(date).await? {
            tracing::debug!("Assignment for {} was computed while waiting", date);
            return Ok(assignment);
        }

        let started = Instant::now();
        tracing::info!("Computing bike assignment for {}", date);

        let bikes = self.store.load_bikes(date).await?;
        if bikes.is_empty() {
            return Err(AllocError::NoBikes {
                date: date.to_string(),
            });
        }

        let mut claimants = Vec::with_capacity(self.associations.len());
        for association in &self.associations {
            let preference = self.store.load_preferences(&association.id, date).await?;
            claimants.push(Claimant::new(association.id.clone(), preference));
        }

        let ledger = self
            .store
            .load_ledger()
            .await?
            .with_associations(self.associations.iter().map(|a| a.id.as_str()));
        let previous = ledger.clone();
        tracing::debug!("Points before {}: {:?}", date, ledger);

        let input = AllocationInput {
            recovery_date: *date,
            bikes,
            claimants,
        };
        let outcome = self.engine.allocate(input, ledger, rng);

        tracing::info!(
            "Allocated {} of {} bikes for {} ({} direct, {} contested, {} contests without room)",
            outcome.assignment.counts.values().sum::<usize>(),
            outcome.assignment.bikes.len(),
            date,
            outcome.direct_count(),
            outcome.contest_count(),
            outcome.unresolved_contests()
        );
        tracing::debug!("Points after {}: {:?}", date, outcome.ledger);

        // points first: if the assignment write then fails, nothing counts as persisted
        // and the next request recomputes
        self.store.save_ledger(&outcome.ledger).await?;

        if !self.store.save_assignment(date, &outcome.assignment).await? {
            // the stored assignment did not come from this run, so neither may the points
            tracing::warn!(
                "Assignment for {} appeared while computing, keeping it and restoring points",
                date
            );
            self.store.save_ledger(&previous).await?;
            return self
                .store
                .load_assignment(date)
                .await?
                .ok_or_else(|| AllocError::StorageError {
                    message: format!("assignment for {} vanished after a conflicting write", date),
                });
        }

        tracing::info!("Stored assignment for {} in {:?}", date, started.elapsed());
        Ok(outcome.assignment)
    }
}
