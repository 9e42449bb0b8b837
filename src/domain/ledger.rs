use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fairness points per association, carried across recovery dates.
///
/// Losing a contested bike earns points and winning one costs points, so an
/// association that keeps losing eventually outranks the others. Scores have no
/// floor or ceiling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    scores: BTreeMap<String, f64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures every listed association has an entry, starting at zero.
    pub fn with_associations<'a, I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in ids {
            self.scores.entry(id.to_string()).or_insert(0.0);
        }
        self
    }

    pub fn score(&self, id: &str) -> f64 {
        self.scores.get(id).copied().unwrap_or(0.0)
    }

    pub fn adjust(&mut self, id: &str, delta: f64) {
        *self.scores.entry(id.to_string()).or_insert(0.0) += delta;
    }

    pub fn set(&mut self, id: &str, score: f64) {
        self.scores.insert(id.to_string(), score);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(id, score)| (id.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl FromIterator<(String, f64)> for Ledger {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}
