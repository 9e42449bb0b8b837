use crate::domain::recovery_date::RecoveryDate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bike {
    pub id: String,
    pub file_id: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl Bike {
    /// Builds a bike from its photo; the id is the file name without extension.
    pub fn from_photo(file_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let id = std::path::Path::new(&file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&file_name)
            .to_string();

        Self {
            id,
            file_id: file_id.into(),
            file_name,
            assigned_to: None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub id: String,
    pub name: String,
}

/// A registered recovery date and where its photos come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recovery {
    pub date: RecoveryDate,
    pub images_url: String,
}

/// Final outcome of one allocation run. Never modified once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub recovery_date: RecoveryDate,
    pub computed_at: DateTime<Utc>,
    pub bikes: Vec<Bike>,
    pub counts: BTreeMap<String, usize>,
}

impl Assignment {
    pub fn new(recovery_date: RecoveryDate, bikes: Vec<Bike>) -> Self {
        let mut counts = BTreeMap::new();
        for owner in bikes.iter().filter_map(|bike| bike.assigned_to.as_deref()) {
            *counts.entry(owner.to_string()).or_insert(0) += 1;
        }

        Self {
            recovery_date,
            computed_at: Utc::now(),
            bikes,
            counts,
        }
    }

    pub fn bikes_for<'a>(&'a self, association: &'a str) -> impl Iterator<Item = &'a Bike> + 'a {
        self.bikes
            .iter()
            .filter(move |bike| bike.assigned_to.as_deref() == Some(association))
    }

    pub fn unassigned(&self) -> impl Iterator<Item = &Bike> {
        self.bikes.iter().filter(|bike| !bike.is_assigned())
    }

    pub fn count_for(&self, association: &str) -> usize {
        self.counts.get(association).copied().unwrap_or(0)
    }

    pub fn owner_of(&self, bike_id: &str) -> Option<&str> {
        self.bikes
            .iter()
            .find(|bike| bike.id == bike_id)
            .and_then(|bike| bike.assigned_to.as_deref())
    }
}
