use crate::domain::ledger::Ledger;
use crate::domain::model::{Assignment, Association, Bike};
use crate::utils::error::{AllocError, Result};
use serde::Serialize;

/// What one association gets to see of an assignment.
#[derive(Debug, Clone)]
pub struct AssociationView<'a> {
    pub association: &'a str,
    pub total: usize,
    pub assigned: Vec<&'a Bike>,
    pub unassigned: Vec<&'a Bike>,
}

impl<'a> AssociationView<'a> {
    pub fn new(assignment: &'a Assignment, association: &'a str) -> Self {
        Self {
            association,
            total: assignment.bikes.len(),
            assigned: assignment.bikes_for(association).collect(),
            unassigned: assignment.unassigned().collect(),
        }
    }
}

#[derive(Serialize)]
struct AssignmentRow<'a> {
    bike_id: &'a str,
    file_name: &'a str,
    association: &'a str,
}

/// One row per bike; unassigned bikes have an empty association column.
pub fn assignment_csv(assignment: &Assignment) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for bike in &assignment.bikes {
        writer.serialize(AssignmentRow {
            bike_id: &bike.id,
            file_name: &bike.file_name,
            association: bike.assigned_to.as_deref().unwrap_or(""),
        })?;
    }

    let data = writer.into_inner().map_err(|e| AllocError::StorageError {
        message: format!("Failed to finish CSV output: {}", e),
    })?;
    String::from_utf8(data).map_err(|e| AllocError::StorageError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

/// Points of the configured associations, highest first.
pub fn standings<'a>(ledger: &Ledger, associations: &'a [Association]) -> Vec<(&'a Association, f64)> {
    let mut rows: Vec<_> = associations
        .iter()
        .map(|association| (association, ledger.score(&association.id)))
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    rows
}
