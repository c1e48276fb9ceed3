//! In-process [`FineRepository`] backed by tokio locks.
//!
//! Used as the fixture store in tests and benches. It honours the same
//! ordering contracts as the hosted store and can be told to reject updates
//! for chosen fines to exercise partial-failure paths.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AssignedFine, Lease, PaymentStatus, TrafficFine, ValidationLogEntry, ValidationResult, Vehicle,
};

use super::error::{StoreError, StoreResult};
use super::repository::{FinePatch, FineRepository};

#[derive(Debug, Default)]
struct Tables {
    fines: Vec<TrafficFine>,
    vehicles: Vec<Vehicle>,
    leases: Vec<Lease>,
    validation_logs: Vec<ValidationLogEntry>,
    rejected_updates: HashSet<String>,
}

/// A [`FineRepository`] that keeps every table in memory.
///
/// # Example
///
/// ```
/// use fine_reconciler::store::{FineRepository, MemoryStore};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let store = MemoryStore::new();
///     assert!(store.unassigned_fines().await.unwrap().is_empty());
/// });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with fines, vehicles and leases.
    pub fn seeded(fines: Vec<TrafficFine>, vehicles: Vec<Vehicle>, leases: Vec<Lease>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                fines,
                vehicles,
                leases,
                ..Tables::default()
            }),
        }
    }

    /// Makes every later update of `fine_id` fail with a backend error.
    pub async fn reject_updates_for(&self, fine_id: impl Into<String>) {
        self.tables
            .write()
            .await
            .rejected_updates
            .insert(fine_id.into());
    }

    /// Returns every fine currently stored.
    pub async fn all_fines(&self) -> Vec<TrafficFine> {
        self.tables.read().await.fines.clone()
    }
}

#[async_trait]
impl FineRepository for MemoryStore {
    async fn get_fine(&self, fine_id: &str) -> StoreResult<Option<TrafficFine>> {
        let tables = self.tables.read().await;
        Ok(tables.fines.iter().find(|f| f.id == fine_id).cloned())
    }

    async fn fines_by_plate(
        &self,
        license_plate: &str,
        payment_status: Option<PaymentStatus>,
    ) -> StoreResult<Vec<TrafficFine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .fines
            .iter()
            .filter(|f| f.license_plate == license_plate)
            .filter(|f| payment_status.is_none_or(|status| f.payment_status == status))
            .cloned()
            .collect())
    }

    async fn unassigned_fines(&self) -> StoreResult<Vec<TrafficFine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .fines
            .iter()
            .filter(|f| f.lease_id.is_none())
            .cloned()
            .collect())
    }

    async fn assigned_fines(&self) -> StoreResult<Vec<AssignedFine>> {
        let tables = self.tables.read().await;
        let joined = tables
            .fines
            .iter()
            .filter_map(|fine| {
                let lease_id = fine.lease_id.as_ref()?;
                let lease = tables.leases.iter().find(|l| &l.id == lease_id);
                Some(AssignedFine {
                    fine_id: fine.id.clone(),
                    lease_id: lease_id.clone(),
                    license_plate: fine.license_plate.clone(),
                    violation_date: fine.violation_date,
                    lease_start: lease.map(|l| l.start_date),
                    lease_end: lease.and_then(|l| l.end_date),
                })
            })
            .collect();
        Ok(joined)
    }

    async fn update_fine(&self, fine_id: &str, patch: FinePatch) -> StoreResult<TrafficFine> {
        let mut tables = self.tables.write().await;
        if tables.rejected_updates.contains(fine_id) {
            return Err(StoreError::Backend {
                message: format!("update rejected for fine '{}'", fine_id),
            });
        }

        let fine = tables
            .fines
            .iter_mut()
            .find(|f| f.id == fine_id)
            .ok_or_else(|| StoreError::NotFound {
                table: "traffic_fines",
                id: fine_id.to_string(),
            })?;
        patch.apply_to(fine);
        debug!(fine_id = %fine_id, ?patch, "fine updated");
        Ok(fine.clone())
    }

    async fn vehicles_by_plate(&self, license_plate: &str) -> StoreResult<Vec<Vehicle>> {
        let tables = self.tables.read().await;
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .iter()
            .filter(|v| v.license_plate == license_plate)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(vehicles)
    }

    async fn leases_for_vehicles(&self, vehicle_ids: &[String]) -> StoreResult<Vec<Lease>> {
        let tables = self.tables.read().await;
        let mut leases: Vec<Lease> = tables
            .leases
            .iter()
            .filter(|l| vehicle_ids.contains(&l.vehicle_id))
            .cloned()
            .collect();
        leases.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(leases)
    }

    async fn latest_validation(
        &self,
        license_plate: &str,
    ) -> StoreResult<Option<ValidationLogEntry>> {
        Ok(self.validation_history(license_plate).await?.into_iter().next())
    }

    async fn insert_validation(
        &self,
        result: &ValidationResult,
    ) -> StoreResult<ValidationLogEntry> {
        let entry = ValidationLogEntry {
            id: Uuid::new_v4().to_string(),
            validation_date: Utc::now(),
            result: result.clone(),
        };
        self.tables.write().await.validation_logs.push(entry.clone());
        Ok(entry)
    }

    async fn validation_history(
        &self,
        license_plate: &str,
    ) -> StoreResult<Vec<ValidationLogEntry>> {
        let tables = self.tables.read().await;
        // Newest insert first among entries sharing a timestamp.
        let mut history: Vec<ValidationLogEntry> = tables
            .validation_logs
            .iter()
            .rev()
            .filter(|e| e.result.license_plate == license_plate)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.validation_date.cmp(&a.validation_date));
        Ok(history)
    }
}
