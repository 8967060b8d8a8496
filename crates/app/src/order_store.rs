//! Local plan order overrides.
//!
//! The dashboard writes the order an admin dragged plans into before it
//! tries the backend, so the order survives a backend that rejects or
//! ignores the reorder call.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use bayan_core::{
    errors::{BookingError, BookingResult},
    models::{Plan, PlanOrder, plan::UNORDERED},
};
use eyre::eyre;
use tracing::debug;

/// Plan id to display order.
pub type OrderMap = BTreeMap<String, i64>;

/// A JSON file mapping plan ids to their display order.
#[derive(Debug, Clone)]
pub struct PlanOrderStore {
    path: PathBuf,
}

impl PlanOrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored overrides; a missing file means none.
    pub fn load(&self) -> BookingResult<OrderMap> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(OrderMap::new()),
            Err(e) => {
                return Err(BookingError::Internal(eyre!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&raw).map_err(|e| {
            BookingError::Internal(eyre!("Corrupt plan order file {}: {}", self.path.display(), e))
        })
    }

    pub fn save(&self, orders: &[PlanOrder]) -> BookingResult<()> {
        let map: OrderMap = orders
            .iter()
            .map(|o| (o.plan_id.clone(), o.order))
            .collect();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                BookingError::Internal(eyre!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let body = serde_json::to_string_pretty(&map)
            .map_err(|e| BookingError::Internal(eyre!("Failed to encode plan order: {}", e)))?;
        fs::write(&self.path, body).map_err(|e| {
            BookingError::Internal(eyre!("Failed to write {}: {}", self.path.display(), e))
        })?;

        debug!("Saved {} plan order overrides to {}", map.len(), self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> BookingResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BookingError::Internal(eyre!(
                "Failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// Stored order wins, then the plan's own order, then [`UNORDERED`].
pub fn apply_overrides(plans: &mut [Plan], overrides: &OrderMap) {
    if overrides.is_empty() {
        return;
    }
    for plan in plans.iter_mut() {
        let stored = plan.plan_id().and_then(|id| overrides.get(id)).copied();
        plan.order = Some(stored.or(plan.order).unwrap_or(UNORDERED));
    }
}
