use crate::unit::{Unit, UnitStatus};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Authoritative store for unit availability.
///
/// Every status transition in the system funnels through `try_set_status`,
/// a compare-and-swap under a single lock, so two requests racing for the
/// same unit cannot both observe `available` and both win.
#[derive(Debug)]
pub struct UnitRegistry {
    units: Mutex<HashMap<Uuid, Unit>>,
}

impl UnitRegistry {
    pub fn new(units: Vec<Unit>) -> Self {
        Self {
            units: Mutex::new(units.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    /// Seed the catalog from a JSON file (an array of units).
    pub fn from_catalog_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Catalog(format!("{}: {}", path.display(), e)))?;
        let units: Vec<Unit> = serde_json::from_str(&raw)
            .map_err(|e| RegistryError::Catalog(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Seeded unit catalog from {}: {} units", path.display(), units.len());
        Ok(Self::new(units))
    }

    /// Snapshot of one unit.
    pub fn get(&self, unit_id: &Uuid) -> Option<Unit> {
        self.lock().get(unit_id).cloned()
    }

    pub fn status(&self, unit_id: &Uuid) -> Result<UnitStatus, RegistryError> {
        self.lock()
            .get(unit_id)
            .map(|u| u.status)
            .ok_or(RegistryError::NotFound(*unit_id))
    }

    /// Snapshot of the whole catalog, ordered by unit code for stable
    /// listings.
    pub fn list(&self) -> Vec<Unit> {
        let mut units: Vec<Unit> = self.lock().values().cloned().collect();
        units.sort_by(|a, b| a.code.cmp(&b.code));
        units
    }

    /// Atomically move a unit from `expected` to `next`. Fails without
    /// side effects when the unit is missing or its status has already
    /// moved on, carrying the actual status so callers can report why.
    pub fn try_set_status(
        &self,
        unit_id: &Uuid,
        expected: UnitStatus,
        next: UnitStatus,
    ) -> Result<(), RegistryError> {
        let mut units = self.lock();
        let unit = units
            .get_mut(unit_id)
            .ok_or(RegistryError::NotFound(*unit_id))?;

        if unit.status != expected {
            return Err(RegistryError::Conflict {
                expected,
                actual: unit.status,
            });
        }

        unit.status = next;
        tracing::debug!("Unit {} status {} -> {}", unit.code, expected, next);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Unit>> {
        self.units.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unit not found: {0}")]
    NotFound(Uuid),

    #[error("Unit status moved concurrently: expected {expected}, found {actual}")]
    Conflict {
        expected: UnitStatus,
        actual: UnitStatus,
    },

    #[error("Catalog load failed: {0}")]
    Catalog(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitType;

    fn villa(code: &str) -> Unit {
        Unit {
            id: Uuid::new_v4(),
            code: code.to_string(),
            unit_type: UnitType::Villa,
            floor: 0,
            price_minor: 185_000_000,
            currency: "EUR".to_string(),
            area_sqm: 412.5,
            orientation: "sea".to_string(),
            status: UnitStatus::Available,
        }
    }

    #[test]
    fn test_cas_wins_once() {
        let unit = villa("V-01");
        let id = unit.id;
        let registry = UnitRegistry::new(vec![unit]);

        registry
            .try_set_status(&id, UnitStatus::Available, UnitStatus::Held)
            .unwrap();

        // the state already moved; a second identical swap must lose
        let err = registry
            .try_set_status(&id, UnitStatus::Available, UnitStatus::Held)
            .unwrap_err();
        match err {
            RegistryError::Conflict { expected, actual } => {
                assert_eq!(expected, UnitStatus::Available);
                assert_eq!(actual, UnitStatus::Held);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(registry.status(&id).unwrap(), UnitStatus::Held);
    }

    #[test]
    fn test_cas_unknown_unit() {
        let registry = UnitRegistry::new(vec![]);
        let err = registry
            .try_set_status(&Uuid::new_v4(), UnitStatus::Available, UnitStatus::Held)
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn test_list_is_ordered_by_code() {
        let registry = UnitRegistry::new(vec![villa("V-09"), villa("A-101"), villa("P-01")]);
        let codes: Vec<String> = registry.list().into_iter().map(|u| u.code).collect();
        assert_eq!(codes, vec!["A-101", "P-01", "V-09"]);
    }

    #[test]
    fn test_catalog_file_seeding() {
        let path = std::env::temp_dir().join(format!("cresta-catalog-{}.json", Uuid::new_v4()));
        let units = vec![villa("V-01"), villa("V-02")];
        std::fs::write(&path, serde_json::to_string(&units).unwrap()).unwrap();

        let registry = UnitRegistry::from_catalog_file(&path).unwrap();
        assert_eq!(registry.list().len(), 2);
        assert_eq!(registry.status(&units[0].id).unwrap(), UnitStatus::Available);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_catalog_file_missing() {
        let err = UnitRegistry::from_catalog_file("/nonexistent/units.json").unwrap_err();
        assert!(matches!(err, RegistryError::Catalog(_)));
    }
}
