//! Named plate geometries.
//!
//! Ships the common SBS footprint plates in micrometers and can be extended
//! from a YAML or JSON file mapping names to geometries.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use glam::DVec2;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::geometry::PlateGeometry;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlateCatalog {
    plates: BTreeMap<String, PlateGeometry>,
}

/// (name, rows, columns, spacing, well size, circular)
const BUILTIN: [(&str, usize, usize, f64, f64, bool); 6] = [
    ("6-well", 2, 3, 39_120.0, 34_800.0, true),
    ("12-well", 3, 4, 26_000.0, 22_110.0, true),
    ("24-well", 4, 6, 19_300.0, 15_540.0, true),
    ("48-well", 6, 8, 13_000.0, 11_050.0, true),
    ("96-well", 8, 12, 9_000.0, 6_400.0, true),
    ("384-well", 16, 24, 4_500.0, 3_400.0, false),
];

impl PlateCatalog {
    pub fn builtin() -> Self {
        let plates = BUILTIN
            .iter()
            .map(|&(name, rows, columns, spacing, size, circular)| {
                let geometry = PlateGeometry {
                    rows,
                    columns,
                    well_spacing: DVec2::splat(spacing),
                    well_size: DVec2::splat(size),
                    circular,
                };
                (name.to_string(), geometry)
            })
            .collect();
        Self { plates }
    }

    pub fn get(&self, name: &str) -> Option<&PlateGeometry> {
        self.plates.get(name)
    }

    /// Adds or replaces a plate; returns the previous geometry under `name`.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        geometry: PlateGeometry,
    ) -> crate::error::Result<Option<PlateGeometry>> {
        geometry.validate()?;
        Ok(self.plates.insert(name.into(), geometry))
    }

    pub fn remove(&mut self, name: &str) -> Option<PlateGeometry> {
        self.plates.remove(name)
    }

    /// Plate names in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.plates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    /// Loads a catalog file; every entry must be a valid geometry.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let catalog: Self = common::serde::read_file(path)?;
        for (name, geometry) in &catalog.plates {
            geometry
                .validate()
                .with_context(|| format!("Invalid plate '{}' in {}", name, path.display()))?;
        }
        info!("loaded {} plates from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        common::serde::write_file(path, self)
    }

    /// Adds every plate of `other`, replacing plates with the same name.
    pub fn merge(&mut self, other: PlateCatalog) {
        for (name, geometry) in other.plates {
            if self.plates.insert(name.clone(), geometry).is_some() {
                warn!("plate '{}' overridden", name);
            }
        }
    }
}
