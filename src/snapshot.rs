use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::island::{CellCensus, Island, SpeciesCounts};

/// Animal distribution exported for plotting tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSnapshot {
    pub scenario: String,
    pub year: u64,
    pub written_at: DateTime<Utc>,
    pub total_animals: usize,
    pub per_species: SpeciesCounts,
    pub distribution: Vec<CellCensus>,
}

impl DistributionSnapshot {
    pub fn capture(island: &Island, scenario_name: &str) -> Self {
        let per_species = island.num_animals_per_species();
        Self {
            scenario: scenario_name.to_string(),
            year: island.year(),
            written_at: Utc::now(),
            total_animals: per_species.total(),
            per_species,
            distribution: island.distribution(),
        }
    }
}

pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    /// Writes a snapshot when the island's year falls on the interval.
    pub fn maybe_write(&self, island: &Island, scenario_name: &str) -> Result<Option<PathBuf>> {
        if self.interval == 0 || island.year() == 0 || island.year() % self.interval != 0 {
            return Ok(None);
        }

        let dir = self.dir.join(scenario_name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;
        let path = dir.join(format!("year_{:06}.json", island.year()));
        let snapshot = DistributionSnapshot::capture(island, scenario_name);
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}
