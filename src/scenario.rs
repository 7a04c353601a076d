use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    animal::Species,
    config::Overrides,
    error::ConfigError,
    island::{Island, Placement},
};

fn default_seed() -> u64 {
    123_456
}

fn default_snapshot_interval_years() -> u64 {
    10
}

const DEFAULT_YEARS: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub years: Option<u64>,
    #[serde(default = "default_snapshot_interval_years")]
    pub snapshot_interval_years: u64,
    /// Rectangular block of landscape letters.
    pub island: String,
    #[serde(default)]
    pub population: Vec<Placement>,
    /// Species name to parameter overrides.
    #[serde(default)]
    pub animal_parameters: BTreeMap<String, Overrides>,
    /// Landscape letter to parameter overrides.
    #[serde(default)]
    pub landscape_parameters: BTreeMap<String, Overrides>,
    #[serde(default)]
    pub later_population: Vec<ScheduledPopulation>,
}

/// Animals introduced once `year` years have completed.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledPopulation {
    pub year: u64,
    pub population: Vec<Placement>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// Builds the island with every parameter override applied, but without
    /// animals; seeding needs the run's random source.
    pub fn build_island(&self) -> Result<Island, ConfigError> {
        let mut island = Island::from_layout(&self.island)?;
        for (name, overrides) in &self.animal_parameters {
            let species = Species::from_name(name)
                .ok_or_else(|| ConfigError::UnknownSpecies(name.clone()))?;
            island.set_animal_parameters(species, overrides)?;
        }
        for (code, overrides) in &self.landscape_parameters {
            island.set_landscape_parameters(code, overrides)?;
        }
        Ok(island)
    }

    pub fn years(&self, override_years: Option<u64>) -> u64 {
        override_years.or(self.years).unwrap_or(DEFAULT_YEARS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
name: test_island
seed: 7
island: |
  OOOO
  OJSO
  OOOO
population:
  - loc: [1, 1]
    pop:
      - { species: Herbivore, age: 5, weight: 20 }
      - { species: Herbivore }
animal_parameters:
  Carnivore:
    F: 65.0
    DeltaPhiMax: 9.0
landscape_parameters:
  J:
    f_max: 700.0
later_population:
  - year: 5
    population:
      - loc: [1, 2]
        pop:
          - { species: Carnivore, age: 5, weight: 20 }
"#;

    #[test]
    fn parses_with_defaults() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.seed, 7);
        assert_eq!(scenario.snapshot_interval_years, 10);
        assert_eq!(scenario.years(None), 100);
        assert_eq!(scenario.years(Some(3)), 3);
        assert_eq!(scenario.population[0].loc, (1, 1));
        assert_eq!(scenario.population[0].pop[1].age, None);
        assert_eq!(scenario.later_population[0].year, 5);
    }

    #[test]
    fn build_island_applies_overrides() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        let island = scenario.build_island().unwrap();
        assert_eq!(island.parameters().animal(Species::Carnivore).appetite, 65.0);
        assert_eq!(island.cell((1, 1)).unwrap().fodder(), 700.0);
        assert_eq!(island.num_animals(), 0);
    }

    #[test]
    fn unknown_species_in_parameters_is_rejected() {
        let mut scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        scenario
            .animal_parameters
            .insert("Omnivore".into(), Overrides::new());
        assert_eq!(
            scenario.build_island().unwrap_err(),
            ConfigError::UnknownSpecies("Omnivore".into())
        );
    }
}
