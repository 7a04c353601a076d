use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    animal::Species,
    config::Overrides,
    error::{BiosimError, ConfigError},
    island::{AnimalCensus, CellCensus, CycleReport, Island, Placement, SpeciesCounts},
    rng::SimRng,
    scenario::Scenario,
    snapshot::SnapshotWriter,
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_years: u64,
    pub snapshot_dir: PathBuf,
}

/// Owns the island and the random source and advances them year by year.
pub struct Engine {
    island: Island,
    rng: SimRng,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
    /// Pending `(after_year, placements)`, in scheduling order.
    scheduled: Vec<(u64, Vec<Placement>)>,
}

impl Engine {
    pub fn new(island: Island, settings: EngineSettings) -> Self {
        Self {
            island,
            rng: SimRng::new(settings.seed),
            snapshot_writer: SnapshotWriter::new(
                &settings.snapshot_dir,
                settings.snapshot_interval_years,
            ),
            settings,
            scheduled: Vec::new(),
        }
    }

    /// Builds the island, seeds the initial population and queues the later
    /// ones.
    pub fn from_scenario(scenario: &Scenario, settings: EngineSettings) -> Result<Self> {
        let island = scenario
            .build_island()
            .with_context(|| format!("Invalid island in scenario '{}'", scenario.name))?;
        let mut engine = Self::new(island, settings);
        engine
            .add_population(&scenario.population)
            .with_context(|| format!("Invalid population in scenario '{}'", scenario.name))?;
        for later in &scenario.later_population {
            engine.schedule_population(later.year, later.population.clone());
        }
        Ok(engine)
    }

    pub fn add_population(&mut self, placements: &[Placement]) -> Result<usize, BiosimError> {
        Ok(self.island.populate(placements, &mut self.rng)?)
    }

    /// Queues `placements` to be added once `after_year` years have completed.
    pub fn schedule_population(&mut self, after_year: u64, placements: Vec<Placement>) {
        self.scheduled.push((after_year, placements));
    }

    pub fn set_animal_parameters(
        &mut self,
        species: &str,
        overrides: &Overrides,
    ) -> Result<(), ConfigError> {
        let species = Species::from_name(species)
            .ok_or_else(|| ConfigError::UnknownSpecies(species.to_string()))?;
        self.island.set_animal_parameters(species, overrides)
    }

    pub fn set_landscape_parameters(
        &mut self,
        code: &str,
        overrides: &Overrides,
    ) -> Result<(), ConfigError> {
        self.island.set_landscape_parameters(code, overrides)
    }

    /// Simulates one year.
    pub fn step(&mut self) -> Result<CycleReport> {
        self.introduce_due_population()?;
        let report = self.island.cycle(&mut self.rng);
        let counts = self.island.num_animals_per_species();
        info!(
            year = report.year,
            herbivores = counts.herbivores,
            carnivores = counts.carnivores,
            births = report.births,
            deaths = report.deaths,
            kills = report.kills,
            migrations = report.migrations,
            "year complete"
        );
        if let Some(path) = self
            .snapshot_writer
            .maybe_write(&self.island, &self.settings.scenario_name)?
        {
            info!(path = %path.display(), "snapshot written");
        }
        Ok(report)
    }

    pub fn run(&mut self, years: u64) -> Result<()> {
        self.run_with_hook(years, |_| {})
    }

    pub fn run_with_hook<F>(&mut self, years: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&CycleReport),
    {
        for _ in 0..years {
            let report = self.step()?;
            hook(&report);
        }
        Ok(())
    }

    fn introduce_due_population(&mut self) -> Result<()> {
        let year = self.island.year();
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|(after_year, _)| *after_year <= year);
        self.scheduled = pending;
        for (after_year, placements) in due {
            let added = self
                .island
                .populate(&placements, &mut self.rng)
                .with_context(|| format!("Invalid population scheduled for year {after_year}"))?;
            info!(year, added, "population introduced");
        }
        Ok(())
    }

    pub fn island(&self) -> &Island {
        &self.island
    }

    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    pub fn year(&self) -> u64 {
        self.island.year()
    }

    pub fn num_animals(&self) -> usize {
        self.island.num_animals()
    }

    pub fn num_animals_per_species(&self) -> SpeciesCounts {
        self.island.num_animals_per_species()
    }

    pub fn distribution(&self) -> Vec<CellCensus> {
        self.island.distribution()
    }

    pub fn census(&self, species: Species) -> Vec<AnimalCensus> {
        self.island.census(species)
    }
}
