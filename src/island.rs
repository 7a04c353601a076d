//! The island grid: layout parsing, seeding, migration and the annual cycle.

use std::time::Instant;

use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::animal::{destination_weights, log_propensity, relative_abundance, Animal, Species};
use crate::cell::{Cell, Coord, Landscape};
use crate::config::{AnimalParams, Overrides, Parameters};
use crate::error::{ConfigError, PlacementError};
use crate::rng::SimRng;

/// Animals to place on one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub loc: Coord,
    pub pop: Vec<AnimalSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalSpec {
    pub species: String,
    #[serde(default)]
    pub age: Option<u32>,
    /// Drawn from the birth-weight distribution when omitted.
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Regrowth,
    Feeding,
    Procreation,
    Aging,
    WeightLoss,
    Death,
    Migration,
}

impl Phase {
    pub const ORDER: [Phase; 7] = [
        Phase::Regrowth,
        Phase::Feeding,
        Phase::Procreation,
        Phase::Aging,
        Phase::WeightLoss,
        Phase::Death,
        Phase::Migration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Regrowth => "regrowth",
            Phase::Feeding => "feeding",
            Phase::Procreation => "procreation",
            Phase::Aging => "aging",
            Phase::WeightLoss => "weight_loss",
            Phase::Death => "death",
            Phase::Migration => "migration",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PhaseTiming {
    pub phase: &'static str,
    pub duration_ms: f64,
}

/// What happened during one simulated year.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CycleReport {
    pub year: u64,
    pub births: usize,
    /// Death draws plus animals that reached zero weight.
    pub deaths: usize,
    pub kills: usize,
    pub migrations: usize,
    pub phase_timings: Vec<PhaseTiming>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCounts {
    pub herbivores: usize,
    pub carnivores: usize,
}

impl SpeciesCounts {
    pub fn get(&self, species: Species) -> usize {
        match species {
            Species::Herbivore => self.herbivores,
            Species::Carnivore => self.carnivores,
        }
    }

    pub fn total(&self) -> usize {
        self.herbivores + self.carnivores
    }
}

/// One row of the animal distribution table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellCensus {
    pub row: usize,
    pub col: usize,
    pub landscape: Landscape,
    pub herbivores: usize,
    pub carnivores: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimalCensus {
    pub row: usize,
    pub col: usize,
    pub species: Species,
    pub age: u32,
    pub weight: f64,
    pub fitness: f64,
}

/// Neighbor state frozen at the start of migration.
#[derive(Clone, Copy, Debug)]
struct Forage {
    passable: bool,
    fodder: f64,
    herbivores: usize,
    herbivore_biomass: f64,
    carnivores: usize,
}

impl Forage {
    fn of(cell: &Cell) -> Self {
        Self {
            passable: cell.is_habitable(),
            fodder: cell.fodder(),
            herbivores: cell.count(Species::Herbivore),
            herbivore_biomass: cell.herbivore_biomass(),
            carnivores: cell.count(Species::Carnivore),
        }
    }

    /// `λε` for a passable cell, `None` for Ocean and Mountain.
    fn log_propensity(&self, species: Species, params: &AnimalParams) -> Option<f64> {
        if !self.passable {
            return None;
        }
        let (food, same_species) = match species {
            Species::Herbivore => (self.fodder, self.herbivores),
            Species::Carnivore => (self.herbivore_biomass, self.carnivores),
        };
        Some(log_propensity(
            params.lambda,
            relative_abundance(food, same_species, params.appetite),
        ))
    }
}

#[derive(Clone, Debug)]
pub struct Island {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    params: Parameters,
    year: u64,
}

impl Island {
    pub fn from_layout(layout: &str) -> Result<Self, ConfigError> {
        Self::with_parameters(layout, Parameters::default())
    }

    pub fn with_parameters(layout: &str, params: Parameters) -> Result<Self, ConfigError> {
        let grid = parse_layout(layout)?;
        let rows = grid.len();
        let cols = grid[0].len();

        let mut cells = Vec::with_capacity(rows * cols);
        for (row, letters) in grid.iter().enumerate() {
            for (col, &landscape) in letters.iter().enumerate() {
                let on_border = row == 0 || col == 0 || row == rows - 1 || col == cols - 1;
                if on_border && landscape != Landscape::Ocean {
                    return Err(ConfigError::NonOceanBorder {
                        row,
                        col,
                        found: landscape,
                    });
                }
                cells.push(Cell::new(landscape, (row, col), &params));
            }
        }

        Ok(Self {
            rows,
            cols,
            cells,
            params,
            year: 0,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of completed years.
    pub fn year(&self) -> u64 {
        self.year
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.index_of(coord).map(|index| &self.cells[index])
    }

    fn index_of(&self, (row, col): Coord) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    /// Orthogonal neighbors in up, down, left, right order, clipped at the
    /// grid edge.
    pub fn neighbors(&self, (row, col): Coord) -> Vec<Coord> {
        let mut out = Vec::with_capacity(4);
        if row > 0 {
            out.push((row - 1, col));
        }
        if row + 1 < self.rows {
            out.push((row + 1, col));
        }
        if col > 0 {
            out.push((row, col - 1));
        }
        if col + 1 < self.cols {
            out.push((row, col + 1));
        }
        out
    }

    pub fn set_animal_parameters(
        &mut self,
        species: Species,
        overrides: &Overrides,
    ) -> Result<(), ConfigError> {
        self.params.update_animal(species, overrides)
    }

    /// Updates the table for landscape letter `code`. Fodder above a lowered
    /// `f_max` is cut back at once.
    pub fn set_landscape_parameters(
        &mut self,
        code: &str,
        overrides: &Overrides,
    ) -> Result<(), ConfigError> {
        let landscape = parse_landscape_code(code)?;
        self.params.update_landscape(landscape, overrides)?;
        let f_max = self.params.landscape(landscape).f_max;
        for cell in self.cells.iter_mut().filter(|c| c.landscape() == landscape) {
            cell.cap_fodder(f_max);
        }
        Ok(())
    }

    /// Places animals on the island. Every placement is checked before any
    /// animal is inserted. An animal without a weight gets a birth-weight
    /// draw and, like a vetoed birth, is skipped when the draw is 0.
    /// Returns the number of animals added.
    pub fn populate(
        &mut self,
        placements: &[Placement],
        rng: &mut SimRng,
    ) -> Result<usize, PlacementError> {
        let mut staged = Vec::new();
        for placement in placements {
            let (row, col) = placement.loc;
            let index = self
                .index_of(placement.loc)
                .ok_or(PlacementError::OutOfBounds { row, col })?;
            let cell = &self.cells[index];
            if !cell.is_habitable() {
                return Err(PlacementError::Uninhabitable {
                    row,
                    col,
                    landscape: cell.landscape(),
                });
            }
            for spec in &placement.pop {
                let species = Species::from_name(&spec.species)
                    .ok_or_else(|| PlacementError::UnknownSpecies(spec.species.clone()))?;
                if let Some(weight) = spec.weight {
                    if !weight.is_finite() || weight <= 0.0 {
                        return Err(PlacementError::InvalidWeight {
                            species: spec.species.clone(),
                            weight,
                            row,
                            col,
                        });
                    }
                }
                staged.push((index, species, spec.age.unwrap_or(0), spec.weight));
            }
        }

        let mut added = 0;
        for (index, species, age, weight) in staged {
            let weight =
                weight.unwrap_or_else(|| Animal::birth_weight(self.params.animal(species), rng));
            if weight <= 0.0 {
                continue;
            }
            self.cells[index].insert(Animal::new(species, age, weight));
            added += 1;
        }
        Ok(added)
    }

    /// Runs one simulated year over the whole grid.
    pub fn cycle(&mut self, rng: &mut SimRng) -> CycleReport {
        let mut report = CycleReport {
            year: self.year + 1,
            ..CycleReport::default()
        };
        for phase in Phase::ORDER {
            let start = Instant::now();
            let affected = self.run_phase(phase, rng, &mut report);
            let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;
            debug!(
                year = report.year,
                phase = phase.name(),
                affected,
                duration_ms,
                "phase complete"
            );
            report.phase_timings.push(PhaseTiming {
                phase: phase.name(),
                duration_ms,
            });
        }
        for cell in &mut self.cells {
            cell.end_year();
        }
        self.year += 1;
        report
    }

    fn run_phase(&mut self, phase: Phase, rng: &mut SimRng, report: &mut CycleReport) -> usize {
        let params = &self.params;
        match phase {
            Phase::Regrowth => {
                for cell in &mut self.cells {
                    cell.regrow_fodder(params);
                }
                0
            }
            Phase::Feeding => {
                let kills: usize = self.cells.iter_mut().map(|c| c.feed(params, rng)).sum();
                report.kills += kills;
                kills
            }
            Phase::Procreation => {
                let births: usize = self
                    .cells
                    .iter_mut()
                    .map(|c| c.procreate(params, rng))
                    .sum();
                let starved: usize = self.cells.iter_mut().map(Cell::remove_weightless).sum();
                report.births += births;
                report.deaths += starved;
                births
            }
            Phase::Aging => {
                for cell in &mut self.cells {
                    cell.age_residents();
                }
                0
            }
            Phase::WeightLoss => {
                for cell in &mut self.cells {
                    cell.lose_weight(params);
                }
                0
            }
            Phase::Death => {
                let deaths: usize = self.cells.iter_mut().map(|c| c.cull(params, rng)).sum();
                report.deaths += deaths;
                deaths
            }
            Phase::Migration => {
                let moved = self.migrate(rng);
                report.migrations += moved;
                moved
            }
        }
    }

    /// Moves animals to neighboring cells. Destinations are weighed against
    /// the grid as it stood before anyone moved, and arrivals are appended
    /// only after the whole pass. Returns the number of animals moved.
    fn migrate(&mut self, rng: &mut SimRng) -> usize {
        let forage: Vec<Forage> = self.cells.iter().map(Forage::of).collect();
        let mut arrivals: Vec<(usize, Animal)> = Vec::new();

        for index in 0..self.cells.len() {
            if self.cells[index].total_animals() == 0 {
                continue;
            }
            let destinations: Vec<usize> = self
                .neighbors(self.cells[index].coord())
                .into_iter()
                .filter_map(|coord| self.index_of(coord))
                .collect();

            for species in Species::ALL {
                let params = self.params.animal(species);
                let log_propensities: Vec<Option<f64>> = destinations
                    .iter()
                    .map(|&dest| forage[dest].log_propensity(species, params))
                    .collect();
                let chooser = WeightedIndex::new(destination_weights(&log_propensities)).ok();

                let residents = std::mem::take(self.cells[index].residents_mut(species));
                let mut stayers = Vec::with_capacity(residents.len());
                for animal in residents {
                    if animal.is_newborn() || !animal.wants_to_migrate(params, rng) {
                        stayers.push(animal);
                        continue;
                    }
                    match &chooser {
                        Some(dist) => arrivals.push((destinations[dist.sample(rng)], animal)),
                        None => stayers.push(animal),
                    }
                }
                *self.cells[index].residents_mut(species) = stayers;
            }
        }

        let moved = arrivals.len();
        for (dest, animal) in arrivals {
            self.cells[dest].insert(animal);
        }
        moved
    }

    pub fn num_animals(&self) -> usize {
        self.cells.iter().map(Cell::total_animals).sum()
    }

    pub fn num_animals_per_species(&self) -> SpeciesCounts {
        self.cells
            .iter()
            .fold(SpeciesCounts::default(), |mut counts, cell| {
                counts.herbivores += cell.count(Species::Herbivore);
                counts.carnivores += cell.count(Species::Carnivore);
                counts
            })
    }

    /// Per-cell animal counts in row-major order.
    pub fn distribution(&self) -> Vec<CellCensus> {
        self.cells
            .iter()
            .map(|cell| {
                let (row, col) = cell.coord();
                CellCensus {
                    row,
                    col,
                    landscape: cell.landscape(),
                    herbivores: cell.count(Species::Herbivore),
                    carnivores: cell.count(Species::Carnivore),
                }
            })
            .collect()
    }

    pub fn census(&self, species: Species) -> Vec<AnimalCensus> {
        let params = self.params.animal(species);
        self.cells
            .iter()
            .flat_map(|cell| {
                let (row, col) = cell.coord();
                cell.residents(species).iter().map(move |animal| AnimalCensus {
                    row,
                    col,
                    species,
                    age: animal.age(),
                    weight: animal.weight(),
                    fitness: animal.fitness(params),
                })
            })
            .collect()
    }
}

fn parse_layout(layout: &str) -> Result<Vec<Vec<Landscape>>, ConfigError> {
    let layout = layout.trim();
    if layout.is_empty() {
        return Err(ConfigError::EmptyLayout);
    }

    let mut grid: Vec<Vec<Landscape>> = Vec::new();
    for (row, line) in layout.lines().map(str::trim).enumerate() {
        let letters = line
            .chars()
            .enumerate()
            .map(|(col, letter)| {
                Landscape::from_code(letter)
                    .ok_or(ConfigError::UnknownLandscape { letter, row, col })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(first) = grid.first() {
            if letters.len() != first.len() {
                return Err(ConfigError::RaggedLayout {
                    row,
                    expected: first.len(),
                    found: letters.len(),
                });
            }
        }
        grid.push(letters);
    }
    Ok(grid)
}

fn parse_landscape_code(code: &str) -> Result<Landscape, ConfigError> {
    let mut chars = code.trim().chars();
    let landscape = match (chars.next(), chars.next()) {
        (Some(letter), None) => Landscape::from_code(letter),
        _ => None,
    };
    landscape.ok_or_else(|| ConfigError::UnknownLandscapeCode(code.to_string()))
}
