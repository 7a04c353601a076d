//! Landscape cells and the single-cell part of the annual cycle.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::animal::{kill_probability, Animal, Species};
use crate::config::{AnimalParams, Parameters};
use crate::rng::{RngExt, SimRng};

/// `(row, col)`, zero-based from the top-left corner of the layout.
pub type Coord = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Landscape {
    Ocean,
    Mountain,
    Desert,
    Savannah,
    Jungle,
}

impl Landscape {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'O' => Some(Landscape::Ocean),
            'M' => Some(Landscape::Mountain),
            'D' => Some(Landscape::Desert),
            'S' => Some(Landscape::Savannah),
            'J' => Some(Landscape::Jungle),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Landscape::Ocean => 'O',
            Landscape::Mountain => 'M',
            Landscape::Desert => 'D',
            Landscape::Savannah => 'S',
            Landscape::Jungle => 'J',
        }
    }

    /// Ocean and Mountain never hold animals.
    pub fn is_passable(self) -> bool {
        !matches!(self, Landscape::Ocean | Landscape::Mountain)
    }
}

#[derive(Clone, Debug)]
pub struct Cell {
    landscape: Landscape,
    coord: Coord,
    fodder: f64,
    herbivores: Vec<Animal>,
    carnivores: Vec<Animal>,
}

impl Cell {
    pub fn new(landscape: Landscape, coord: Coord, params: &Parameters) -> Self {
        Self {
            landscape,
            coord,
            fodder: params.landscape(landscape).f_max,
            herbivores: Vec::new(),
            carnivores: Vec::new(),
        }
    }

    pub fn landscape(&self) -> Landscape {
        self.landscape
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    pub fn fodder(&self) -> f64 {
        self.fodder
    }

    pub fn is_habitable(&self) -> bool {
        self.landscape.is_passable()
    }

    pub fn residents(&self, species: Species) -> &[Animal] {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Carnivore => &self.carnivores,
        }
    }

    pub(crate) fn residents_mut(&mut self, species: Species) -> &mut Vec<Animal> {
        match species {
            Species::Herbivore => &mut self.herbivores,
            Species::Carnivore => &mut self.carnivores,
        }
    }

    pub fn count(&self, species: Species) -> usize {
        self.residents(species).len()
    }

    pub fn total_animals(&self) -> usize {
        self.herbivores.len() + self.carnivores.len()
    }

    pub fn herbivore_biomass(&self) -> f64 {
        self.herbivores.iter().map(Animal::weight).sum()
    }

    pub(crate) fn insert(&mut self, animal: Animal) {
        debug_assert!(self.is_habitable(), "animal placed on {:?}", self.landscape);
        self.residents_mut(animal.species()).push(animal);
    }

    pub(crate) fn cap_fodder(&mut self, f_max: f64) {
        self.fodder = self.fodder.min(f_max);
    }

    pub fn regrow_fodder(&mut self, params: &Parameters) {
        let landscape = params.landscape(self.landscape);
        let grown = match self.landscape {
            Landscape::Jungle => landscape.f_max,
            Landscape::Savannah => self.fodder + landscape.alpha * (landscape.f_max - self.fodder),
            Landscape::Ocean | Landscape::Mountain | Landscape::Desert => 0.0,
        };
        self.fodder = grown.clamp(0.0, landscape.f_max);
    }

    /// Herbivores graze in shuffled order, then carnivores hunt in shuffled
    /// order. Returns the number of herbivores killed.
    pub fn feed(&mut self, params: &Parameters, rng: &mut SimRng) -> usize {
        self.graze(params.animal(Species::Herbivore), rng);
        self.hunt(params, rng)
    }

    fn graze(&mut self, params: &AnimalParams, rng: &mut SimRng) {
        self.herbivores.shuffle(rng);
        for herbivore in self.herbivores.iter_mut() {
            if self.fodder <= 0.0 {
                break;
            }
            let eaten = params.appetite.min(self.fodder);
            self.fodder -= eaten;
            herbivore.eat(eaten, params, rng);
        }
    }

    fn hunt(&mut self, params: &Parameters, rng: &mut SimRng) -> usize {
        let prey_params = params.animal(Species::Herbivore);
        let hunter_params = params.animal(Species::Carnivore);

        self.carnivores.shuffle(rng);
        if self.herbivores.is_empty() {
            return 0;
        }
        self.herbivores
            .sort_by(|a, b| a.fitness(prey_params).total_cmp(&b.fitness(prey_params)));

        let mut kills = 0;
        for carnivore in self.carnivores.iter_mut() {
            if self.herbivores.is_empty() {
                break;
            }
            let mut eaten = 0.0;
            let mut survivors = Vec::with_capacity(self.herbivores.len());
            for prey in self.herbivores.drain(..) {
                if eaten >= hunter_params.appetite {
                    survivors.push(prey);
                    continue;
                }
                let probability = kill_probability(
                    carnivore.fitness(hunter_params),
                    prey.fitness(prey_params),
                    hunter_params.delta_phi_max,
                );
                if rng.chance(probability) {
                    let meal = (hunter_params.appetite - eaten).min(prey.weight());
                    eaten += meal;
                    carnivore.eat(meal, hunter_params, rng);
                    kills += 1;
                } else {
                    survivors.push(prey);
                }
            }
            self.herbivores = survivors;
        }
        kills
    }

    /// Every resident present at the start of the phase gets one birth
    /// attempt; newborns are appended afterwards. Returns the number of births.
    pub fn procreate(&mut self, params: &Parameters, rng: &mut SimRng) -> usize {
        let mut births = 0;
        for species in Species::ALL {
            let species_params = params.animal(species);
            let residents = self.residents_mut(species);
            let same_species = residents.len();
            let newborns: Vec<Animal> = residents
                .iter_mut()
                .filter_map(|parent| parent.give_birth(same_species, species_params, rng))
                .collect();
            births += newborns.len();
            residents.extend(newborns);
        }
        births
    }

    /// Drops animals whose weight reached zero. Returns how many were removed.
    pub fn remove_weightless(&mut self) -> usize {
        let before = self.total_animals();
        self.herbivores.retain(|a| a.weight() > 0.0);
        self.carnivores.retain(|a| a.weight() > 0.0);
        before - self.total_animals()
    }

    pub fn age_residents(&mut self) {
        for animal in self.established_mut() {
            animal.grow_older();
        }
    }

    pub fn lose_weight(&mut self, params: &Parameters) {
        for animal in self.established_mut() {
            animal.lose_annual_weight(params.animal(animal.species()));
        }
    }

    /// Runs the death draw for every established resident. Returns the number
    /// of deaths.
    pub fn cull(&mut self, params: &Parameters, rng: &mut SimRng) -> usize {
        let before = self.total_animals();
        for species in Species::ALL {
            let species_params = params.animal(species);
            self.residents_mut(species)
                .retain(|animal| animal.is_newborn() || !animal.dies(species_params, rng));
        }
        before - self.total_animals()
    }

    pub(crate) fn end_year(&mut self) {
        for animal in self.herbivores.iter_mut().chain(self.carnivores.iter_mut()) {
            animal.mature();
        }
    }

    fn established_mut(&mut self) -> impl Iterator<Item = &mut Animal> {
        self.herbivores
            .iter_mut()
            .chain(self.carnivores.iter_mut())
            .filter(|animal| !animal.is_newborn())
    }
}
