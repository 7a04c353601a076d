//! Animal behavior model: fitness, feeding, birth, death and migration draws.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AnimalParams;
use crate::rng::{RngExt, SimRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Herbivore,
    Carnivore,
}

impl Species {
    /// Processing order inside a cell: herbivores before carnivores.
    pub const ALL: [Species; 2] = [Species::Herbivore, Species::Carnivore];

    pub fn name(self) -> &'static str {
        match self {
            Species::Herbivore => "Herbivore",
            Species::Carnivore => "Carnivore",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|species| species.name() == name)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug)]
pub struct Animal {
    species: Species,
    age: u32,
    weight: f64,
    newborn: bool,
    /// Memoized `(parameter revision, fitness)`.
    fitness: std::cell::Cell<Option<(u64, f64)>>,
}

impl Animal {
    pub fn new(species: Species, age: u32, weight: f64) -> Self {
        Self {
            species,
            age,
            weight: weight.max(0.0),
            newborn: false,
            fitness: std::cell::Cell::new(None),
        }
    }

    fn born(species: Species, weight: f64) -> Self {
        Self {
            newborn: true,
            ..Self::new(species, 0, weight)
        }
    }

    /// Draws a weight from the species birth-weight distribution.
    pub fn birth_weight(params: &AnimalParams, rng: &mut SimRng) -> f64 {
        rng.normal(params.w_birth, params.sigma_birth).max(0.0)
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Born during the current year; exempt from the rest of that year's cycle.
    pub fn is_newborn(&self) -> bool {
        self.newborn
    }

    pub fn fitness(&self, params: &AnimalParams) -> f64 {
        if let Some((revision, value)) = self.fitness.get() {
            if revision == params.revision() {
                return value;
            }
        }
        let value = fitness(self.age, self.weight, params);
        self.fitness.set(Some((params.revision(), value)));
        value
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight.max(0.0);
        self.fitness.set(None);
    }

    pub fn grow_older(&mut self) {
        self.age += 1;
        self.fitness.set(None);
    }

    pub fn lose_annual_weight(&mut self, params: &AnimalParams) {
        self.set_weight(self.weight - params.eta * self.weight);
    }

    /// Converts `eaten` food into body weight and returns the gain. A sick
    /// animal only keeps `loss_rate` of it.
    pub fn eat(&mut self, eaten: f64, params: &AnimalParams, rng: &mut SimRng) -> f64 {
        let mut gain = params.beta * eaten;
        if rng.chance(params.p_sick) {
            gain *= params.loss_rate;
        }
        self.set_weight(self.weight + gain);
        gain
    }

    pub fn dies(&self, params: &AnimalParams, rng: &mut SimRng) -> bool {
        let phi = self.fitness(params);
        if phi <= 0.0 {
            return true;
        }
        rng.chance(params.omega * (1.0 - phi))
    }

    /// One birth attempt given `same_species` residents in the cell, this
    /// animal included. Returns the newborn on success.
    pub fn give_birth(
        &mut self,
        same_species: usize,
        params: &AnimalParams,
        rng: &mut SimRng,
    ) -> Option<Animal> {
        if same_species < 2 {
            return None;
        }
        let probability = birth_probability(self.fitness(params), same_species, params.gamma);
        if !rng.chance(probability) {
            return None;
        }
        let child_weight = Self::birth_weight(params, rng);
        if child_weight <= 0.0 || self.weight < params.xi * child_weight {
            return None;
        }
        self.set_weight(self.weight - params.zeta * child_weight);
        Some(Animal::born(self.species, child_weight))
    }

    pub fn wants_to_migrate(&self, params: &AnimalParams, rng: &mut SimRng) -> bool {
        rng.chance(params.mu * self.fitness(params))
    }

    pub(crate) fn mature(&mut self) {
        self.newborn = false;
    }
}

fn q_plus(x: f64, x_half: f64, phi: f64) -> f64 {
    1.0 / (1.0 + (phi * (x - x_half)).exp())
}

fn q_minus(x: f64, x_half: f64, phi: f64) -> f64 {
    1.0 / (1.0 + (-phi * (x - x_half)).exp())
}

/// Φ = q⁺(age) · q⁻(weight), and 0 for a weightless animal.
pub fn fitness(age: u32, weight: f64, params: &AnimalParams) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let value = q_plus(age as f64, params.a_half, params.phi_age)
        * q_minus(weight, params.w_half, params.phi_weight);
    value.clamp(0.0, 1.0)
}

pub fn birth_probability(fitness: f64, same_species: usize, gamma: f64) -> f64 {
    if same_species < 2 {
        return 0.0;
    }
    (gamma * fitness * (same_species - 1) as f64).min(1.0)
}

pub fn kill_probability(carnivore_fitness: f64, herbivore_fitness: f64, delta_phi_max: f64) -> f64 {
    let advantage = carnivore_fitness - herbivore_fitness;
    if advantage <= 0.0 {
        0.0
    } else if advantage >= delta_phi_max {
        1.0
    } else {
        advantage / delta_phi_max
    }
}

/// ε = food / ((n + 1) · F); no food or no appetite gives 0.
pub fn relative_abundance(food: f64, same_species: usize, appetite: f64) -> f64 {
    if food <= 0.0 || appetite <= 0.0 {
        return 0.0;
    }
    food / ((same_species + 1) as f64 * appetite)
}

/// log π = λε. A `NaN` from `0 · ∞` counts as λ = 0.
pub fn log_propensity(lambda: f64, relative_abundance: f64) -> f64 {
    let value = lambda * relative_abundance;
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Turns per-destination `log π` values into sampling weights proportional to
/// `π = e^{λε}`. Impassable destinations (`None`) weigh 0. The largest
/// exponent is subtracted first so every weight stays finite; when some
/// exponents are infinite only those destinations are kept.
pub fn destination_weights(log_propensities: &[Option<f64>]) -> Vec<f64> {
    let max = log_propensities
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    log_propensities
        .iter()
        .map(|entry| match *entry {
            None => 0.0,
            Some(_) if max == f64::NEG_INFINITY => 0.0,
            Some(value) if max == f64::INFINITY => {
                if value == f64::INFINITY {
                    1.0
                } else {
                    0.0
                }
            }
            Some(value) => (value - max).exp(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn herbivore_params() -> AnimalParams {
        AnimalParams::herbivore()
    }

    #[test]
    fn fitness_is_half_squared_at_both_half_points() {
        let params = herbivore_params();
        let phi = fitness(params.a_half as u32, params.w_half, &params);
        assert!((phi - 0.25).abs() < 1e-12);
    }

    #[test]
    fn weightless_animal_has_zero_fitness() {
        let params = herbivore_params();
        assert_eq!(fitness(3, 0.0, &params), 0.0);
        assert_eq!(Animal::new(Species::Herbivore, 3, 0.0).fitness(&params), 0.0);
    }

    #[test]
    fn fitness_memo_tracks_weight_and_age_changes() {
        let params = herbivore_params();
        let mut rng = SimRng::new(1);
        let mut animal = Animal::new(Species::Herbivore, 5, 20.0);
        let before = animal.fitness(&params);

        animal.eat(10.0, &params, &mut rng);
        let fed = animal.fitness(&params);
        assert!(fed > before);
        assert_eq!(fed, fitness(5, animal.weight(), &params));

        animal.grow_older();
        assert_eq!(animal.age(), 6);
        assert_eq!(animal.fitness(&params), fitness(6, animal.weight(), &params));
    }

    #[test]
    fn fitness_memo_is_dropped_when_parameters_change() {
        let params = herbivore_params();
        let animal = Animal::new(Species::Herbivore, 5, 20.0);
        let before = animal.fitness(&params);

        let overrides = [("w_half".to_string(), 30.0)].into_iter().collect();
        let updated = params.with_overrides(Species::Herbivore, &overrides).unwrap();
        let after = animal.fitness(&updated);
        assert!(after < before);
    }

    #[test]
    fn feeding_gain_is_beta_times_eaten() {
        let params = herbivore_params();
        let mut rng = SimRng::new(1);
        let mut animal = Animal::new(Species::Herbivore, 0, 20.0);
        let gain = animal.eat(10.0, &params, &mut rng);
        assert_eq!(gain, params.beta * 10.0);
        assert_eq!(animal.weight(), 20.0 + params.beta * 10.0);
    }

    #[test]
    fn sick_animals_keep_only_loss_rate_of_the_gain() {
        let overrides = [("p_sick".to_string(), 1.0)].into_iter().collect();
        let params = herbivore_params()
            .with_overrides(Species::Herbivore, &overrides)
            .unwrap();
        let mut rng = SimRng::new(1);
        let mut animal = Animal::new(Species::Herbivore, 0, 20.0);
        let gain = animal.eat(10.0, &params, &mut rng);
        assert!((gain - params.beta * 10.0 * params.loss_rate).abs() < 1e-12);
    }

    #[test]
    fn annual_weight_loss_is_eta_fraction() {
        let params = herbivore_params();
        let mut animal = Animal::new(Species::Herbivore, 0, 20.0);
        animal.lose_annual_weight(&params);
        assert!((animal.weight() - 20.0 * (1.0 - params.eta)).abs() < 1e-12);
    }

    #[test]
    fn weightless_animal_always_dies() {
        let params = herbivore_params();
        let mut rng = SimRng::new(9);
        let animal = Animal::new(Species::Herbivore, 2, 0.0);
        assert!((0..50).all(|_| animal.dies(&params, &mut rng)));
    }

    #[test]
    fn zero_omega_means_no_death_for_living_animals() {
        let overrides = [("omega".to_string(), 0.0)].into_iter().collect();
        let params = herbivore_params()
            .with_overrides(Species::Herbivore, &overrides)
            .unwrap();
        let mut rng = SimRng::new(9);
        let animal = Animal::new(Species::Herbivore, 2, 15.0);
        assert!((0..50).all(|_| !animal.dies(&params, &mut rng)));
    }

    #[test]
    fn lone_animal_never_gives_birth() {
        let params = herbivore_params();
        let mut rng = SimRng::new(4);
        let mut animal = Animal::new(Species::Herbivore, 5, 60.0);
        assert!(animal.give_birth(1, &params, &mut rng).is_none());
        assert_eq!(animal.weight(), 60.0);
    }

    #[test]
    fn successful_birth_costs_zeta_times_child_weight() {
        let overrides = [("gamma".to_string(), 100.0)].into_iter().collect();
        let params = herbivore_params()
            .with_overrides(Species::Herbivore, &overrides)
            .unwrap();
        let mut rng = SimRng::new(4);
        let mut mother = Animal::new(Species::Herbivore, 5, 60.0);
        let child = mother
            .give_birth(10, &params, &mut rng)
            .expect("birth probability is 1");
        assert!(child.is_newborn());
        assert_eq!(child.age(), 0);
        assert_eq!(child.species(), Species::Herbivore);
        let expected = 60.0 - params.zeta * child.weight();
        assert!((mother.weight() - expected).abs() < 1e-9);
    }

    #[test]
    fn light_mother_vetoes_the_birth() {
        let overrides = [("gamma".to_string(), 100.0), ("sigma_birth".to_string(), 0.0)]
            .into_iter()
            .collect();
        let params = herbivore_params()
            .with_overrides(Species::Herbivore, &overrides)
            .unwrap();
        let mut rng = SimRng::new(4);
        let light = params.xi * params.w_birth - 0.1;
        let mut mother = Animal::new(Species::Herbivore, 5, light);
        assert!(mother.give_birth(10, &params, &mut rng).is_none());
        assert_eq!(mother.weight(), light);
    }

    #[test]
    fn kill_probability_ramps_with_advantage() {
        assert_eq!(kill_probability(0.3, 0.5, 10.0), 0.0);
        assert_eq!(kill_probability(0.5, 0.5, 10.0), 0.0);
        assert!((kill_probability(0.9, 0.4, 10.0) - 0.05).abs() < 1e-12);
        assert_eq!(kill_probability(0.9, 0.1, 0.5), 1.0);
    }

    #[test]
    fn relative_abundance_handles_empty_food() {
        assert_eq!(relative_abundance(0.0, 3, 10.0), 0.0);
        assert_eq!(relative_abundance(100.0, 4, 10.0), 2.0);
        assert_eq!(log_propensity(1.0, 0.0), 0.0);
        assert_eq!(log_propensity(0.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn destination_weights_keep_ratios_and_stay_finite() {
        let weights = destination_weights(&[None, Some(1.0), Some(2.0)]);
        assert_eq!(weights[0], 0.0);
        assert!((weights[1] / weights[2] - (-1.0f64).exp()).abs() < 1e-12);

        let heavy = destination_weights(&[Some(20_000.0), Some(5.0), None]);
        assert!(heavy.iter().all(|w| w.is_finite()));
        assert_eq!(heavy[0], 1.0);
        assert_eq!(heavy[1], 0.0);

        let unbounded = destination_weights(&[Some(f64::INFINITY), Some(3.0)]);
        assert_eq!(unbounded, vec![1.0, 0.0]);

        assert_eq!(destination_weights(&[None, None]), vec![0.0, 0.0]);
    }

    #[test]
    fn species_names_round_trip() {
        for species in Species::ALL {
            assert_eq!(Species::from_name(species.name()), Some(species));
        }
        assert_eq!(Species::from_name("Omnivore"), None);
    }

    proptest! {
        #[test]
        fn proptest_fitness_stays_in_unit_interval(
            age in 0u32..500,
            weight in -50.0f64..500.0,
            a_half in 0.0f64..100.0,
            phi_age in 0.0f64..5.0,
            w_half in 0.0f64..100.0,
            phi_weight in 0.0f64..5.0,
        ) {
            let params = AnimalParams {
                a_half,
                phi_age,
                w_half,
                phi_weight,
                ..AnimalParams::herbivore()
            };
            let phi = fitness(age, weight, &params);
            prop_assert!((0.0..=1.0).contains(&phi));
            if weight <= 0.0 {
                prop_assert_eq!(phi, 0.0);
            }
        }
    }
}
