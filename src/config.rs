//! Per-species and per-landscape parameter tables.
//!
//! Tables are replaced as a whole: an update builds a validated copy and only
//! swaps it in when every override was accepted.

use std::collections::BTreeMap;

use crate::animal::Species;
use crate::cell::Landscape;
use crate::error::ConfigError;

/// Named overrides, as read from a scenario file or passed by a caller.
pub type Overrides = BTreeMap<String, f64>;

#[derive(Clone, Debug, PartialEq)]
pub struct AnimalParams {
    pub w_birth: f64,
    pub sigma_birth: f64,
    pub beta: f64,
    pub eta: f64,
    pub a_half: f64,
    pub phi_age: f64,
    pub w_half: f64,
    pub phi_weight: f64,
    pub mu: f64,
    pub lambda: f64,
    pub gamma: f64,
    /// Fraction of the child's birth weight the mother loses.
    pub zeta: f64,
    /// The mother must weigh at least `xi` times the child to give birth.
    pub xi: f64,
    pub omega: f64,
    /// Appetite `F`.
    pub appetite: f64,
    /// Kill advantage `DeltaPhiMax`; only read for carnivores.
    pub delta_phi_max: f64,
    pub p_sick: f64,
    pub loss_rate: f64,
    pub(crate) revision: u64,
}

const SHARED_ANIMAL_PARAMS: [&str; 17] = [
    "w_birth",
    "sigma_birth",
    "beta",
    "eta",
    "a_half",
    "phi_age",
    "w_half",
    "phi_weight",
    "mu",
    "lambda",
    "gamma",
    "zeta",
    "xi",
    "omega",
    "F",
    "p_sick",
    "loss_rate",
];

impl AnimalParams {
    pub fn herbivore() -> Self {
        Self {
            w_birth: 8.0,
            sigma_birth: 1.5,
            beta: 0.9,
            eta: 0.05,
            a_half: 40.0,
            phi_age: 0.2,
            w_half: 10.0,
            phi_weight: 0.1,
            mu: 0.25,
            lambda: 1.0,
            gamma: 0.2,
            zeta: 1.2,
            xi: 3.5,
            omega: 0.4,
            appetite: 10.0,
            delta_phi_max: 0.0,
            p_sick: 0.0,
            loss_rate: 0.8,
            revision: 0,
        }
    }

    pub fn carnivore() -> Self {
        Self {
            w_birth: 6.0,
            sigma_birth: 1.0,
            beta: 0.75,
            eta: 0.125,
            a_half: 60.0,
            phi_age: 0.4,
            w_half: 4.0,
            phi_weight: 0.4,
            mu: 0.4,
            lambda: 1.0,
            gamma: 0.8,
            zeta: 1.1,
            xi: 3.5,
            omega: 0.9,
            appetite: 50.0,
            delta_phi_max: 10.0,
            p_sick: 0.0,
            loss_rate: 0.8,
            revision: 0,
        }
    }

    /// Bumped every time the table is replaced; animals key their fitness
    /// memo on it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn parameter_names(species: Species) -> Vec<&'static str> {
        let mut names = SHARED_ANIMAL_PARAMS.to_vec();
        if species == Species::Carnivore {
            names.push("DeltaPhiMax");
        }
        names
    }

    fn slot_mut(&mut self, species: Species, name: &str) -> Option<&mut f64> {
        let slot = match name {
            "w_birth" => &mut self.w_birth,
            "sigma_birth" => &mut self.sigma_birth,
            "beta" => &mut self.beta,
            "eta" => &mut self.eta,
            "a_half" => &mut self.a_half,
            "phi_age" => &mut self.phi_age,
            "w_half" => &mut self.w_half,
            "phi_weight" => &mut self.phi_weight,
            "mu" => &mut self.mu,
            "lambda" => &mut self.lambda,
            "gamma" => &mut self.gamma,
            "zeta" => &mut self.zeta,
            "xi" => &mut self.xi,
            "omega" => &mut self.omega,
            "F" => &mut self.appetite,
            "p_sick" => &mut self.p_sick,
            "loss_rate" => &mut self.loss_rate,
            "DeltaPhiMax" if species == Species::Carnivore => &mut self.delta_phi_max,
            _ => return None,
        };
        Some(slot)
    }

    /// Returns a copy with `overrides` applied, or the first rejected entry.
    pub fn with_overrides(&self, species: Species, overrides: &Overrides) -> Result<Self, ConfigError> {
        let target = species.to_string();
        let mut updated = self.clone();
        for (name, &value) in overrides {
            let slot = updated
                .slot_mut(species, name)
                .ok_or_else(|| ConfigError::UnknownParameter {
                    target: target.clone(),
                    name: name.clone(),
                })?;
            check_non_negative(&target, name, value)?;
            match name.as_str() {
                "eta" | "p_sick" if value > 1.0 => {
                    return Err(invalid(&target, name, value, "must not exceed 1"));
                }
                "DeltaPhiMax" if value <= 0.0 => {
                    return Err(invalid(&target, name, value, "must be strictly positive"));
                }
                _ => {}
            }
            *slot = value;
        }
        updated.revision = self.revision + 1;
        Ok(updated)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandscapeParams {
    pub f_max: f64,
    /// Savannah regrowth rate toward `f_max`.
    pub alpha: f64,
}

impl LandscapeParams {
    pub const BARREN: Self = Self {
        f_max: 0.0,
        alpha: 0.0,
    };

    pub fn savannah() -> Self {
        Self {
            f_max: 300.0,
            alpha: 0.3,
        }
    }

    pub fn jungle() -> Self {
        Self {
            f_max: 800.0,
            alpha: 0.0,
        }
    }

    pub fn parameter_names(landscape: Landscape) -> &'static [&'static str] {
        match landscape {
            Landscape::Savannah => &["f_max", "alpha"],
            Landscape::Jungle => &["f_max"],
            Landscape::Ocean | Landscape::Mountain | Landscape::Desert => &[],
        }
    }

    pub fn with_overrides(&self, landscape: Landscape, overrides: &Overrides) -> Result<Self, ConfigError> {
        let target = format!("{landscape:?}");
        let accepted = Self::parameter_names(landscape);
        let mut updated = *self;
        for (name, &value) in overrides {
            let slot = match name.as_str() {
                "f_max" if accepted.contains(&"f_max") => &mut updated.f_max,
                "alpha" if accepted.contains(&"alpha") => &mut updated.alpha,
                _ => {
                    return Err(ConfigError::UnknownParameter {
                        target,
                        name: name.clone(),
                    })
                }
            };
            check_non_negative(&target, name, value)?;
            if name == "alpha" && value > 1.0 {
                return Err(invalid(&target, name, value, "must not exceed 1"));
            }
            *slot = value;
        }
        Ok(updated)
    }
}

/// Every tunable constant of the model.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    herbivore: AnimalParams,
    carnivore: AnimalParams,
    savannah: LandscapeParams,
    jungle: LandscapeParams,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            herbivore: AnimalParams::herbivore(),
            carnivore: AnimalParams::carnivore(),
            savannah: LandscapeParams::savannah(),
            jungle: LandscapeParams::jungle(),
        }
    }
}

impl Parameters {
    pub fn animal(&self, species: Species) -> &AnimalParams {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
        }
    }

    pub fn landscape(&self, landscape: Landscape) -> LandscapeParams {
        match landscape {
            Landscape::Savannah => self.savannah,
            Landscape::Jungle => self.jungle,
            Landscape::Ocean | Landscape::Mountain | Landscape::Desert => LandscapeParams::BARREN,
        }
    }

    pub fn update_animal(&mut self, species: Species, overrides: &Overrides) -> Result<(), ConfigError> {
        let updated = self.animal(species).with_overrides(species, overrides)?;
        match species {
            Species::Herbivore => self.herbivore = updated,
            Species::Carnivore => self.carnivore = updated,
        }
        Ok(())
    }

    pub fn update_landscape(
        &mut self,
        landscape: Landscape,
        overrides: &Overrides,
    ) -> Result<(), ConfigError> {
        let updated = self.landscape(landscape).with_overrides(landscape, overrides)?;
        match landscape {
            Landscape::Savannah => self.savannah = updated,
            Landscape::Jungle => self.jungle = updated,
            Landscape::Ocean | Landscape::Mountain | Landscape::Desert => {}
        }
        Ok(())
    }
}

fn check_non_negative(target: &str, name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(target, name, value, "must be a non-negative number"));
    }
    Ok(())
}

fn invalid(target: &str, name: &str, value: f64, reason: &'static str) -> ConfigError {
    ConfigError::InvalidParameter {
        target: target.to_string(),
        name: name.to_string(),
        value,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(entries: &[(&str, f64)]) -> Overrides {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    #[test]
    fn animal_override_replaces_named_values() {
        let mut params = Parameters::default();
        params
            .update_animal(Species::Herbivore, &overrides(&[("xi", 1.8), ("F", 12.0)]))
            .unwrap();
        let herbivore = params.animal(Species::Herbivore);
        assert_eq!(herbivore.xi, 1.8);
        assert_eq!(herbivore.appetite, 12.0);
        assert_eq!(herbivore.revision(), 1);
        assert_eq!(params.animal(Species::Carnivore).revision(), 0);
    }

    #[test]
    fn unknown_name_applies_nothing() {
        let mut params = Parameters::default();
        let err = params
            .update_animal(Species::Carnivore, &overrides(&[("F", 65.0), ("wings", 2.0)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownParameter { ref name, .. } if name == "wings"));
        assert_eq!(params, Parameters::default());
    }

    #[test]
    fn every_listed_name_is_accepted() {
        for species in [Species::Herbivore, Species::Carnivore] {
            let names = AnimalParams::parameter_names(species);
            let all: Overrides = names.iter().map(|name| (name.to_string(), 0.5)).collect();
            let updated = Parameters::default()
                .animal(species)
                .with_overrides(species, &all)
                .unwrap();
            assert_eq!(updated.appetite, 0.5);
            assert_eq!(updated.delta_phi_max == 0.5, species == Species::Carnivore);
        }
    }

    #[test]
    fn negative_values_are_rejected() {
        let mut params = Parameters::default();
        let err = params
            .update_animal(Species::Herbivore, &overrides(&[("gamma", -0.1)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { .. }));
    }

    #[test]
    fn eta_must_not_exceed_one() {
        let mut params = Parameters::default();
        assert!(params
            .update_animal(Species::Herbivore, &overrides(&[("eta", 1.5)]))
            .is_err());
        assert!(params
            .update_animal(Species::Herbivore, &overrides(&[("eta", 1.0)]))
            .is_ok());
    }

    #[test]
    fn delta_phi_max_is_carnivore_only_and_positive() {
        let mut params = Parameters::default();
        assert!(matches!(
            params.update_animal(Species::Herbivore, &overrides(&[("DeltaPhiMax", 2.0)])),
            Err(ConfigError::UnknownParameter { .. })
        ));
        assert!(matches!(
            params.update_animal(Species::Carnivore, &overrides(&[("DeltaPhiMax", 0.0)])),
            Err(ConfigError::InvalidParameter { .. })
        ));
        params
            .update_animal(Species::Carnivore, &overrides(&[("DeltaPhiMax", 9.0)]))
            .unwrap();
        assert_eq!(params.animal(Species::Carnivore).delta_phi_max, 9.0);
    }

    #[test]
    fn landscape_overrides_follow_landscape_type() {
        let mut params = Parameters::default();
        params
            .update_landscape(Landscape::Jungle, &overrides(&[("f_max", 700.0)]))
            .unwrap();
        assert_eq!(params.landscape(Landscape::Jungle).f_max, 700.0);

        assert!(params
            .update_landscape(Landscape::Jungle, &overrides(&[("alpha", 0.5)]))
            .is_err());
        assert!(params
            .update_landscape(Landscape::Desert, &overrides(&[("f_max", 10.0)]))
            .is_err());
        assert!(params
            .update_landscape(Landscape::Savannah, &overrides(&[("alpha", 1.2)]))
            .is_err());
        assert_eq!(params.landscape(Landscape::Savannah), LandscapeParams::savannah());
    }
}
