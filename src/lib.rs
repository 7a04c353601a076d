pub mod animal;
pub mod cell;
pub mod config;
pub mod engine;
pub mod error;
pub mod island;
pub mod rng;
pub mod scenario;
pub mod snapshot;

pub use animal::{Animal, Species};
pub use cell::{Cell, Coord, Landscape};
pub use config::{AnimalParams, LandscapeParams, Overrides, Parameters};
pub use engine::{Engine, EngineSettings};
pub use error::{BiosimError, ConfigError, PlacementError};
pub use island::{CycleReport, Island, Placement};
pub use rng::SimRng;
pub use scenario::{Scenario, ScenarioLoader};
