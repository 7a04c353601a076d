//! Error types for island construction, parameter updates and seeding.
//!
//! Stochastic outcomes (a failed birth, kill or migration attempt) are regular
//! branches of the model and never surface here.

use thiserror::Error;

use crate::cell::Landscape;

/// Rejected layouts and parameter updates. Nothing is applied when returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("island layout is empty")]
    EmptyLayout,

    #[error("island layout row {row} has {found} cells, expected {expected}")]
    RaggedLayout {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown landscape letter '{letter}' at ({row}, {col})")]
    UnknownLandscape { letter: char, row: usize, col: usize },

    #[error("border cell ({row}, {col}) is {found:?}, the island must be surrounded by ocean")]
    NonOceanBorder {
        row: usize,
        col: usize,
        found: Landscape,
    },

    #[error("unknown species '{0}'")]
    UnknownSpecies(String),

    #[error("unknown landscape code '{0}'")]
    UnknownLandscapeCode(String),

    #[error("'{name}' is not a parameter of {target}")]
    UnknownParameter { target: String, name: String },

    #[error("invalid value {value} for {target} parameter '{name}': {reason}")]
    InvalidParameter {
        target: String,
        name: String,
        value: f64,
        reason: &'static str,
    },
}

/// Rejected population seeding. The island is left untouched when returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("location ({row}, {col}) is outside the island")]
    OutOfBounds { row: usize, col: usize },

    #[error("location ({row}, {col}) is {landscape:?} and cannot hold animals")]
    Uninhabitable {
        row: usize,
        col: usize,
        landscape: Landscape,
    },

    #[error("unknown species '{0}'")]
    UnknownSpecies(String),

    #[error("invalid weight {weight} for a {species} at ({row}, {col})")]
    InvalidWeight {
        species: String,
        weight: f64,
        row: usize,
        col: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BiosimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Placement(#[from] PlacementError),
}
