// Domain layer - Generation mix, emissions factors and intensity profiles
pub mod emissions;
pub mod error;
pub mod generation;
pub mod granularity;
pub mod intensity;
pub mod profile;
pub mod utility;
