// Domain layer - Core business logic

pub mod errors;
pub mod geometry;
pub mod model;
pub mod rules;
