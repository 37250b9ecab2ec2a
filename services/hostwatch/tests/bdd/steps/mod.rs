//! BDD step definitions for hostwatch service

pub mod grace_period_steps;
pub mod persistence_steps;
pub mod scheduler_steps;
