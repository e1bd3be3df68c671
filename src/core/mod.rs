pub mod builder;
pub mod clock;
pub mod components;
pub mod connections;
pub mod display;
pub mod errors;
pub mod execution;
pub mod field;
pub mod parameters;
pub mod registry;
pub mod snapshot;
pub mod steady_state;
pub mod types;

#[cfg(test)]
mod tests;
