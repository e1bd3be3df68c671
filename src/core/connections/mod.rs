pub mod dependency_validator;

pub use dependency_validator::DependencyValidator;
