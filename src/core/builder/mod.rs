pub mod lab_builder;

pub use lab_builder::LabBuilder;
