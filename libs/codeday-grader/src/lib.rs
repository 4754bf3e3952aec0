pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod normalizer;


pub use engine::{ExecutionOutput, LocalEngine};
pub use error::{ExecutionFailure, GradeError};
pub use executor::{submit, GradeReport, Grader};
pub use normalizer::normalize;
