//! Preliminary wedding-plan generation.
//!
//! Turns an onboarding profile into a todo list, a budget and vendor
//! recommendations, and stores them as the user's initial plan.

pub mod budget;
pub mod context;
pub mod date;
pub mod generation;
pub mod persistence;
pub mod pipeline;
pub mod sanitize;
pub mod store;
pub mod todo;
pub mod upstream;
pub mod vendors;

pub use pipeline::{GenerateRequest, GenerationPipeline, PipelineError, PipelineSettings, PlanResult};
