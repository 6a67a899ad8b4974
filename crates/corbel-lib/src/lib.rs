//! Corbel load-capacity audit library
//!
//! This crate provides the core functionality for:
//! - Loading the trained regression model and its scalers
//! - Predicting the ultimate load `Pu` of a reinforced-concrete corbel
//! - a/d ratio evaluation and short-corbel classification
//! - Narrative reports from a hosted language model
//! - Health checks and observability

pub mod audit;
pub mod classification;
pub mod health;
pub mod models;
pub mod narrative;
pub mod observability;
pub mod predictor;

pub use audit::{AuditError, AuditService};
pub use classification::GeometryAssessment;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AuditMetrics, StructuredLogger};
