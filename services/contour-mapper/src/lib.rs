//! Station contour mapper service.
//!
//! Loads field configuration and the study-area boundary once, then on each
//! tick queries the online stations and runs every configured field through
//! the contour pipeline, persisting one document per field and time bucket.

pub mod config;
pub mod scheduler;

pub use config::{MapperConfig, SettingsOverrides};
pub use scheduler::{FieldResult, RunReport, Scheduler};
