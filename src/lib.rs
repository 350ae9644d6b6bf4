pub mod adapters;
pub mod api;
pub mod application;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use application::Application;
pub use config::AppConfig;
pub use crate::core::runner::{DemoOutcome, DemoRunner};
pub use utils::error::{Result, ShowcaseError};
