//! Perpustakaan lending tracker
//!
//! REST JSON API for a school lending service: a catalog of items with
//! stock, loans with due dates and late fees, staff verification of loans
//! and administrator overrides.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: repository::Repository,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository.clone(), &config);
        Self {
            config: Arc::new(config),
            repository,
            services: Arc::new(services),
        }
    }
}
