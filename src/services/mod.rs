//! Business logic services

pub mod catalog;
pub mod loans;
pub mod storage;
pub mod users;
pub mod verification;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub storage: storage::StorageService,
    pub users: users::UsersService,
    pub verification: verification::VerificationService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let storage = storage::StorageService::new(&config.storage);
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), storage.clone()),
            loans: loans::LoansService::new(repository.clone(), storage.clone(), config.loans.clone()),
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            verification: verification::VerificationService::new(repository, config.loans.clone()),
            storage,
        }
    }
}
