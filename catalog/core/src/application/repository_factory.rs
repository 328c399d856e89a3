// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete repository implementations the application manager
//! is wired with, keeping the domain layer free of infrastructure types.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Assemble repository trait objects from configuration

use std::sync::Arc;

use crate::domain::catalog_config::ListingConfig;
use crate::domain::repository::{
    ApplicationReleaseRepository, ApplicationRepository, LifecycleStateRepository,
    VisibilityRepository,
};
use crate::infrastructure::repositories::{
    SqliteApplicationReleaseRepository, SqliteApplicationRepository,
    SqliteLifecycleStateRepository, SqliteVisibilityRepository,
};

/// Every repository the application manager uses
#[derive(Clone)]
pub struct CatalogRepositories {
    pub applications: Arc<dyn ApplicationRepository>,
    pub releases: Arc<dyn ApplicationReleaseRepository>,
    pub lifecycle: Arc<dyn LifecycleStateRepository>,
    pub visibility: Arc<dyn VisibilityRepository>,
}

impl CatalogRepositories {
    pub fn sqlite(listing: &ListingConfig) -> Self {
        Self {
            applications: create_application_repository(listing),
            releases: create_release_repository(),
            lifecycle: create_lifecycle_repository(),
            visibility: create_visibility_repository(),
        }
    }
}

/// Creates an ApplicationRepository enforcing the configured page-size cap
pub fn create_application_repository(listing: &ListingConfig) -> Arc<dyn ApplicationRepository> {
    Arc::new(SqliteApplicationRepository::new(listing.max_limit))
}

pub fn create_release_repository() -> Arc<dyn ApplicationReleaseRepository> {
    Arc::new(SqliteApplicationReleaseRepository::new())
}

pub fn create_lifecycle_repository() -> Arc<dyn LifecycleStateRepository> {
    Arc::new(SqliteLifecycleStateRepository::new())
}

pub fn create_visibility_repository() -> Arc<dyn VisibilityRepository> {
    Arc::new(SqliteVisibilityRepository::new())
}
