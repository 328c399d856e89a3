// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error taxonomy of the application manager.

use thiserror::Error;

use crate::domain::identity::IdentityError;
use crate::domain::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum ApplicationManagementError {
    /// Malformed input, duplicate names, disallowed transitions
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Absent, or not visible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Authorization backend unavailable: {0}")]
    AuthorizationBackend(String),
}

impl ApplicationManagementError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApplicationManagementError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApplicationManagementError::NotFound(message.into())
    }
}

impl From<RepositoryError> for ApplicationManagementError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(message) => ApplicationManagementError::NotFound(message),
            RepositoryError::InvalidFilter(message) => ApplicationManagementError::Validation(message),
            RepositoryError::Conflict(message) => {
                ApplicationManagementError::Validation(format!("Conflicting write: {}", message))
            }
            RepositoryError::Database(message) | RepositoryError::Serialization(message) => {
                ApplicationManagementError::Persistence(message)
            }
        }
    }
}

impl From<IdentityError> for ApplicationManagementError {
    fn from(err: IdentityError) -> Self {
        ApplicationManagementError::AuthorizationBackend(err.to_string())
    }
}
