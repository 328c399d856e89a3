// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod application_manager;
pub mod error;
pub mod repository_factory;

pub use application_manager::{ApplicationManager, ManagerResult, StandardApplicationManager};
pub use error::ApplicationManagementError;
pub use repository_factory::CatalogRepositories;
