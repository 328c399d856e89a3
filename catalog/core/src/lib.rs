// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Catalog Core
//!
//! Transactional persistence and access control for a multi-tenant
//! application catalog.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application manager, SQLite infrastructure

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
