// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Catalog entities, value objects and the contracts the application layer
//! depends on.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Entities, repository traits, collaborator traits, configuration

pub mod application;
pub mod catalog_config;
pub mod filter;
pub mod identity;
pub mod release;
pub mod repository;
