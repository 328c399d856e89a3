// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** SQLite persistence, query construction, static identity store

pub mod db;
pub mod identity;
pub mod query;
pub mod repositories;
