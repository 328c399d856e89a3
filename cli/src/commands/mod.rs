// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the application catalog CLI

pub mod app;
pub mod config;
pub mod release;
pub mod update;

pub use self::app::AppCommand;
pub use self::config::ConfigCommand;
pub use self::release::ReleaseCommand;
pub use self::update::UpdateCommand;

use anyhow::Result;
use serde::Serialize;

/// Print a value as pretty JSON
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
