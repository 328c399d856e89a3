// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Filter and pagination value objects for application listings.

use serde::{Deserialize, Serialize};

use crate::domain::application::Application;

pub const DEFAULT_LIMIT: u32 = 20;
pub const DEFAULT_MAX_LIMIT: u32 = 500;

/// Listing query: optional name search, match mode and page window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub search_query: Option<String>,
    /// Exact (case-insensitive) name match instead of substring match
    #[serde(default)]
    pub full_match: bool,
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            search_query: None,
            full_match: false,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Filter {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    /// Exact-name lookup returning at most one row
    pub fn exact_name(name: &str) -> Self {
        Self {
            search_query: Some(name.trim().to_string()),
            full_match: true,
            limit: 1,
            offset: 0,
        }
    }

    pub fn with_search(mut self, query: impl Into<String>, full_match: bool) -> Self {
        self.search_query = Some(query.into());
        self.full_match = full_match;
        self
    }

    /// Search text when present and non-blank
    pub fn search_term(&self) -> Option<&str> {
        self.search_query
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Checks the page window against `max_limit`
    pub fn validate(&self, max_limit: u32) -> Result<(), String> {
        if self.limit == 0 {
            return Err("Filter limit must be greater than zero".to_string());
        }
        if self.limit > max_limit {
            return Err(format!(
                "Filter limit {} exceeds the maximum page size of {}",
                self.limit, max_limit
            ));
        }
        Ok(())
    }
}

/// Page metadata. `count` is the total number of applications matching the
/// filter's search predicate, independent of `limit`/`offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub count: i64,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationList {
    pub applications: Vec<Application>,
    pub pagination: Pagination,
}
