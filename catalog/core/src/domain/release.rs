// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Releases and Lifecycle
//!
//! A release belongs to exactly one application. Its visible state is not a
//! column on the release row: it is the latest entry of the append-only
//! `lifecycle_states` history.
//!
//! ```text
//! CREATED ──► PUBLISHED ──► REMOVED
//!    └───────────────────────▲
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::application::ApplicationId;

/// Database-generated release identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(pub i64);

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Created,
    Published,
    Removed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown lifecycle state: {0}")]
pub struct UnknownLifecycleState(pub String);

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Created => "CREATED",
            LifecycleState::Published => "PUBLISHED",
            LifecycleState::Removed => "REMOVED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownLifecycleState> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CREATED" => Ok(LifecycleState::Created),
            "PUBLISHED" => Ok(LifecycleState::Published),
            "REMOVED" => Ok(LifecycleState::Removed),
            _ => Err(UnknownLifecycleState(value.to_string())),
        }
    }

    /// Transitions a release may take from this state
    pub fn next_states(&self) -> &'static [LifecycleState] {
        match self {
            LifecycleState::Created => &[LifecycleState::Published, LifecycleState::Removed],
            LifecycleState::Published => &[LifecycleState::Removed],
            LifecycleState::Removed => &[],
        }
    }

    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        self.next_states().contains(&target)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = UnknownLifecycleState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One entry of a release's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleStateRecord {
    pub id: i64,
    pub release_id: ReleaseId,
    pub state: LifecycleState,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

// ============================================================================
// Release
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRelease {
    pub id: ReleaseId,
    pub application_id: ApplicationId,
    pub version: String,
    pub uuid: Uuid,
    pub release_type: String,
    pub price: f64,
    pub stored_location: Option<String>,
    pub banner_location: Option<String>,
    pub screenshots: Vec<String>,
    pub hash: Option<String>,
    pub shared_with_all_tenants: bool,
    pub meta_info: Option<serde_json::Value>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub published_by: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub stars: i32,
    /// Latest lifecycle record's state, `None` when no history exists yet
    pub current_state: Option<LifecycleState>,
}

impl ApplicationRelease {
    /// A release without history counts as freshly created
    pub fn effective_state(&self) -> LifecycleState {
        self.current_state.unwrap_or(LifecycleState::Created)
    }

    pub fn is_removed(&self) -> bool {
        self.effective_state() == LifecycleState::Removed
    }
}

/// Release payload supplied by callers; identifiers and timestamps are
/// assigned by the manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRelease {
    pub version: String,
    pub uuid: Option<Uuid>,
    #[serde(default = "default_release_type")]
    pub release_type: String,
    #[serde(default)]
    pub price: f64,
    pub stored_location: Option<String>,
    pub banner_location: Option<String>,
    /// Up to three screenshot locations
    #[serde(default)]
    pub screenshots: Vec<String>,
    pub hash: Option<String>,
    #[serde(default)]
    pub shared_with_all_tenants: bool,
    pub meta_info: Option<serde_json::Value>,
}

pub const MAX_SCREENSHOTS: usize = 3;

fn default_release_type() -> String {
    "stable".to_string()
}

impl NewRelease {
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_type: default_release_type(),
            ..Self::default()
        }
    }
}
