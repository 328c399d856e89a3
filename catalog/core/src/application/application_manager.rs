// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application Manager Application Service
//!
//! Enforces the catalog's business rules around the repositories:
//! - Validation of create/edit/release requests
//! - Transaction demarcation; any failure after `begin` rolls back
//! - Role-based visibility of restricted applications
//! - Release lifecycle transitions and their audit trail
//!
//! Every operation takes the [`Caller`] explicitly. Non-admin callers cannot
//! distinguish an invisible application from a missing one.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::error::ApplicationManagementError;
use crate::application::repository_factory::CatalogRepositories;
use crate::domain::application::{
    Application, ApplicationEdit, ApplicationId, NewApplication, UnrestrictedRole,
};
use crate::domain::filter::{ApplicationList, Filter};
use crate::domain::identity::{Caller, DeviceTypeLookup, RoleResolver};
use crate::domain::release::{
    ApplicationRelease, LifecycleState, LifecycleStateRecord, NewRelease, MAX_SCREENSHOTS,
};
use crate::domain::repository::DbConnection;
use crate::infrastructure::db::{ConnectionScope, Database};

pub type ManagerResult<T> = Result<T, ApplicationManagementError>;

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait ApplicationManager: Send + Sync {
    /// Create an application together with its single initial release
    async fn create_application(
        &self,
        caller: &Caller,
        request: NewApplication,
    ) -> ManagerResult<Application>;

    /// One page of applications visible to the caller. `pagination.count`
    /// is the unfiltered database total; `pagination.size` the number
    /// actually returned.
    async fn get_applications(&self, caller: &Caller, filter: Filter)
        -> ManagerResult<ApplicationList>;

    async fn get_application(
        &self,
        caller: &Caller,
        name: &str,
        app_type: &str,
    ) -> ManagerResult<Option<Application>>;

    async fn get_application_by_id(
        &self,
        caller: &Caller,
        id: ApplicationId,
    ) -> ManagerResult<Option<Application>>;

    /// Application owning the release, carrying only that release
    async fn get_application_by_release(
        &self,
        caller: &Caller,
        release_uuid: Uuid,
    ) -> ManagerResult<Option<Application>>;

    async fn application_exists(
        &self,
        caller: &Caller,
        name: &str,
        app_type: &str,
    ) -> ManagerResult<bool>;

    /// Releases of an application, excluding removed ones
    async fn get_releases(
        &self,
        caller: &Caller,
        name: &str,
        app_type: &str,
    ) -> ManagerResult<Vec<ApplicationRelease>>;

    async fn edit_application(
        &self,
        caller: &Caller,
        edit: ApplicationEdit,
    ) -> ManagerResult<Application>;

    async fn delete_application(&self, caller: &Caller, id: ApplicationId) -> ManagerResult<()>;

    async fn create_release(
        &self,
        caller: &Caller,
        application_id: ApplicationId,
        release: NewRelease,
    ) -> ManagerResult<ApplicationRelease>;

    async fn change_lifecycle_state(
        &self,
        caller: &Caller,
        release_uuid: Uuid,
        target: LifecycleState,
    ) -> ManagerResult<LifecycleStateRecord>;

    /// Oldest first
    async fn get_lifecycle_history(
        &self,
        caller: &Caller,
        release_uuid: Uuid,
    ) -> ManagerResult<Vec<LifecycleStateRecord>>;

    /// Newest release whose current state is PUBLISHED
    async fn get_uuid_of_latest_release(
        &self,
        caller: &Caller,
        application_id: ApplicationId,
    ) -> ManagerResult<Option<Uuid>>;

    /// Permission check against the configured admin permission
    async fn is_admin_user(&self, caller: &Caller) -> ManagerResult<bool>;

    /// Whether the caller may see something guarded by `roles`
    async fn is_user_allowed(
        &self,
        caller: &Caller,
        roles: &[UnrestrictedRole],
    ) -> ManagerResult<bool>;
}

// ============================================================================
// Validation
// ============================================================================

fn validate_caller(caller: &Caller) -> ManagerResult<()> {
    if !caller.tenant_id.is_valid() {
        return Err(ApplicationManagementError::validation(format!(
            "Invalid tenant id {}",
            caller.tenant_id
        )));
    }
    if caller.username.trim().is_empty() {
        return Err(ApplicationManagementError::validation("Username is required"));
    }
    Ok(())
}

fn require(value: &str, field: &str) -> ManagerResult<()> {
    if value.trim().is_empty() {
        return Err(ApplicationManagementError::validation(format!(
            "Application {} is required",
            field
        )));
    }
    Ok(())
}

fn validate_release(release: &NewRelease) -> ManagerResult<()> {
    if release.version.trim().is_empty() {
        return Err(ApplicationManagementError::validation("Release version is required"));
    }
    if release.screenshots.len() > MAX_SCREENSHOTS {
        return Err(ApplicationManagementError::validation(format!(
            "A release carries at most {} screenshots",
            MAX_SCREENSHOTS
        )));
    }
    if !release.price.is_finite() || release.price < 0.0 {
        return Err(ApplicationManagementError::validation(
            "Release price must be a non-negative number",
        ));
    }
    Ok(())
}

fn validate_new_application(request: &NewApplication) -> ManagerResult<()> {
    require(&request.name, "name")?;
    require(&request.app_type, "type")?;
    require(&request.category, "category")?;
    match request.releases.as_slice() {
        [release] => validate_release(release),
        [] => Err(ApplicationManagementError::validation(
            "An initial release is required",
        )),
        _ => Err(ApplicationManagementError::validation(
            "Only one initial release can be created with an application",
        )),
    }
}

fn without_removed(releases: Vec<ApplicationRelease>) -> Vec<ApplicationRelease> {
    releases.into_iter().filter(|release| !release.is_removed()).collect()
}

/// Commit on success; otherwise roll back and return the original error
async fn complete_transaction<T>(
    mut scope: ConnectionScope,
    result: ManagerResult<T>,
) -> ManagerResult<T> {
    match result {
        Ok(value) => {
            scope.commit().await?;
            Ok(value)
        }
        Err(err) => {
            match scope.rollback().await {
                Ok(()) => debug!(error = %err, "Rolled back transaction"),
                Err(rollback_err) => error!(
                    error = %err,
                    rollback_error = %rollback_err,
                    "Failed to roll back transaction"
                ),
            }
            Err(err)
        }
    }
}

/// Close a read scope, keeping the operation's own error
async fn complete_read<T>(scope: ConnectionScope, result: ManagerResult<T>) -> ManagerResult<T> {
    let closed = scope.close().await;
    let value = result?;
    closed?;
    Ok(value)
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct StandardApplicationManager {
    database: Database,
    repositories: CatalogRepositories,
    role_resolver: Arc<dyn RoleResolver>,
    device_types: Arc<dyn DeviceTypeLookup>,
    admin_permission: String,
}

impl StandardApplicationManager {
    pub fn new(
        database: Database,
        repositories: CatalogRepositories,
        role_resolver: Arc<dyn RoleResolver>,
        device_types: Arc<dyn DeviceTypeLookup>,
        admin_permission: impl Into<String>,
    ) -> Self {
        Self {
            database,
            repositories,
            role_resolver,
            device_types,
            admin_permission: admin_permission.into(),
        }
    }

    /// Owners always see their own applications
    async fn can_view(&self, caller: &Caller, application: &Application) -> ManagerResult<bool> {
        if application.owner == caller.username {
            return Ok(true);
        }
        self.is_user_allowed(caller, &application.unrestricted_roles)
            .await
    }

    /// Owners and tenant administrators may change an application
    async fn can_modify(&self, caller: &Caller, application: &Application) -> ManagerResult<bool> {
        if application.owner == caller.username {
            return Ok(true);
        }
        self.is_admin_user(caller).await
    }

    async fn attach_active_releases(
        &self,
        conn: &mut DbConnection,
        application: &mut Application,
    ) -> ManagerResult<()> {
        let releases = self
            .repositories
            .releases
            .get_releases_by_application(conn, application.id)
            .await?;
        application.releases = without_removed(releases);
        Ok(())
    }

    /// Visible application with its active releases, `None` otherwise
    async fn visible(
        &self,
        conn: &mut DbConnection,
        caller: &Caller,
        application: Option<Application>,
    ) -> ManagerResult<Option<Application>> {
        let Some(mut application) = application else {
            return Ok(None);
        };
        if !self.can_view(caller, &application).await? {
            debug!(application_id = %application.id, "Application not visible to caller");
            return Ok(None);
        }
        self.attach_active_releases(conn, &mut application).await?;
        Ok(Some(application))
    }

    async fn is_duplicate_name(&self, caller: &Caller, name: &str) -> ManagerResult<bool> {
        let filter = Filter::exact_name(name);
        let mut scope = self.database.open_scope().await?;
        let result = async {
            let conn = scope.connection().await?;
            let page = self
                .repositories
                .applications
                .list_applications(conn, &filter, caller.tenant_id)
                .await?;
            Ok::<_, ApplicationManagementError>(!page.applications.is_empty())
        }
        .await;
        complete_read(scope, result).await
    }

    async fn insert_application(
        &self,
        scope: &mut ConnectionScope,
        caller: &Caller,
        application: &Application,
        release: &NewRelease,
    ) -> ManagerResult<ApplicationId> {
        let conn = scope.connection().await?;
        let repositories = &self.repositories;
        let tenant_id = caller.tenant_id;

        let id = repositories
            .applications
            .create_application(conn, application)
            .await?;
        repositories
            .applications
            .add_tags(conn, &application.tags, id, tenant_id)
            .await?;
        if application.is_restricted {
            repositories
                .visibility
                .add_unrestricted_roles(conn, &application.unrestricted_roles, id, tenant_id)
                .await?;
        }

        let now = Utc::now();
        let uuid = release.uuid.unwrap_or_else(Uuid::new_v4);
        let stored = repositories
            .releases
            .create_release(conn, release, uuid, id, &caller.username, now)
            .await?;
        repositories
            .lifecycle
            .add_lifecycle_state(conn, stored.id, LifecycleState::Created, &caller.username, now)
            .await?;

        Ok(id)
    }

    async fn edit_in_scope(
        &self,
        scope: &mut ConnectionScope,
        caller: &Caller,
        mut edit: ApplicationEdit,
    ) -> ManagerResult<Application> {
        let conn = scope.connection().await?;
        let repositories = &self.repositories;
        let tenant_id = caller.tenant_id;

        let existing = repositories
            .applications
            .get_application(conn, &edit.name, &edit.app_type, tenant_id)
            .await?
            .ok_or_else(|| {
                ApplicationManagementError::not_found(format!(
                    "Application {}/{}",
                    edit.name, edit.app_type
                ))
            })?;
        if !self.can_modify(caller, &existing).await? {
            warn!(application_id = %existing.id, "Edit rejected for non-owner");
            return Err(ApplicationManagementError::not_found(format!(
                "Application {}/{}",
                edit.name, edit.app_type
            )));
        }

        if let Some(new_name) = edit.new_name.as_deref().map(str::trim) {
            if !new_name.is_empty() {
                let taken = repositories
                    .applications
                    .list_applications(conn, &Filter::exact_name(new_name), tenant_id)
                    .await?
                    .applications
                    .iter()
                    .any(|other| other.id != existing.id);
                if taken {
                    return Err(ApplicationManagementError::validation(format!(
                        "Application name {} is already in use",
                        new_name
                    )));
                }
            }
        }

        // Only a resolved type change may move the device type
        edit.device_type_id = None;
        if let Some(new_type) = edit.new_type.as_deref().map(str::trim) {
            if !new_type.is_empty() {
                let device_type = self
                    .device_types
                    .device_type_for(new_type, tenant_id)
                    .await?
                    .ok_or_else(|| {
                        ApplicationManagementError::validation(format!(
                            "No device type {} registered for tenant {}",
                            new_type, tenant_id
                        ))
                    })?;
                edit.device_type_id = Some(device_type.id);
            }
        }

        let roles_after = match edit.unrestricted_roles.clone() {
            Some(roles) => roles,
            None => {
                repositories
                    .visibility
                    .get_unrestricted_roles(conn, existing.id, tenant_id)
                    .await?
            }
        };
        let wants_restricted = edit.is_restricted.unwrap_or(existing.is_restricted);
        let restricted = wants_restricted && !roles_after.is_empty();
        if wants_restricted && !restricted {
            warn!(application_id = %existing.id, "Restricted application has no unrestricted roles, storing as unrestricted");
        }
        edit.is_restricted = Some(restricted);

        let updated = repositories
            .applications
            .edit_application(conn, &edit, tenant_id)
            .await?;

        if let Some(tags) = &edit.tags {
            repositories
                .applications
                .delete_tags(conn, updated.id, tenant_id)
                .await?;
            repositories
                .applications
                .add_tags(conn, tags, updated.id, tenant_id)
                .await?;
        }

        if !restricted {
            repositories
                .visibility
                .delete_unrestricted_roles(conn, updated.id, tenant_id)
                .await?;
        } else if let Some(roles) = &edit.unrestricted_roles {
            repositories
                .visibility
                .delete_unrestricted_roles(conn, updated.id, tenant_id)
                .await?;
            repositories
                .visibility
                .add_unrestricted_roles(conn, roles, updated.id, tenant_id)
                .await?;
        }

        let mut application = repositories
            .applications
            .get_application_by_id(conn, updated.id, tenant_id)
            .await?
            .ok_or_else(|| {
                ApplicationManagementError::not_found(format!("Application {}", updated.id))
            })?;
        self.attach_active_releases(conn, &mut application).await?;
        Ok(application)
    }

    async fn delete_in_scope(
        &self,
        scope: &mut ConnectionScope,
        caller: &Caller,
        id: ApplicationId,
    ) -> ManagerResult<()> {
        let conn = scope.connection().await?;
        let repositories = &self.repositories;
        let tenant_id = caller.tenant_id;

        let application = repositories
            .applications
            .get_application_by_id(conn, id, tenant_id)
            .await?
            .ok_or_else(|| ApplicationManagementError::not_found(format!("Application {}", id)))?;
        if !self.can_modify(caller, &application).await? {
            warn!(application_id = %id, "Delete rejected for non-owner");
            return Err(ApplicationManagementError::not_found(format!("Application {}", id)));
        }

        repositories.lifecycle.delete_lifecycle_states(conn, id).await?;
        repositories.releases.delete_releases(conn, id).await?;
        repositories.applications.delete_tags(conn, id, tenant_id).await?;
        repositories
            .visibility
            .delete_unrestricted_roles(conn, id, tenant_id)
            .await?;
        repositories
            .applications
            .delete_application(conn, id, tenant_id)
            .await?;
        Ok(())
    }

    async fn create_release_in_scope(
        &self,
        scope: &mut ConnectionScope,
        caller: &Caller,
        application_id: ApplicationId,
        release: &NewRelease,
    ) -> ManagerResult<ApplicationRelease> {
        let conn = scope.connection().await?;
        let repositories = &self.repositories;

        let application = repositories
            .applications
            .get_application_by_id(conn, application_id, caller.tenant_id)
            .await?
            .ok_or_else(|| {
                ApplicationManagementError::not_found(format!("Application {}", application_id))
            })?;
        if !self.can_modify(caller, &application).await? {
            return Err(ApplicationManagementError::not_found(format!(
                "Application {}",
                application_id
            )));
        }

        let version = release.version.trim();
        let existing = repositories
            .releases
            .get_releases_by_application(conn, application_id)
            .await?;
        if existing.iter().any(|stored| stored.version == version) {
            return Err(ApplicationManagementError::validation(format!(
                "Release version {} already exists for application {}",
                version, application.name
            )));
        }

        let now = Utc::now();
        let uuid = release.uuid.unwrap_or_else(Uuid::new_v4);
        let mut stored = repositories
            .releases
            .create_release(conn, release, uuid, application_id, &caller.username, now)
            .await?;
        repositories
            .lifecycle
            .add_lifecycle_state(conn, stored.id, LifecycleState::Created, &caller.username, now)
            .await?;
        stored.current_state = Some(LifecycleState::Created);
        Ok(stored)
    }

    async fn change_state_in_scope(
        &self,
        scope: &mut ConnectionScope,
        caller: &Caller,
        release_uuid: Uuid,
        target: LifecycleState,
    ) -> ManagerResult<LifecycleStateRecord> {
        let conn = scope.connection().await?;
        let repositories = &self.repositories;
        let not_found = || ApplicationManagementError::not_found(format!("Release {}", release_uuid));

        let release = repositories
            .releases
            .get_release(conn, release_uuid, caller.tenant_id)
            .await?
            .ok_or_else(not_found)?;
        let application = repositories
            .applications
            .get_application_by_id(conn, release.application_id, caller.tenant_id)
            .await?
            .ok_or_else(not_found)?;
        if !self.can_modify(caller, &application).await? {
            return Err(not_found());
        }

        let current = repositories
            .lifecycle
            .get_latest_lifecycle_state(conn, release.id)
            .await?
            .map(|record| record.state)
            .unwrap_or(LifecycleState::Created);
        if !current.can_transition_to(target) {
            return Err(ApplicationManagementError::validation(format!(
                "Release {} cannot move from {} to {}",
                release_uuid, current, target
            )));
        }

        let now = Utc::now();
        let record = repositories
            .lifecycle
            .add_lifecycle_state(conn, release.id, target, &caller.username, now)
            .await?;
        if target == LifecycleState::Published {
            repositories
                .releases
                .mark_published(conn, release.id, &caller.username, now)
                .await?;
        }
        Ok(record)
    }
}

#[async_trait]
impl ApplicationManager for StandardApplicationManager {
    #[tracing::instrument(skip(self, request), fields(tenant_id = %caller.tenant_id, name = %request.name))]
    async fn create_application(
        &self,
        caller: &Caller,
        request: NewApplication,
    ) -> ManagerResult<Application> {
        validate_caller(caller)?;
        validate_new_application(&request)?;

        let name = request.name.trim().to_string();
        if self.is_duplicate_name(caller, &name).await? {
            warn!("Application name already taken in tenant");
            return Err(ApplicationManagementError::validation(format!(
                "Application {} already exists",
                name
            )));
        }

        let device_type = self
            .device_types
            .device_type_for(&request.app_type, caller.tenant_id)
            .await?
            .ok_or_else(|| {
                ApplicationManagementError::validation(format!(
                    "No device type {} registered for tenant {}",
                    request.app_type, caller.tenant_id
                ))
            })?;

        let mut is_restricted = request.is_restricted;
        if is_restricted && request.unrestricted_roles.is_empty() {
            warn!("Restricted application has no unrestricted roles, storing as unrestricted");
            is_restricted = false;
        }
        let unrestricted_roles = if is_restricted {
            request.unrestricted_roles
        } else {
            Vec::new()
        };

        let application = Application {
            id: ApplicationId(0),
            name,
            app_type: request.app_type.trim().to_string(),
            category: request.category.trim().to_string(),
            is_free: request.is_free,
            payment_currency: request.payment_currency,
            is_restricted,
            tenant_id: caller.tenant_id,
            owner: caller.username.clone(),
            device_type_id: device_type.id,
            tags: request.tags,
            unrestricted_roles,
            releases: Vec::new(),
        };
        let release = request.releases.into_iter().next().ok_or_else(|| {
            ApplicationManagementError::validation("An initial release is required")
        })?;

        let mut scope = self.database.begin_scope().await?;
        let result = self
            .insert_application(&mut scope, caller, &application, &release)
            .await;
        let id = complete_transaction(scope, result).await?;
        info!(application_id = %id, "Created application");

        self.get_application_by_id(caller, id)
            .await?
            .ok_or_else(|| ApplicationManagementError::not_found(format!("Application {}", id)))
    }

    #[tracing::instrument(skip(self, filter), fields(tenant_id = %caller.tenant_id, username = %caller.username))]
    async fn get_applications(
        &self,
        caller: &Caller,
        filter: Filter,
    ) -> ManagerResult<ApplicationList> {
        validate_caller(caller)?;

        let mut scope = self.database.open_scope().await?;
        let result = async {
            let conn = scope.connection().await?;
            let mut page = self
                .repositories
                .applications
                .list_applications(conn, &filter, caller.tenant_id)
                .await?;

            if !self.is_admin_user(caller).await? {
                let roles = self
                    .role_resolver
                    .roles_of(caller.tenant_id, &caller.username)
                    .await?;
                page.applications.retain(|application| {
                    application.owner == caller.username || application.is_visible_to_roles(&roles)
                });
            }
            for application in page.applications.iter_mut() {
                self.attach_active_releases(conn, application).await?;
            }
            page.pagination.size = page.applications.len();
            Ok::<_, ApplicationManagementError>(page)
        }
        .await;
        complete_read(scope, result).await
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %caller.tenant_id))]
    async fn get_application(
        &self,
        caller: &Caller,
        name: &str,
        app_type: &str,
    ) -> ManagerResult<Option<Application>> {
        validate_caller(caller)?;
        let mut scope = self.database.open_scope().await?;
        let result = async {
            let conn = scope.connection().await?;
            let application = self
                .repositories
                .applications
                .get_application(conn, name, app_type, caller.tenant_id)
                .await?;
            self.visible(conn, caller, application).await
        }
        .await;
        complete_read(scope, result).await
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %caller.tenant_id))]
    async fn get_application_by_id(
        &self,
        caller: &Caller,
        id: ApplicationId,
    ) -> ManagerResult<Option<Application>> {
        validate_caller(caller)?;
        let mut scope = self.database.open_scope().await?;
        let result = async {
            let conn = scope.connection().await?;
            let application = self
                .repositories
                .applications
                .get_application_by_id(conn, id, caller.tenant_id)
                .await?;
            self.visible(conn, caller, application).await
        }
        .await;
        complete_read(scope, result).await
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %caller.tenant_id))]
    async fn get_application_by_release(
        &self,
        caller: &Caller,
        release_uuid: Uuid,
    ) -> ManagerResult<Option<Application>> {
        validate_caller(caller)?;
        let mut scope = self.database.open_scope().await?;
        let result = async {
            let conn = scope.connection().await?;
            let application = self
                .repositories
                .applications
                .get_application_by_release(conn, release_uuid, caller.tenant_id)
                .await?;
            let Some(application) = application else {
                return Ok(None);
            };
            if self.can_view(caller, &application).await? {
                Ok::<_, ApplicationManagementError>(Some(application))
            } else {
                Ok(None)
            }
        }
        .await;
        complete_read(scope, result).await
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %caller.tenant_id))]
    async fn application_exists(
        &self,
        caller: &Caller,
        name: &str,
        app_type: &str,
    ) -> ManagerResult<bool> {
        validate_caller(caller)?;
        let mut scope = self.database.open_scope().await?;
        let result = async {
            let conn = scope.connection().await?;
            Ok::<_, ApplicationManagementError>(
                self.repositories
                    .applications
                    .application_exists(conn, name, app_type, caller.tenant_id)
                    .await?,
            )
        }
        .await;
        complete_read(scope, result).await
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %caller.tenant_id))]
    async fn get_releases(
        &self,
        caller: &Caller,
        name: &str,
        app_type: &str,
    ) -> ManagerResult<Vec<ApplicationRelease>> {
        validate_caller(caller)?;
        let not_found = || ApplicationManagementError::not_found(format!("Application {}/{}", name, app_type));

        let mut scope = self.database.open_scope().await?;
        let result = async {
            let conn = scope.connection().await?;
            let application = self
                .repositories
                .applications
                .get_application(conn, name, app_type, caller.tenant_id)
                .await?
                .ok_or_else(not_found)?;
            if !self.can_view(caller, &application).await? {
                return Err(not_found());
            }
            let releases = self
                .repositories
                .releases
                .get_releases(conn, name, app_type, caller.tenant_id)
                .await?;
            Ok::<_, ApplicationManagementError>(without_removed(releases))
        }
        .await;
        complete_read(scope, result).await
    }

    #[tracing::instrument(skip(self, edit), fields(tenant_id = %caller.tenant_id, name = %edit.name))]
    async fn edit_application(
        &self,
        caller: &Caller,
        edit: ApplicationEdit,
    ) -> ManagerResult<Application> {
        validate_caller(caller)?;
        require(&edit.name, "name")?;
        require(&edit.app_type, "type")?;

        let mut scope = self.database.begin_scope().await?;
        let result = self.edit_in_scope(&mut scope, caller, edit).await;
        let application = complete_transaction(scope, result).await?;
        info!(application_id = %application.id, "Edited application");
        Ok(application)
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %caller.tenant_id))]
    async fn delete_application(&self, caller: &Caller, id: ApplicationId) -> ManagerResult<()> {
        validate_caller(caller)?;

        let mut scope = self.database.begin_scope().await?;
        let result = self.delete_in_scope(&mut scope, caller, id).await;
        complete_transaction(scope, result).await?;
        info!(application_id = %id, "Deleted application");
        Ok(())
    }

    #[tracing::instrument(skip(self, release), fields(tenant_id = %caller.tenant_id, version = %release.version))]
    async fn create_release(
        &self,
        caller: &Caller,
        application_id: ApplicationId,
        release: NewRelease,
    ) -> ManagerResult<ApplicationRelease> {
        validate_caller(caller)?;
        validate_release(&release)?;

        let mut scope = self.database.begin_scope().await?;
        let result = self
            .create_release_in_scope(&mut scope, caller, application_id, &release)
            .await;
        let stored = complete_transaction(scope, result).await?;
        info!(release_uuid = %stored.uuid, "Created release");
        Ok(stored)
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %caller.tenant_id))]
    async fn change_lifecycle_state(
        &self,
        caller: &Caller,
        release_uuid: Uuid,
        target: LifecycleState,
    ) -> ManagerResult<LifecycleStateRecord> {
        validate_caller(caller)?;

        let mut scope = self.database.begin_scope().await?;
        let result = self
            .change_state_in_scope(&mut scope, caller, release_uuid, target)
            .await;
        let record = complete_transaction(scope, result).await?;
        info!(%release_uuid, state = %record.state, "Changed release lifecycle state");
        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %caller.tenant_id))]
    async fn get_lifecycle_history(
        &self,
        caller: &Caller,
        release_uuid: Uuid,
    ) -> ManagerResult<Vec<LifecycleStateRecord>> {
        validate_caller(caller)?;
        let not_found = || ApplicationManagementError::not_found(format!("Release {}", release_uuid));

        let mut scope = self.database.open_scope().await?;
        let result = async {
            let conn = scope.connection().await?;
            let application = self
                .repositories
                .applications
                .get_application_by_release(conn, release_uuid, caller.tenant_id)
                .await?
                .ok_or_else(not_found)?;
            if !self.can_view(caller, &application).await? {
                return Err(not_found());
            }
            let release = application.releases.first().ok_or_else(not_found)?;
            Ok::<_, ApplicationManagementError>(
                self.repositories
                    .lifecycle
                    .get_lifecycle_history(conn, release.id)
                    .await?,
            )
        }
        .await;
        complete_read(scope, result).await
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %caller.tenant_id))]
    async fn get_uuid_of_latest_release(
        &self,
        caller: &Caller,
        application_id: ApplicationId,
    ) -> ManagerResult<Option<Uuid>> {
        validate_caller(caller)?;
        let not_found =
            || ApplicationManagementError::not_found(format!("Application {}", application_id));

        let mut scope = self.database.open_scope().await?;
        let result = async {
            let conn = scope.connection().await?;
            let application = self
                .repositories
                .applications
                .get_application_by_id(conn, application_id, caller.tenant_id)
                .await?
                .ok_or_else(not_found)?;
            if !self.can_view(caller, &application).await? {
                return Err(not_found());
            }
            Ok::<_, ApplicationManagementError>(
                self.repositories
                    .applications
                    .get_uuid_of_latest_release(conn, application_id, caller.tenant_id)
                    .await?,
            )
        }
        .await;
        complete_read(scope, result).await
    }

    async fn is_admin_user(&self, caller: &Caller) -> ManagerResult<bool> {
        Ok(self
            .role_resolver
            .is_authorized(caller.tenant_id, &caller.username, &self.admin_permission)
            .await?)
    }

    async fn is_user_allowed(
        &self,
        caller: &Caller,
        roles: &[UnrestrictedRole],
    ) -> ManagerResult<bool> {
        if self.is_admin_user(caller).await? {
            return Ok(true);
        }
        if roles.is_empty() {
            return Ok(true);
        }
        let held = self
            .role_resolver
            .roles_of(caller.tenant_id, &caller.username)
            .await?;
        Ok(roles.iter().any(|role| held.contains(role.role())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::application::Tag;

    fn request() -> NewApplication {
        NewApplication {
            name: "Foo".to_string(),
            app_type: "android".to_string(),
            category: "tools".to_string(),
            is_free: true,
            payment_currency: None,
            is_restricted: false,
            tags: vec![Tag::new("games")],
            unrestricted_roles: vec![],
            releases: vec![NewRelease::with_version("1.0.0")],
        }
    }

    #[test]
    fn test_validate_new_application() {
        assert!(validate_new_application(&request()).is_ok());

        let mut missing_category = request();
        missing_category.category = "  ".to_string();
        assert!(validate_new_application(&missing_category).is_err());

        let mut two_releases = request();
        two_releases.releases.push(NewRelease::with_version("1.0.1"));
        assert!(validate_new_application(&two_releases).is_err());

        let mut no_release = request();
        no_release.releases.clear();
        assert!(validate_new_application(&no_release).is_err());

        let mut blank_version = request();
        blank_version.releases = vec![NewRelease::with_version("")];
        assert!(validate_new_application(&blank_version).is_err());
    }

    #[test]
    fn test_validate_caller() {
        assert!(validate_caller(&Caller::new(crate::domain::application::TenantId(1), "alice")).is_ok());
        assert!(validate_caller(&Caller::new(crate::domain::application::TenantId(0), "alice")).is_err());
        assert!(validate_caller(&Caller::new(crate::domain::application::TenantId(1), " ")).is_err());
    }

    #[test]
    fn test_validate_release_limits() {
        let mut release = NewRelease::with_version("2.0");
        release.screenshots = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        assert!(validate_release(&release).is_err());

        let mut release = NewRelease::with_version("2.0");
        release.price = -1.0;
        assert!(validate_release(&release).is_err());
    }
}
