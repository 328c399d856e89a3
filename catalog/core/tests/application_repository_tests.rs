// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod common;

use appcatalog_core::domain::application::{
    Application, ApplicationEdit, ApplicationId, Tag, UnrestrictedRole,
};
use appcatalog_core::domain::filter::Filter;
use appcatalog_core::domain::release::{LifecycleState, NewRelease};
use appcatalog_core::domain::repository::{
    ApplicationReleaseRepository, ApplicationRepository, DbConnection, LifecycleStateRepository,
    RepositoryError, VisibilityRepository,
};
use appcatalog_core::infrastructure::repositories::{
    SqliteApplicationReleaseRepository, SqliteApplicationRepository,
    SqliteLifecycleStateRepository, SqliteVisibilityRepository,
};
use chrono::Utc;
use common::{test_database, OTHER_TENANT, TENANT};
use uuid::Uuid;

fn application(name: &str) -> Application {
    Application {
        id: ApplicationId(0),
        name: name.to_string(),
        app_type: "android".to_string(),
        category: "tools".to_string(),
        is_free: true,
        payment_currency: None,
        is_restricted: false,
        tenant_id: TENANT,
        owner: "alice".to_string(),
        device_type_id: 1,
        tags: vec![],
        unrestricted_roles: vec![],
        releases: vec![],
    }
}

async fn insert(
    repository: &SqliteApplicationRepository,
    conn: &mut DbConnection,
    name: &str,
) -> ApplicationId {
    repository
        .create_application(conn, &application(name))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_and_partial_name_match() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    insert(&repository, conn, "Foo").await;
    insert(&repository, conn, "Foobar").await;
    insert(&repository, conn, "Other").await;

    let exact = Filter::new(10, 0).with_search("foo", true);
    let page = repository.list_applications(conn, &exact, TENANT).await.unwrap();
    let names: Vec<&str> = page.applications.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Foo"]);
    assert_eq!(page.pagination.count, 1);

    let partial = Filter::new(10, 0).with_search("Foo", false);
    let page = repository.list_applications(conn, &partial, TENANT).await.unwrap();
    let names: Vec<&str> = page.applications.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Foobar", "Foo"]);
}

#[tokio::test]
async fn test_partial_match_treats_wildcards_literally() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    insert(&repository, conn, "100% Free").await;
    insert(&repository, conn, "1000 Free").await;

    let filter = Filter::new(10, 0).with_search("100%", false);
    let page = repository.list_applications(conn, &filter, TENANT).await.unwrap();
    assert_eq!(page.applications.len(), 1);
    assert_eq!(page.applications[0].name, "100% Free");
}

#[tokio::test]
async fn test_count_ignores_limit_and_offset() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    for index in 0..12 {
        insert(&repository, conn, &format!("Game {}", index)).await;
    }
    insert(&repository, conn, "Calculator").await;

    let filter = Filter::new(10, 0).with_search("game", false);
    assert_eq!(repository.get_application_count(conn, &filter, TENANT).await.unwrap(), 12);

    let second_page = Filter::new(5, 10).with_search("game", false);
    assert_eq!(repository.get_application_count(conn, &second_page, TENANT).await.unwrap(), 12);

    let page = repository.list_applications(conn, &second_page, TENANT).await.unwrap();
    assert_eq!(page.applications.len(), 2);
    assert_eq!(page.pagination.count, 12);
    assert_eq!(page.pagination.size, 2);
}

#[tokio::test]
async fn test_listing_is_newest_first_and_tenant_scoped() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    let first = insert(&repository, conn, "First").await;
    let second = insert(&repository, conn, "Second").await;
    let mut foreign = application("Foreign");
    foreign.tenant_id = OTHER_TENANT;
    repository.create_application(conn, &foreign).await.unwrap();

    let page = repository
        .list_applications(conn, &Filter::new(10, 0), TENANT)
        .await
        .unwrap();
    let ids: Vec<ApplicationId> = page.applications.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![second, first]);
}

#[tokio::test]
async fn test_invalid_filter_is_rejected() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::new(50);
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    let err = repository
        .list_applications(conn, &Filter::new(0, 0), TENANT)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidFilter(_)));

    let err = repository
        .get_application_count(conn, &Filter::new(51, 0), TENANT)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidFilter(_)));
}

#[tokio::test]
async fn test_tags_and_roles_fold_into_one_application() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let visibility = SqliteVisibilityRepository::new();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    let id = insert(&repository, conn, "Foo").await;
    repository
        .add_tags(conn, &[Tag::new("games"), Tag::new("kids")], id, TENANT)
        .await
        .unwrap();
    visibility
        .add_unrestricted_roles(
            conn,
            &[UnrestrictedRole::new("manager"), UnrestrictedRole::new("sales")],
            id,
            TENANT,
        )
        .await
        .unwrap();

    let stored = repository
        .get_application(conn, "Foo", "android", TENANT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.tags, vec![Tag::new("games"), Tag::new("kids")]);
    assert_eq!(
        stored.unrestricted_roles,
        vec![UnrestrictedRole::new("manager"), UnrestrictedRole::new("sales")]
    );

    let page = repository
        .list_applications(conn, &Filter::new(10, 0), TENANT)
        .await
        .unwrap();
    assert_eq!(page.applications.len(), 1);
    assert_eq!(page.applications[0].tags.len(), 2);

    repository.delete_tags(conn, id, TENANT).await.unwrap();
    let stored = repository.get_application_by_id(conn, id, TENANT).await.unwrap().unwrap();
    assert!(stored.tags.is_empty());
    assert_eq!(stored.unrestricted_roles.len(), 2);
}

#[tokio::test]
async fn test_edit_writes_only_changed_columns() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    let id = insert(&repository, conn, "Foo").await;

    let mut edit = ApplicationEdit::for_application("Foo", "android");
    edit.category = Some("games".to_string());
    let updated = repository.edit_application(conn, &edit, TENANT).await.unwrap();
    assert_eq!(updated.id, id);
    assert_eq!(updated.category, "games");
    assert_eq!(updated.name, "Foo");
    assert_eq!(updated.app_type, "android");
    assert!(!updated.is_restricted);

    let mut rename = ApplicationEdit::for_application("Foo", "android");
    rename.new_name = Some("Bar".to_string());
    rename.payment_currency = Some(Some("EUR".to_string()));
    let renamed = repository.edit_application(conn, &rename, TENANT).await.unwrap();
    assert_eq!(renamed.name, "Bar");
    assert_eq!(renamed.payment_currency.as_deref(), Some("EUR"));
    assert_eq!(renamed.category, "games");
}

#[tokio::test]
async fn test_edit_missing_application_is_not_found() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    let edit = ApplicationEdit::for_application("Ghost", "android");
    let err = repository.edit_application(conn, &edit, TENANT).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn test_duplicate_identity_is_a_conflict() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    insert(&repository, conn, "Foo").await;
    let err = repository
        .create_application(conn, &application("Foo"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
async fn test_name_differing_only_in_case_is_a_conflict_across_types() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    insert(&repository, conn, "Foo").await;
    let mut variant = application("foo");
    variant.app_type = "ios".to_string();
    variant.device_type_id = 2;
    let err = repository
        .create_application(conn, &variant)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    // Another tenant may reuse the name
    let mut elsewhere = application("foo");
    elsewhere.tenant_id = OTHER_TENANT;
    repository.create_application(conn, &elsewhere).await.unwrap();
}

#[tokio::test]
async fn test_unrestricted_roles_round_trip() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let visibility = SqliteVisibilityRepository::new();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    let id = insert(&repository, conn, "Foo").await;
    assert!(visibility
        .get_unrestricted_roles(conn, id, TENANT)
        .await
        .unwrap()
        .is_empty());

    visibility
        .add_unrestricted_roles(
            conn,
            &[UnrestrictedRole::new("sales"), UnrestrictedRole::new("manager")],
            id,
            TENANT,
        )
        .await
        .unwrap();
    assert_eq!(
        visibility.get_unrestricted_roles(conn, id, TENANT).await.unwrap(),
        vec![UnrestrictedRole::new("sales"), UnrestrictedRole::new("manager")]
    );
    assert!(visibility
        .get_unrestricted_roles(conn, id, OTHER_TENANT)
        .await
        .unwrap()
        .is_empty());

    visibility.delete_unrestricted_roles(conn, id, TENANT).await.unwrap();
    assert!(visibility
        .get_unrestricted_roles(conn, id, TENANT)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_application_id_lookup() {
    let (_dir, database) = test_database().await;
    let repository = SqliteApplicationRepository::default();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    let id = insert(&repository, conn, "Foo").await;
    assert_eq!(
        repository.get_application_id(conn, "Foo", "android", TENANT).await.unwrap(),
        Some(id)
    );
    assert_eq!(
        repository.get_application_id(conn, "Foo", "ios", TENANT).await.unwrap(),
        None
    );
    assert!(repository.application_exists_by_id(conn, id, TENANT).await.unwrap());
    assert!(!repository.application_exists_by_id(conn, id, OTHER_TENANT).await.unwrap());

    repository.delete_application(conn, id, TENANT).await.unwrap();
    assert!(!repository.application_exists(conn, "Foo", "android", TENANT).await.unwrap());
}

#[tokio::test]
async fn test_latest_release_uses_current_published_state() {
    let (_dir, database) = test_database().await;
    let applications = SqliteApplicationRepository::default();
    let releases = SqliteApplicationReleaseRepository::new();
    let lifecycle = SqliteLifecycleStateRepository::new();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    let id = insert(&applications, conn, "Foo").await;
    let now = Utc::now();
    let older = releases
        .create_release(conn, &NewRelease::with_version("1.0"), Uuid::new_v4(), id, "alice", now)
        .await
        .unwrap();
    let newer = releases
        .create_release(conn, &NewRelease::with_version("2.0"), Uuid::new_v4(), id, "alice", now)
        .await
        .unwrap();

    assert_eq!(applications.get_uuid_of_latest_release(conn, id, TENANT).await.unwrap(), None);

    for release in [&older, &newer] {
        lifecycle
            .add_lifecycle_state(conn, release.id, LifecycleState::Published, "alice", now)
            .await
            .unwrap();
    }
    assert_eq!(
        applications.get_uuid_of_latest_release(conn, id, TENANT).await.unwrap(),
        Some(newer.uuid)
    );

    // A removed release no longer counts even though it was published once
    lifecycle
        .add_lifecycle_state(conn, newer.id, LifecycleState::Removed, "alice", now)
        .await
        .unwrap();
    assert_eq!(
        applications.get_uuid_of_latest_release(conn, id, TENANT).await.unwrap(),
        Some(older.uuid)
    );
}

#[tokio::test]
async fn test_release_carries_current_state_and_history() {
    let (_dir, database) = test_database().await;
    let applications = SqliteApplicationRepository::default();
    let releases = SqliteApplicationReleaseRepository::new();
    let lifecycle = SqliteLifecycleStateRepository::new();
    let mut scope = database.open_scope().await.unwrap();
    let conn = scope.connection().await.unwrap();

    let id = insert(&applications, conn, "Foo").await;
    let mut request = NewRelease::with_version("1.0");
    request.screenshots = vec!["s1.png".to_string(), "s2.png".to_string()];
    request.meta_info = Some(serde_json::json!({"minSdk": 21}));
    let release = releases
        .create_release(conn, &request, Uuid::new_v4(), id, "alice", Utc::now())
        .await
        .unwrap();
    assert_eq!(release.current_state, None);
    assert_eq!(release.screenshots, vec!["s1.png", "s2.png"]);
    assert_eq!(release.meta_info, Some(serde_json::json!({"minSdk": 21})));

    lifecycle
        .add_lifecycle_state(conn, release.id, LifecycleState::Created, "alice", Utc::now())
        .await
        .unwrap();
    lifecycle
        .add_lifecycle_state(conn, release.id, LifecycleState::Published, "bob", Utc::now())
        .await
        .unwrap();

    let stored = releases.get_release(conn, release.uuid, TENANT).await.unwrap().unwrap();
    assert_eq!(stored.current_state, Some(LifecycleState::Published));
    assert!(releases.get_release(conn, release.uuid, OTHER_TENANT).await.unwrap().is_none());

    let history = lifecycle.get_lifecycle_history(conn, release.id).await.unwrap();
    let states: Vec<LifecycleState> = history.iter().map(|record| record.state).collect();
    assert_eq!(states, vec![LifecycleState::Created, LifecycleState::Published]);
    assert_eq!(history[1].changed_by, "bob");

    let by_release = applications
        .get_application_by_release(conn, release.uuid, TENANT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_release.id, id);
    assert_eq!(by_release.releases.len(), 1);
    assert_eq!(by_release.releases[0].uuid, release.uuid);
}
