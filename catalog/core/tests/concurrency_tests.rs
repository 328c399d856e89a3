// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod common;

use appcatalog_core::application::{ApplicationManagementError, ApplicationManager};
use appcatalog_core::domain::filter::Filter;
use common::{caller, new_application, test_catalog, MockIdentityStore};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_creates_of_same_identity_keep_one_row() {
    let catalog = test_catalog(MockIdentityStore::new()).await;
    let alice = caller("alice");
    let bob = caller("bob");

    let (first, second) = tokio::join!(
        catalog.manager.create_application(&alice, new_application("Foo")),
        catalog.manager.create_application(&bob, new_application("Foo")),
    );

    let outcomes = [first, second];
    let created = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(created, 1);
    assert!(outcomes.iter().any(|outcome| matches!(
        outcome,
        Err(ApplicationManagementError::Validation(_))
    )));

    let page = catalog
        .manager
        .get_applications(&alice, Filter::new(10, 0).with_search("Foo", true))
        .await
        .unwrap();
    assert_eq!(page.pagination.count, 1);
    assert_eq!(page.applications.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_creates_of_distinct_names_both_succeed() {
    let catalog = test_catalog(MockIdentityStore::new()).await;
    let alice = caller("alice");

    let (first, second) = tokio::join!(
        catalog.manager.create_application(&alice, new_application("Foo")),
        catalog.manager.create_application(&alice, new_application("Bar")),
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert_ne!(first.id, second.id);

    let page = catalog
        .manager
        .get_applications(&alice, Filter::new(10, 0))
        .await
        .unwrap();
    assert_eq!(page.pagination.count, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_creates_of_case_variant_names_keep_one_row() {
    let catalog = test_catalog(MockIdentityStore::new()).await;
    let alice = caller("alice");
    let mut ios = new_application("foo");
    ios.app_type = "ios".to_string();

    let (first, second) = tokio::join!(
        catalog.manager.create_application(&alice, new_application("Foo")),
        catalog.manager.create_application(&alice, ios),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|outcome| matches!(
        outcome,
        Err(ApplicationManagementError::Validation(_))
    )));

    let page = catalog
        .manager
        .get_applications(&alice, Filter::new(10, 0).with_search("foo", true))
        .await
        .unwrap();
    assert_eq!(page.pagination.count, 1);
}
