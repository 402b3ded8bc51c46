mod common;

use std::sync::Arc;

use common::{FailingBackend, Harness};
use userdir::application::categories::{
    CategoryServiceError, CreateCategoryCommand, UpdateCategoryCommand,
};
use userdir::application::pagination::PageRequest;
use userdir::application::users::{CreateUserCommand, UpdateUserCommand, UserServiceError};
use userdir::cache::{CacheBackend, list_key, single_key};
use userdir::domain::types::{EntityKind, FieldUpdate};
use uuid::Uuid;

fn new_user(name: &str, email: &str) -> CreateUserCommand {
    CreateUserCommand {
        name: name.into(),
        email: email.into(),
        password: "secret".into(),
        category_user_id: None,
    }
}

fn rename(id: Uuid, name: &str) -> UpdateUserCommand {
    UpdateUserCommand {
        id,
        name: FieldUpdate::Set(name.into()),
        email: FieldUpdate::Unchanged,
        password: FieldUpdate::Unchanged,
        category_user_id: FieldUpdate::Unchanged,
    }
}

fn new_category(name: &str) -> CreateCategoryCommand {
    CreateCategoryCommand {
        name: name.into(),
        description: Some("Employees".into()),
    }
}

fn first_page() -> PageRequest {
    PageRequest::new(1, 10).expect("valid page")
}

#[tokio::test]
async fn repeated_reads_are_served_from_cache() {
    let (harness, _) = Harness::with_memory();
    let user = harness
        .users
        .create(new_user("Alice", "alice@example.com"))
        .await
        .unwrap();

    let first = harness.users.get_by_id(user.id).await.unwrap();
    let second = harness.users.get_by_id(user.id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(harness.store.user_reads(), 1);
}

#[tokio::test]
async fn read_after_update_never_sees_previous_value() {
    let (harness, _) = Harness::with_memory();
    let user = harness
        .users
        .create(new_user("Alice", "alice@example.com"))
        .await
        .unwrap();

    let cached = harness.users.get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(cached.name, "Alice");

    harness
        .users
        .update(rename(user.id, "Alicia"))
        .await
        .unwrap()
        .expect("row exists");

    let fresh = harness.users.get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(fresh.name, "Alicia");
}

#[tokio::test]
async fn read_after_delete_reports_absent() {
    let (harness, backend) = Harness::with_memory();
    let user = harness
        .users
        .create(new_user("Alice", "alice@example.com"))
        .await
        .unwrap();
    harness.users.get_by_id(user.id).await.unwrap();
    assert!(
        backend
            .keys()
            .contains(&single_key(EntityKind::User, user.id).as_str().to_string())
    );

    assert!(harness.users.delete(user.id).await.unwrap());

    assert!(harness.users.get_by_id(user.id).await.unwrap().is_none());
    assert!(matches!(
        harness.users.delete(user.id).await,
        Err(UserServiceError::NotFound)
    ));
}

#[tokio::test]
async fn list_total_reflects_create() {
    let (harness, _) = Harness::with_memory();
    harness
        .users
        .create(new_user("Alice", "alice@example.com"))
        .await
        .unwrap();

    let before = harness.users.list(first_page()).await.unwrap();
    assert_eq!(before.pagination.total, 1);
    // Cached now; a second read must not reach the store.
    harness.users.list(first_page()).await.unwrap();
    assert_eq!(harness.store.user_list_reads(), 1);

    harness
        .users
        .create(new_user("Bob", "bob@example.com"))
        .await
        .unwrap();

    let after = harness.users.list(first_page()).await.unwrap();
    assert_eq!(after.pagination.total, 2);
    assert_eq!(after.pagination.total_pages, 1);
    assert_eq!(after.data.len(), 2);
}

#[tokio::test]
async fn category_read_after_update_never_sees_previous_value() {
    let (harness, _) = Harness::with_memory();
    let category = harness
        .categories
        .create(new_category("Staff"))
        .await
        .unwrap();

    let cached = harness.categories.get_by_id(category.id).await.unwrap().unwrap();
    assert_eq!(cached.name, "Staff");
    harness.categories.get_by_id(category.id).await.unwrap();
    assert_eq!(harness.store.category_reads(), 1);

    harness
        .categories
        .update(UpdateCategoryCommand {
            id: category.id,
            name: FieldUpdate::Set("Ops".into()),
            description: FieldUpdate::Unchanged,
        })
        .await
        .unwrap()
        .expect("row exists");

    let fresh = harness.categories.get_by_id(category.id).await.unwrap().unwrap();
    assert_eq!(fresh.name, "Ops");
    assert_eq!(fresh.description.as_deref(), Some("Employees"));
}

#[tokio::test]
async fn category_list_total_reflects_create() {
    let (harness, _) = Harness::with_memory();

    let before = harness.categories.list(first_page()).await.unwrap();
    assert_eq!(before.pagination.total, 0);
    harness.categories.list(first_page()).await.unwrap();
    assert_eq!(harness.store.category_list_reads(), 1);

    harness
        .categories
        .create(new_category("Staff"))
        .await
        .unwrap();

    let after = harness.categories.list(first_page()).await.unwrap();
    assert_eq!(after.pagination.total, 1);
    assert_eq!(after.data[0].name, "Staff");
    assert_eq!(harness.store.category_list_reads(), 2);
}

#[tokio::test]
async fn missing_ids_are_not_cached() {
    let (harness, backend) = Harness::with_memory();
    let id = Uuid::new_v4();

    assert!(harness.users.get_by_id(id).await.unwrap().is_none());
    assert!(harness.users.get_by_id(id).await.unwrap().is_none());

    assert_eq!(harness.store.user_reads(), 2);
    assert!(backend.is_empty());
}

#[tokio::test]
async fn cache_outage_degrades_to_store_reads() {
    let harness = Harness::failing();

    let category = harness
        .categories
        .create(CreateCategoryCommand {
            name: "Staff".into(),
            description: None,
        })
        .await
        .unwrap();
    let user = harness
        .users
        .create(CreateUserCommand {
            category_user_id: Some(category.id),
            ..new_user("Alice", "alice@example.com")
        })
        .await
        .unwrap();

    let fetched = harness.users.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.as_ref().map(|u| u.id), Some(user.id));
    harness.users.get_by_id(user.id).await.unwrap();
    assert_eq!(harness.store.user_reads(), 2);

    let page = harness.users.list(first_page()).await.unwrap();
    assert_eq!(page.pagination.total, 1);

    let updated = harness
        .users
        .update(rename(user.id, "Alicia"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Alicia");
    assert!(harness.users.delete(user.id).await.unwrap());
    assert!(harness.categories.delete(category.id).await.unwrap());
}

#[tokio::test]
async fn admin_operations_report_cache_outage() {
    let harness = Harness::failing();

    assert!(harness.cache.flush_all().await.is_err());
    assert!(harness.cache.invalidate_kind(EntityKind::User).await.is_err());
}

#[tokio::test]
async fn duplicate_email_conflicts_regardless_of_cache() {
    for harness in [Harness::with_memory().0, Harness::failing()] {
        harness
            .users
            .create(new_user("Alice", "a@x.com"))
            .await
            .unwrap();

        let second = harness.users.create(new_user("Another", "a@x.com")).await;
        assert!(matches!(
            second,
            Err(UserServiceError::Conflict { field: "email" })
        ));
        let page = harness.users.list(first_page()).await.unwrap();
        assert_eq!(page.pagination.total, 1);
    }
}

#[tokio::test]
async fn unique_lookup_bypasses_cache() {
    let (harness, backend) = Harness::with_memory();

    let before = harness.users.list(first_page()).await.unwrap();
    let user = harness
        .users
        .create(new_user("A", "a@x.com"))
        .await
        .unwrap();

    let keys_before_lookup = backend.len();
    let found = harness.users.get_by_email("a@x.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
    assert_eq!(backend.len(), keys_before_lookup);

    let after = harness.users.list(first_page()).await.unwrap();
    assert_ne!(before.pagination.total, after.pagination.total);
}

#[tokio::test]
async fn unknown_category_reference_is_rejected() {
    let (harness, _) = Harness::with_memory();

    let result = harness
        .users
        .create(CreateUserCommand {
            category_user_id: Some(Uuid::new_v4()),
            ..new_user("Alice", "alice@example.com")
        })
        .await;

    assert!(matches!(
        result,
        Err(UserServiceError::InvalidReference { .. })
    ));
    assert_eq!(harness.users.list(first_page()).await.unwrap().pagination.total, 0);
}

#[tokio::test]
async fn category_writes_leave_user_caches_alone() {
    let (harness, backend) = Harness::with_memory();
    let user = harness
        .users
        .create(new_user("Alice", "alice@example.com"))
        .await
        .unwrap();
    harness.users.get_by_id(user.id).await.unwrap();
    harness.users.list(first_page()).await.unwrap();

    let category = harness
        .categories
        .create(CreateCategoryCommand {
            name: "Staff".into(),
            description: Some("Employees".into()),
        })
        .await
        .unwrap();
    harness
        .categories
        .update(UpdateCategoryCommand {
            id: category.id,
            name: FieldUpdate::Unchanged,
            description: FieldUpdate::Set(None),
        })
        .await
        .unwrap();

    let keys = backend.keys();
    assert!(keys.contains(&single_key(EntityKind::User, user.id).as_str().to_string()));
    assert!(keys.contains(&list_key(EntityKind::User, 1, 10).as_str().to_string()));
}

#[tokio::test]
async fn category_delete_drops_user_entries_that_referenced_it() {
    let (harness, _) = Harness::with_memory();
    let category = harness
        .categories
        .create(CreateCategoryCommand {
            name: "Staff".into(),
            description: None,
        })
        .await
        .unwrap();
    let user = harness
        .users
        .create(CreateUserCommand {
            category_user_id: Some(category.id),
            ..new_user("Alice", "alice@example.com")
        })
        .await
        .unwrap();

    let cached = harness.users.get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(cached.category_user_id, Some(category.id));
    let members = harness
        .users
        .list_by_category(category.id, first_page())
        .await
        .unwrap();
    assert_eq!(members.pagination.total, 1);

    assert!(harness.categories.delete(category.id).await.unwrap());

    let fresh = harness.users.get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(fresh.category_user_id, None);
    let members = harness
        .users
        .list_by_category(category.id, first_page())
        .await
        .unwrap();
    assert_eq!(members.pagination.total, 0);
}

#[tokio::test]
async fn moving_a_user_refreshes_category_member_pages() {
    let (harness, _) = Harness::with_memory();
    let category = harness
        .categories
        .create(CreateCategoryCommand {
            name: "Staff".into(),
            description: None,
        })
        .await
        .unwrap();
    let user = harness
        .users
        .create(new_user("Alice", "alice@example.com"))
        .await
        .unwrap();

    let empty = harness
        .users
        .list_by_category(category.id, first_page())
        .await
        .unwrap();
    assert_eq!(empty.pagination.total, 0);

    harness
        .users
        .update(UpdateUserCommand {
            category_user_id: FieldUpdate::Set(Some(category.id)),
            ..rename(user.id, "Alice")
        })
        .await
        .unwrap();

    let members = harness
        .users
        .list_by_category(category.id, first_page())
        .await
        .unwrap();
    assert_eq!(members.data.len(), 1);
}

#[tokio::test]
async fn category_name_conflicts_and_missing_updates() {
    let (harness, _) = Harness::with_memory();
    harness
        .categories
        .create(CreateCategoryCommand {
            name: "Staff".into(),
            description: None,
        })
        .await
        .unwrap();

    let duplicate = harness
        .categories
        .create(CreateCategoryCommand {
            name: " Staff ".into(),
            description: None,
        })
        .await;
    assert!(matches!(
        duplicate,
        Err(CategoryServiceError::Conflict { field: "name" })
    ));

    let missing = harness
        .categories
        .update(UpdateCategoryCommand {
            id: Uuid::new_v4(),
            name: FieldUpdate::Set("Other".into()),
            description: FieldUpdate::Unchanged,
        })
        .await;
    assert!(matches!(missing, Err(CategoryServiceError::NotFound)));
}

#[tokio::test]
async fn store_errors_propagate_and_are_not_cached() {
    let (harness, backend) = Harness::with_memory();
    harness.store.set_unavailable(true);

    assert!(matches!(
        harness.users.list(first_page()).await,
        Err(UserServiceError::Repo(_))
    ));
    assert!(backend.is_empty());

    harness.store.set_unavailable(false);
    let page = harness.users.list(first_page()).await.unwrap();
    assert_eq!(page.pagination.total, 0);
}

#[tokio::test]
async fn invalidate_kind_only_touches_that_family() {
    let (harness, backend) = Harness::with_memory();
    let user = harness
        .users
        .create(new_user("Alice", "alice@example.com"))
        .await
        .unwrap();
    let category = harness
        .categories
        .create(CreateCategoryCommand {
            name: "Staff".into(),
            description: None,
        })
        .await
        .unwrap();
    harness.users.get_by_id(user.id).await.unwrap();
    harness.users.list(first_page()).await.unwrap();
    harness.categories.get_by_id(category.id).await.unwrap();

    let removed = harness
        .cache
        .invalidate_kind(EntityKind::User)
        .await
        .unwrap();

    assert_eq!(removed, 2);
    assert_eq!(
        backend.keys(),
        vec![single_key(EntityKind::Category, category.id).as_str().to_string()]
    );

    harness.cache.flush_all().await.unwrap();
    assert!(backend.is_empty());
}

#[tokio::test]
async fn failing_backend_reports_its_name() {
    let backend = FailingBackend;
    assert_eq!(backend.name(), "failing");
    let harness = Harness::with_backend(Arc::new(FailingBackend));
    assert_eq!(harness.cache.backend_name(), "failing");
}
