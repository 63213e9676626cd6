//! Integration tests for the composite user DAO on MySQL.
//!
//! These tests run against a real MySQL database using testcontainers and
//! need Docker, so they are ignored by default:
//! `cargo test -p tenantry-repository -- --ignored`.

mod common;

use common::TestDatabase;
use serde_json::json;
use tenantry_core::{FieldMap, Record, Role};
use tenantry_repository::{
    Aspect, AspectStatus, CompositeUserDao, DatabasePoolInterface, Mutation, Session, UserDao,
};

fn payload(value: serde_json::Value) -> FieldMap {
    value.as_object().cloned().expect("payload must be an object")
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_create_composite_round_trips_through_mysql() {
    let db = TestDatabase::new().await;
    let dao = CompositeUserDao::default();
    let mut session = db.pool().session();

    let response = dao
        .create_composite(
            &mut session,
            &payload(json!({
                "email": "a@b.com",
                "first_name": "A",
                "user_auth_info": { "verified": true },
                "address": { "street": "1 Main St" }
            })),
        )
        .await;

    assert!(response.success, "{:?}", response.error);
    let composite = response.into_data().unwrap();
    assert!(composite
        .aspects
        .iter()
        .any(|o| o.aspect == Aspect::Address && o.status == AspectStatus::Applied));
    assert!(composite.user.verified);
    assert_eq!(composite.user.addresses.len(), 1);
    assert_eq!(composite.user.addresses[0].street.as_deref(), Some("1 Main St"));

    let mut fresh = db.pool().session();
    let found = dao.get(&mut fresh, &composite.user.key()).await;
    assert_eq!(found.data().unwrap().addresses, composite.user.addresses);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_duplicate_email_is_rejected() {
    let db = TestDatabase::new().await;
    let dao = CompositeUserDao::default();
    let mut session = db.pool().session();
    let input = payload(json!({ "email": "dup@b.com" }));

    let first = dao.create_composite(&mut session, &input).await;
    let second = dao.create_composite(&mut session, &input).await;

    assert!(first.success);
    assert_eq!(second.error.as_deref(), Some("User already exists"));
    assert_eq!(second.into_data().unwrap().user, first.into_data().unwrap().user);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unique_index_rejects_concurrent_duplicate() {
    let db = TestDatabase::new().await;
    let users = tenantry_repository::RecordStore::<tenantry_core::User>::new();
    let mut first = db.pool().session();
    let mut second = db.pool().session();

    users
        .create(&mut first, payload(json!({ "email": "race@b.com" })))
        .await
        .unwrap();
    let err = users
        .create(&mut second, payload(json!({ "email": "race@b.com" })))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "ALREADY_EXISTS");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_link_role_on_mysql() {
    let db = TestDatabase::new().await;
    let dao = CompositeUserDao::default();
    let mut session = db.pool().session();
    session
        .stage(Mutation::insert(&Role::new("admin", Some("Administrator"))).unwrap())
        .await
        .unwrap();
    session.commit().await.unwrap();
    let user = dao
        .create_composite(&mut session, &payload(json!({ "email": "r@b.com" })))
        .await
        .into_data()
        .unwrap()
        .user;

    let first = dao.link_role(&mut session, &user.key(), "admin").await;
    let second = dao.link_role(&mut session, &user.key(), "admin").await;

    assert!(first.data().unwrap().has_role("admin"));
    assert_eq!(second.error.as_deref(), Some("Role already exists for the user"));

    let deleted = dao.delete(&mut session, &user.key()).await;
    assert!(deleted.success);
    assert!(db.pool().health_check().await.is_ok());
}
