mod common;

use common::{first_user, open_session, seed_users, text, total_users, Setting, User};
use rusqlite::types::Value;
use tablekit_core::{DbError, Fetch, Operation, QuerySpec, ServiceError, Table, TableService};

#[test]
fn update_and_delete_scenario_on_two_rows() {
    let session = open_session();
    seed_users(
        &session,
        &[User::new(1, "a", 20, None), User::new(2, "b", 30, None)],
    );
    let service = TableService::<User>::new(&session);

    assert_eq!(total_users(&service), 2);

    let status = service.update(1, &[("name", text("z"))]);
    assert!(status.is_success());
    assert_eq!(status.operation(), Operation::Update);
    let updated = first_user(&service, User::id().eq(1)).unwrap();
    assert_eq!(updated.name, "z");

    assert!(service.delete(2).is_success());
    assert_eq!(total_users(&service), 1);
}

#[test]
fn create_then_read_returns_record_and_count_increments() {
    let session = open_session();
    let service = TableService::<User>::new(&session);
    assert_eq!(total_users(&service), 0);

    let user = User::new(7, "grace", 45, Some("navy"));
    let status = service.create(&user);
    assert!(status.is_success());
    assert_eq!(status.table(), "users");

    let loaded = first_user(&service, User::column("name").eq(text("grace"))).unwrap();
    assert_eq!(loaded, user);
    assert_eq!(total_users(&service), 1);
    assert!(!session.in_transaction());
}

#[test]
fn update_changes_only_named_fields() {
    let session = open_session();
    seed_users(&session, &[User::new(1, "ada", 36, Some("math"))]);
    let service = TableService::<User>::new(&session);

    service
        .update(1, &[("age", Value::Integer(37))])
        .into_result()
        .unwrap();

    let loaded = first_user(&service, User::id().eq(1)).unwrap();
    assert_eq!(loaded.age, 37);
    assert_eq!(loaded.name, "ada");
    assert_eq!(loaded.team.as_deref(), Some("math"));
}

#[test]
fn update_of_unknown_id_is_a_successful_noop() {
    let session = open_session();
    seed_users(&session, &[User::new(1, "ada", 36, None)]);
    let service = TableService::<User>::new(&session);

    assert!(service.update(99, &[("name", text("ghost"))]).is_success());
    assert_eq!(first_user(&service, User::id().eq(1)).unwrap().name, "ada");
}

#[test]
fn update_with_unknown_column_fails_and_leaves_no_transaction() {
    let session = open_session();
    seed_users(&session, &[User::new(1, "ada", 36, None)]);
    let service = TableService::<User>::new(&session);

    let err = service
        .update(1, &[("nickname", text("countess"))])
        .into_result()
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Db(DbError::UnknownColumn { table: "users", ref column }) if column == "nickname"
    ));
    assert!(!session.in_transaction());
}

#[test]
fn update_violating_constraint_rolls_back() {
    let session = open_session();
    seed_users(&session, &[User::new(1, "ada", 36, None)]);
    let service = TableService::<User>::new(&session);

    let status = service.update(1, &[("age", Value::Integer(40)), ("name", Value::Null)]);
    assert!(matches!(
        status.error(),
        Some(ServiceError::Db(DbError::Sqlite(_)))
    ));
    assert!(!session.in_transaction());

    let loaded = first_user(&service, User::id().eq(1)).unwrap();
    assert_eq!(loaded.age, 36);
    assert_eq!(loaded.name, "ada");
}

#[test]
fn delete_makes_record_unavailable() {
    let session = open_session();
    seed_users(
        &session,
        &[User::new(1, "a", 20, None), User::new(2, "b", 30, None)],
    );
    let service = TableService::<User>::new(&session);

    assert!(service.is_available(&User::id().eq(1)).into_result().unwrap());
    service.delete(1).into_result().unwrap();
    assert!(!service.is_available(&User::id().eq(1)).into_result().unwrap());
    assert!(service.is_available(&User::id().eq(2)).into_result().unwrap());
}

#[test]
fn delete_of_unknown_id_returns_not_found() {
    let session = open_session();
    seed_users(&session, &[User::new(1, "a", 20, None)]);
    let service = TableService::<User>::new(&session);

    let status = service.delete(42);
    assert_eq!(status.operation(), Operation::Delete);
    match status.into_result() {
        Err(ServiceError::NotFound { table, id }) => {
            assert_eq!(table, "users");
            assert_eq!(id, "42");
        }
        other => panic!("unexpected delete outcome: {other:?}"),
    }
    assert_eq!(total_users(&service), 1);
}

#[test]
fn is_available_signals_existence_not_uniqueness() {
    let session = open_session();
    seed_users(
        &session,
        &[
            User::new(1, "a", 20, Some("red")),
            User::new(2, "b", 30, Some("red")),
        ],
    );
    let service = TableService::<User>::new(&session);

    let team = User::column("team");
    assert!(service.is_available(&team.eq(text("red"))).into_result().unwrap());
    assert!(!service.is_available(&team.eq(text("blue"))).into_result().unwrap());
}

#[test]
fn custom_primary_key_drives_update_and_delete() {
    let session = open_session();
    let service = TableService::<Setting>::new(&session);
    let theme = Setting {
        key: "theme".to_string(),
        value: "dark".to_string(),
    };

    service.create(&theme).into_result().unwrap();
    service
        .update("theme".to_string(), &[("value", text("light"))])
        .into_result()
        .unwrap();

    let loaded = service
        .read(&QuerySpec::new().filter(Setting::id().eq(text("theme"))), Fetch::First)
        .into_result()
        .unwrap()
        .into_first()
        .and_then(|record| record.into_model())
        .unwrap();
    assert_eq!(loaded.value, "light");

    service.delete("theme".to_string()).into_result().unwrap();
    assert_eq!(service.count(None, &[]).into_result().unwrap(), 0);
}
