mod common;

use common::{open_test_db, seed_parents, Parent};
use entity_crud::{
    get, get_by_attribute, list, list_by_attribute, CrudError, Page, SqliteSession,
};

#[test]
fn list_with_default_page_returns_all_rows_in_insertion_order() {
    let conn = open_test_db();
    let session = SqliteSession::new(&conn);
    seed_parents(&session, 100);

    let parents = list::<Parent>(&session, Page::default()).unwrap();
    assert_eq!(parents.len(), 100);
    assert_eq!(parents[0].name, "parent_test_name_1");
    assert_eq!(parents[99].name, "parent_test_name_100");
}

#[test]
fn list_with_offset_and_limit_returns_matching_slice() {
    let conn = open_test_db();
    let session = SqliteSession::new(&conn);
    seed_parents(&session, 100);

    let all = list::<Parent>(&session, Page::new(0, 100)).unwrap();
    let page = list::<Parent>(&session, Page::new(50, 10)).unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page[0].name, "parent_test_name_51");
    assert_eq!(page[9].name, "parent_test_name_60");
    assert_eq!(page.as_slice(), &all[50..60]);
}

#[test]
fn list_past_the_end_or_with_zero_limit_is_empty() {
    let conn = open_test_db();
    let session = SqliteSession::new(&conn);
    seed_parents(&session, 5);

    assert!(list::<Parent>(&session, Page::new(5, 10)).unwrap().is_empty());
    assert!(list::<Parent>(&session, Page::new(0, 0)).unwrap().is_empty());
    assert_eq!(list::<Parent>(&session, Page::new(3, 10)).unwrap().len(), 2);
}

#[test]
fn get_returns_instance_by_identity_or_none() {
    let conn = open_test_db();
    let session = SqliteSession::new(&conn);
    let seeded = seed_parents(&session, 3);

    let loaded = get::<Parent>(&session, seeded[1].id).unwrap().unwrap();
    assert_eq!(loaded, seeded[1]);
    assert!(get::<Parent>(&session, 999).unwrap().is_none());
}

#[test]
fn get_by_attribute_returns_first_match_or_none() {
    let conn = open_test_db();
    let session = SqliteSession::new(&conn);
    seed_parents(&session, 30);

    let first = get_by_attribute::<Parent>(&session, "id_modulo", 3_i64)
        .unwrap()
        .unwrap();
    assert_eq!(first.name, "parent_test_name_3");

    let missing =
        get_by_attribute::<Parent>(&session, "name", "parent_test_name_404".to_string()).unwrap();
    assert!(missing.is_none());
}

#[test]
fn list_by_attribute_filters_then_paginates_in_identity_order() {
    let conn = open_test_db();
    let session = SqliteSession::new(&conn);
    seed_parents(&session, 100);

    let multiples = list_by_attribute::<Parent>(&session, "id_modulo", 0_i64, Page::default())
        .unwrap();
    let names: Vec<_> = multiples.iter().map(|parent| parent.name.clone()).collect();
    let expected: Vec<_> = (1..=10)
        .map(|i| format!("parent_test_name_{}", i * 10))
        .collect();
    assert_eq!(names, expected);
    assert!(multiples.windows(2).all(|pair| pair[0].id < pair[1].id));

    let second_page =
        list_by_attribute::<Parent>(&session, "id_modulo", 0_i64, Page::new(8, 5)).unwrap();
    assert_eq!(second_page.len(), 2);
    assert_eq!(second_page[0].name, "parent_test_name_90");
}

#[test]
fn lookups_by_unknown_attribute_fail() {
    let conn = open_test_db();
    let session = SqliteSession::new(&conn);
    seed_parents(&session, 2);

    let err = get_by_attribute::<Parent>(&session, "nickname", "x".to_string()).unwrap_err();
    assert!(matches!(
        &err,
        CrudError::UnknownAttribute { entity: "parent_1", attribute } if attribute == "nickname"
    ));
    assert!(err.is_attribute_error());

    let err = list_by_attribute::<Parent>(&session, "children", 1_i64, Page::default())
        .unwrap_err();
    assert!(matches!(err, CrudError::UnknownAttribute { .. }));
}
