//! Fragment builder behavior through the public API.

use factstore::models::{company, job, keyed_params, keyed_update_sql, user};
use factstore::{
    ColumnMap, Criteria, FilterRule, Payload, StoreError, Value, build_set_clause,
    build_where_clause,
};

fn placeholders(clause: &str) -> Vec<usize> {
    clause
        .split('$')
        .skip(1)
        .map(|rest| {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap()
        })
        .collect()
}

#[test]
fn set_clause_placeholders_are_one_through_k() {
    let payload: Payload = [
        ("firstName", Value::from("Aliya")),
        ("lastName", Value::from("Vaughn")),
        ("email", Value::from("a@v.io")),
        ("isAdmin", Value::Bool(false)),
    ]
    .into_iter()
    .collect();

    let set = build_set_clause(&payload, &user::COLUMNS).unwrap();
    assert_eq!(placeholders(set.clause()), [1, 2, 3, 4]);
    assert_eq!(set.values().len(), 4);
    assert_eq!(
        set.clause(),
        r#""first_name"=$1, "last_name"=$2, "email"=$3, "is_admin"=$4"#
    );
}

#[test]
fn documented_examples() {
    let mut payload = Payload::new();
    payload.set("numEmployees", 5);
    let set = build_set_clause(&payload, &ColumnMap::new(&[("numEmployees", "num_employees")]))
        .unwrap();
    assert_eq!(set.clause(), r#""num_employees"=$1"#);
    assert_eq!(set.values(), &[Value::Int(5)]);

    let mut payload = Payload::new();
    payload.set("logUrl", "x");
    let set = build_set_clause(&payload, &ColumnMap::empty()).unwrap();
    assert_eq!(set.clause(), r#""logUrl"=$1"#);
    assert_eq!(set.values(), &[Value::from("x")]);
}

#[test]
fn empty_payload_fails_before_sql() {
    let err = build_set_clause(&Payload::new(), &company::COLUMNS).unwrap_err();
    assert!(matches!(err, StoreError::NoData));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn where_placeholders_skip_literals() {
    let mut criteria = Criteria::new();
    criteria
        .set("titleLike", "g")
        .set("minSalary", 150)
        .set("hasEquity", true);

    let filter = build_where_clause(&criteria, job::FILTERS);
    assert_eq!(placeholders(filter.clause()), [1, 2]);
    assert_eq!(filter.values().len(), 2);
    assert!(!filter.clause().contains("WHERE"));
    assert!(!filter.clause().ends_with("AND"));
}

#[test]
fn where_with_nothing_usable_is_empty() {
    let filter = build_where_clause(&Criteria::new(), company::FILTERS);
    assert_eq!(filter.clause(), "");
    assert!(filter.values().is_empty());
}

#[test]
fn composite_update_binds_key_last() {
    let mut payload = Payload::new();
    payload.set("name", "New").set("description", "New Description");
    let set = build_set_clause(&payload, &company::COLUMNS).unwrap();

    let sql = keyed_update_sql("companies", &set, "handle", "handle");
    assert!(sql.contains("WHERE handle = $3"));

    let handle = "c1";
    let params = keyed_params(&set, &handle);
    assert_eq!(params.len(), set.values().len() + 1);

    let bound: Vec<String> = params.iter().map(|p| format!("{p:?}")).collect();
    assert_eq!(bound[0], format!("{:?}", Value::from("New")));
    assert_eq!(bound[1], format!("{:?}", Value::from("New Description")));
    assert_eq!(bound.last().map(String::as_str), Some(r#""c1""#));
}

#[test]
fn composite_filter_continuation() {
    const RULES: &[FilterRule] = &[
        FilterRule::gte("minEmployees", "num_employees"),
        FilterRule::contains("nameLike", "name"),
    ];

    let mut criteria = Criteria::new();
    criteria.set("nameLike", "net").set("minEmployees", 3);
    let filter = build_where_clause(&criteria, RULES);

    let sql = format!(
        "SELECT handle FROM companies WHERE {} LIMIT ${}",
        filter.clause(),
        filter.next_placeholder()
    );
    assert_eq!(
        sql,
        "SELECT handle FROM companies WHERE num_employees >= $1 AND name ILIKE $2 LIMIT $3"
    );
}

#[test]
fn builders_are_deterministic() {
    let mut payload = Payload::new();
    payload.set("logoUrl", "http://x").set("numEmployees", 9);
    assert_eq!(
        build_set_clause(&payload, &company::COLUMNS).unwrap(),
        build_set_clause(&payload, &company::COLUMNS).unwrap()
    );

    let mut criteria = Criteria::new();
    criteria.set("maxEmployees", 9).set("nameLike", "a");
    assert_eq!(
        build_where_clause(&criteria, company::FILTERS),
        build_where_clause(&criteria, company::FILTERS)
    );
}
