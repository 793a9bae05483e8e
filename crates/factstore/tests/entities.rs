//! Entity operations against a live database.
//!
//! Each test runs in its own schema on `DATABASE_URL_TEST` and is skipped
//! when that variable is unset.

mod common;

use common::{TestDb, hasher, new_company, new_user, seed};
use factstore::models::{
    Company, CompanyFilter, CompanyPatch, Job, JobFilter, JobPatch, NewJob, NewPost, NewTopic, Post,
    PostFilter, PostPatch, Topic, TopicFilter, TopicPatch, User, UserPatch,
};
use factstore::{StoreError, StoreResult};
use rust_decimal::Decimal;

#[tokio::test]
async fn company_lifecycle() -> StoreResult<()> {
    let Some(db) = TestDb::connect("company_lifecycle").await? else {
        return Ok(());
    };
    seed(&db.conn).await?;

    let dup = Company::create(&db.conn, new_company("c1", None)).await;
    assert!(matches!(dup, Err(StoreError::Duplicate(_))));

    let all = Company::find_all(&db.conn, &CompanyFilter::default()).await?;
    let handles: Vec<_> = all.iter().map(|c| c.handle.as_str()).collect();
    assert_eq!(handles, ["c1", "c2", "c3"]);

    let updated = Company::update(
        &db.conn,
        "c1",
        CompanyPatch {
            num_employees: Some(10),
            logo_url: Some("http://c1.img".into()),
            ..CompanyPatch::default()
        },
    )
    .await?;
    assert_eq!(updated.num_employees, Some(10));
    assert_eq!(updated.logo_url.as_deref(), Some("http://c1.img"));

    let missing = Company::update(
        &db.conn,
        "nope",
        CompanyPatch {
            name: Some("Nope".into()),
            ..CompanyPatch::default()
        },
    )
    .await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));

    let empty = Company::update(&db.conn, "c1", CompanyPatch::default()).await;
    assert!(matches!(empty, Err(StoreError::NoData)));

    Company::remove(&db.conn, "c3").await?;
    assert!(Company::get(&db.conn, "c3").await.unwrap_err().is_not_found());
    assert!(Company::remove(&db.conn, "c3").await.unwrap_err().is_not_found());

    db.finish().await
}

#[tokio::test]
async fn company_filters() -> StoreResult<()> {
    let Some(db) = TestDb::connect("company_filters").await? else {
        return Ok(());
    };
    seed(&db.conn).await?;

    let filter = CompanyFilter {
        min_employees: Some(2),
        max_employees: Some(3),
        name_like: None,
    };
    let found = Company::find_all(&db.conn, &filter).await?;
    let handles: Vec<_> = found.iter().map(|c| c.handle.as_str()).collect();
    assert_eq!(handles, ["c2", "c3"]);

    let filter = CompanyFilter {
        name_like: Some("C1".into()),
        ..CompanyFilter::default()
    };
    let found = Company::find_all(&db.conn, &filter).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].handle, "c1");

    let inverted = CompanyFilter {
        min_employees: Some(3),
        max_employees: Some(1),
        name_like: None,
    };
    assert!(matches!(
        Company::find_all(&db.conn, &inverted).await,
        Err(StoreError::Validation(_))
    ));

    db.finish().await
}

#[tokio::test]
async fn jobs_and_company_detail() -> StoreResult<()> {
    let Some(db) = TestDb::connect("jobs_and_company_detail").await? else {
        return Ok(());
    };
    seed(&db.conn).await?;
    let conn = &db.conn;

    let j1 = Job::create(
        conn,
        NewJob {
            title: "Engineer".into(),
            salary: Some(150),
            equity: Some(Decimal::new(1, 1)),
            company_handle: "c1".into(),
        },
    )
    .await?;
    Job::create(
        conn,
        NewJob {
            title: "Manager".into(),
            salary: Some(0),
            equity: Some(Decimal::ZERO),
            company_handle: "c1".into(),
        },
    )
    .await?;
    Job::create(
        conn,
        NewJob {
            title: "Designer".into(),
            salary: None,
            equity: None,
            company_handle: "c2".into(),
        },
    )
    .await?;

    let dup = Job::create(
        conn,
        NewJob {
            title: "Engineer".into(),
            salary: Some(1),
            equity: None,
            company_handle: "c1".into(),
        },
    )
    .await;
    assert!(matches!(dup, Err(StoreError::Duplicate(_))));

    let filter = JobFilter {
        min_salary: Some(0),
        has_equity: Some(true),
        title_like: Some("g".into()),
    };
    let found = Job::find_all(conn, &filter).await?;
    let titles: Vec<_> = found.iter().map(|j| j.title.as_str()).collect();
    assert_eq!(titles, ["Engineer"]);

    let all = Job::find_all(conn, &JobFilter::default()).await?;
    assert_eq!(all.len(), 3);

    let detail = Company::get(conn, "c1").await?;
    assert_eq!(detail.company.handle, "c1");
    assert_eq!(detail.jobs.len(), 2);

    let moved = Job::update(
        conn,
        j1.id,
        JobPatch {
            company_handle: Some("c2".into()),
            ..JobPatch::default()
        },
    )
    .await?;
    assert_eq!(moved.id, j1.id);
    assert_eq!(moved.company_handle, "c2");

    Job::remove(conn, j1.id).await?;
    assert!(Job::get(conn, j1.id).await.unwrap_err().is_not_found());

    db.finish().await
}

#[tokio::test]
async fn posts_and_topics() -> StoreResult<()> {
    let Some(db) = TestDb::connect("posts_and_topics").await? else {
        return Ok(());
    };
    seed(&db.conn).await?;

    let post = Post::create(
        &db.conn,
        NewPost {
            username: "u1".into(),
            topic_name: "space".into(),
            content: "The moon is made of rock".into(),
        },
    )
    .await?;
    assert_eq!(post.topic_name, "space");

    let filter = PostFilter {
        content_like: Some("MOON".into()),
        ..PostFilter::default()
    };
    assert_eq!(Post::find_all(&db.conn, &filter).await?.len(), 1);

    let filter = PostFilter {
        username: Some("admin".into()),
        ..PostFilter::default()
    };
    assert!(Post::find_all(&db.conn, &filter).await?.is_empty());

    let edited = Post::update(
        &db.conn,
        post.id,
        PostPatch {
            content: Some("The moon is rock".into()),
            ..PostPatch::default()
        },
    )
    .await?;
    assert_eq!(edited.content, "The moon is rock");

    let dup = Topic::create(&db.conn, NewTopic { name: "space".into() }).await;
    assert!(matches!(dup, Err(StoreError::Duplicate(_))));

    let topics = Topic::find_all(
        &db.conn,
        &TopicFilter {
            name_like: Some("pa".into()),
        },
    )
    .await?;
    assert_eq!(topics.len(), 1);

    let renamed = Topic::update(
        &db.conn,
        "space",
        TopicPatch {
            name: Some("astronomy".into()),
        },
    )
    .await?;
    assert_eq!(renamed.name, "astronomy");

    let detail = Topic::get(&db.conn, "astronomy").await?;
    assert_eq!(detail.posts.len(), 1);
    assert_eq!(detail.posts[0].topic_name, "astronomy");

    Post::remove(&db.conn, post.id).await?;
    assert!(Post::get(&db.conn, post.id).await.unwrap_err().is_not_found());

    Topic::remove(&db.conn, "astronomy").await?;
    assert!(Topic::get(&db.conn, "astronomy").await.unwrap_err().is_not_found());

    db.finish().await
}

#[tokio::test]
async fn users_register_authenticate_update() -> StoreResult<()> {
    let Some(db) = TestDb::connect("users_register_authenticate_update").await? else {
        return Ok(());
    };
    seed(&db.conn).await?;
    let hasher = hasher();

    let dup = User::register(&db.conn, &hasher, new_user("u1", false)).await;
    assert!(matches!(dup, Err(StoreError::Duplicate(_))));

    let user = User::authenticate(&db.conn, &hasher, "u1", "password1").await?;
    assert_eq!(user.username, "u1");
    assert!(!user.is_admin);

    let wrong = User::authenticate(&db.conn, &hasher, "u1", "nope").await;
    assert!(matches!(wrong, Err(StoreError::Unauthorized(_))));
    let unknown = User::authenticate(&db.conn, &hasher, "ghost", "password1").await;
    assert!(matches!(unknown, Err(StoreError::Unauthorized(_))));

    let updated = User::update(
        &db.conn,
        &hasher,
        "u1",
        UserPatch {
            first_name: Some("New".into()),
            password: Some("password2".into()),
            ..UserPatch::default()
        },
    )
    .await?;
    assert_eq!(updated.first_name, "New");
    assert!(User::authenticate(&db.conn, &hasher, "u1", "password2").await.is_ok());

    let all = User::find_all(&db.conn).await?;
    let names: Vec<_> = all.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, ["admin", "u1"]);

    User::remove(&db.conn, "u1").await?;
    assert!(User::get(&db.conn, "u1").await.unwrap_err().is_not_found());

    db.finish().await
}
