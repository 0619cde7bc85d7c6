use course_portal::{
    PostgresRepository,
    models::{Account, Course, Role},
    repository::{AccountRepository, CourseRepository, RepoError},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the pool for a migrated test database. These tests need a live
/// Postgres; without `DATABASE_URL` they are skipped.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres integration test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        PostgresRepository::new(pool.clone())
            .migrate()
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Unique handle so reruns against the same database never collide.
fn handle(prefix: &str) -> String {
    format!("{prefix}-{}@test.com", Uuid::new_v4())
}

async fn create_account(repo: &PostgresRepository, role: Role) -> Account {
    let account = Account::new("Integration User", role, handle(role.as_str()));
    repo.insert(&account, "$2b$04$placeholderplaceholderplaceholderplaceholderpl")
        .await
        .expect("Failed to insert test account");
    account
}

async fn create_course(repo: &PostgresRepository, owner: &Account, name: &str) -> Course {
    let course = Course {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: "integration".to_string(),
        price: 5.0,
        author: owner.fullname.clone(),
        author_id: owner.id,
        ..Course::default()
    };
    repo.create(&course).await.expect("Failed to create course");
    course
}

// --- Tests ---

#[tokio::test]
async fn test_account_round_trip_and_duplicate_handle() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    let account = create_account(&repo, Role::Learner).await;

    let by_handle = repo.find_by_handle(&account.username).await.unwrap().unwrap();
    assert_eq!(by_handle.id, account.id);
    assert_eq!(by_handle.role, Role::Learner);

    let credential = repo.find_credential(&account.username).await.unwrap().unwrap();
    assert_eq!(credential.account.id, account.id);
    assert!(credential.password_hash.starts_with("$2b$"));

    let clash = Account::new("Someone Else", Role::Instructor, account.username.clone());
    let result = repo.insert(&clash, "hash").await;
    assert!(matches!(result, Err(RepoError::DuplicateHandle(_))));
}

#[tokio::test]
async fn test_membership_lists_keep_duplicates() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    let owner = create_account(&repo, Role::Instructor).await;
    let learner = create_account(&repo, Role::Learner).await;
    let course = create_course(&repo, &owner, "Compilers").await;

    for _ in 0..2 {
        repo.append_course(learner.id, course.id).await.unwrap();
        repo.append_student(course.id, learner.id).await.unwrap();
    }

    let stored_learner = AccountRepository::find_by_id(&repo, learner.id)
        .await
        .unwrap()
        .unwrap();
    let stored_course = CourseRepository::find_by_id(&repo, course.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_learner.courses, vec![course.id, course.id]);
    assert_eq!(stored_course.students, vec![learner.id, learner.id]);

    let listed = repo.find_by_ids(&stored_learner.courses).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_name_search_is_case_insensitive_and_literal() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    let owner = create_account(&repo, Role::Instructor).await;
    let tag = Uuid::new_v4().simple().to_string();
    let plain = create_course(&repo, &owner, &format!("Graph Theory {tag}")).await;
    let percent = create_course(&repo, &owner, &format!("100% Graphs {tag}")).await;

    let hits = repo
        .find_by_name_contains(&format!("graph theory {tag}"))
        .await
        .unwrap();
    assert_eq!(hits.iter().map(|c| c.id).collect::<Vec<_>>(), vec![plain.id]);

    let hits = repo.find_by_name_contains("100%").await.unwrap();
    assert!(hits.iter().any(|c| c.id == percent.id));
    assert!(hits.iter().all(|c| c.name.contains("100%")));
}

#[tokio::test]
async fn test_append_to_missing_record_is_not_found() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    let ghost = Uuid::new_v4();
    let result = repo.append_course(ghost, Uuid::new_v4()).await;

    assert!(matches!(result, Err(RepoError::NotFound(id)) if id == ghost));
}

#[tokio::test]
async fn test_concurrent_appends_keep_every_learner() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    let owner = create_account(&repo, Role::Instructor).await;
    let course = create_course(&repo, &owner, "Databases").await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let (first, second) = tokio::join!(
        repo.append_student(course.id, a),
        repo.append_student(course.id, b),
    );
    first.unwrap();
    second.unwrap();

    let stored = CourseRepository::find_by_id(&repo, course.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.students.len(), 2);
}
