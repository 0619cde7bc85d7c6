use crate::models::{Account, Course, Credential};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// RepoError
///
/// Failure modes shared by every store implementation.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The login handle is already taken.
    #[error("login handle `{0}` is already registered")]
    DuplicateHandle(String),
    /// An update targeted a record that does not exist.
    #[error("record {0} not found")]
    NotFound(Uuid),
    /// The in-memory store was switched into failing mode.
    #[error("store unavailable")]
    Unavailable,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// AccountRepository
///
/// Persistence contract for accounts and their credential hash. Handlers never
/// call this directly for authentication; they go through
/// [`crate::credentials::CredentialStore`].
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Inserts a new account. Fails with `DuplicateHandle` if the username exists.
    async fn insert(&self, account: &Account, password_hash: &str) -> Result<(), RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepoError>;
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>, RepoError>;
    /// Loads the account together with its stored hash.
    async fn find_credential(&self, handle: &str) -> Result<Option<Credential>, RepoError>;
    /// Appends `course_id` to the account's course list in a single write and
    /// returns the updated account. Duplicates are kept.
    async fn append_course(&self, account_id: Uuid, course_id: Uuid) -> Result<Account, RepoError>;
}

/// CourseRepository
///
/// Persistence contract for courses and their membership lists.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, course: &Course) -> Result<(), RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>, RepoError>;
    /// Case-insensitive substring match on the course name, newest first.
    async fn find_by_name_contains(&self, text: &str) -> Result<Vec<Course>, RepoError>;
    /// Each matching course once, regardless of duplicates in `ids`.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Course>, RepoError>;
    /// Appends `learner_id` to the course's student list in a single write and
    /// returns the updated course. Duplicates are kept.
    async fn append_student(&self, course_id: Uuid, learner_id: Uuid) -> Result<Course, RepoError>;
}

pub type AccountRepositoryState = Arc<dyn AccountRepository>;
pub type CourseRepositoryState = Arc<dyn CourseRepository>;

/// PostgresRepository
///
/// Implements both repositories on a shared connection pool. Queries are
/// built at runtime so the crate compiles without a live database.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations under `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

const ACCOUNT_COLUMNS: &str = "id, fullname, role, username, courses, created_at";
const COURSE_COLUMNS: &str =
    "id, name, description, price, author, author_id, students, created_at";

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    account: Account,
    password_hash: String,
}

#[async_trait]
impl AccountRepository for PostgresRepository {
    async fn insert(&self, account: &Account, password_hash: &str) -> Result<(), RepoError> {
        let result = sqlx::query(
            "INSERT INTO accounts (id, fullname, role, username, password_hash, courses, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(account.id)
        .bind(&account.fullname)
        .bind(account.role.as_str())
        .bind(&account.username)
        .bind(password_hash)
        .bind(&account.courses)
        .bind(account.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(RepoError::DuplicateHandle(account.username.clone()))
            }
            Err(e) => {
                tracing::error!("insert account error: {:?}", e);
                Err(e.into())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepoError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>, RepoError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_credential(&self, handle: &str) -> Result<Option<Credential>, RepoError> {
        let query =
            format!("SELECT {ACCOUNT_COLUMNS}, password_hash FROM accounts WHERE username = $1");
        let row = sqlx::query_as::<_, CredentialRow>(&query)
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Credential {
            account: r.account,
            password_hash: r.password_hash,
        }))
    }

    async fn append_course(&self, account_id: Uuid, course_id: Uuid) -> Result<Account, RepoError> {
        let query = format!(
            "UPDATE accounts SET courses = array_append(courses, $2) WHERE id = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(account_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound(account_id))
    }
}

#[async_trait]
impl CourseRepository for PostgresRepository {
    async fn create(&self, course: &Course) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO courses (id, name, description, price, author, author_id, students, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(course.id)
        .bind(&course.name)
        .bind(&course.description)
        .bind(course.price)
        .bind(&course.author)
        .bind(course.author_id)
        .bind(&course.students)
        .bind(course.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("create course error: {:?}", e);
            RepoError::from(e)
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>, RepoError> {
        let query = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        Ok(sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Escapes LIKE wildcards so the search text matches literally.
    async fn find_by_name_contains(&self, text: &str) -> Result<Vec<Course>, RepoError> {
        let escaped = text
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);
        let query = format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE name ILIKE $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Course>(&query)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Course>, RepoError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let query = format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = ANY($1) ORDER BY created_at ASC"
        );
        Ok(sqlx::query_as::<_, Course>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn append_student(&self, course_id: Uuid, learner_id: Uuid) -> Result<Course, RepoError> {
        let query = format!(
            "UPDATE courses SET students = array_append(students, $2) WHERE id = $1 \
             RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(course_id)
            .bind(learner_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound(course_id))
    }
}
