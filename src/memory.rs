use crate::{
    models::{Account, Course, Credential},
    repository::{AccountRepository, CourseRepository, RepoError},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// InMemoryRepository
///
/// A process-local implementation of both repositories. Used by the test
/// suites and by `STORE=memory` local runs. Calling [`set_failing`] makes every
/// operation return `RepoError::Unavailable`, which simulates a store outage.
///
/// [`set_failing`]: InMemoryRepository::set_failing
#[derive(Default)]
pub struct InMemoryRepository {
    accounts: RwLock<HashMap<Uuid, Credential>>,
    courses: RwLock<HashMap<Uuid, Course>>,
    failing: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        let repo = Self::default();
        repo.set_failing(true);
        repo
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn course_count(&self) -> usize {
        self.courses.read().await.len()
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryRepository {
    async fn insert(&self, account: &Account, password_hash: &str) -> Result<(), RepoError> {
        self.check()?;
        let mut accounts = self.accounts.write().await;
        if accounts
            .values()
            .any(|c| c.account.username == account.username)
        {
            return Err(RepoError::DuplicateHandle(account.username.clone()));
        }
        accounts.insert(
            account.id,
            Credential {
                account: account.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepoError> {
        self.check()?;
        Ok(self
            .accounts
            .read()
            .await
            .get(&id)
            .map(|c| c.account.clone()))
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>, RepoError> {
        Ok(self.find_credential(handle).await?.map(|c| c.account))
    }

    async fn find_credential(&self, handle: &str) -> Result<Option<Credential>, RepoError> {
        self.check()?;
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|c| c.account.username == handle)
            .cloned())
    }

    async fn append_course(&self, account_id: Uuid, course_id: Uuid) -> Result<Account, RepoError> {
        self.check()?;
        let mut accounts = self.accounts.write().await;
        let stored = accounts
            .get_mut(&account_id)
            .ok_or(RepoError::NotFound(account_id))?;
        stored.account.courses.push(course_id);
        Ok(stored.account.clone())
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn create(&self, course: &Course) -> Result<(), RepoError> {
        self.check()?;
        self.courses.write().await.insert(course.id, course.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>, RepoError> {
        self.check()?;
        Ok(self.courses.read().await.get(&id).cloned())
    }

    async fn find_by_name_contains(&self, text: &str) -> Result<Vec<Course>, RepoError> {
        self.check()?;
        let needle = text.to_lowercase();
        let mut found: Vec<Course> = self
            .courses
            .read()
            .await
            .values()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Course>, RepoError> {
        self.check()?;
        let courses = self.courses.read().await;
        let mut found: Vec<Course> = courses
            .values()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn append_student(&self, course_id: Uuid, learner_id: Uuid) -> Result<Course, RepoError> {
        self.check()?;
        let mut courses = self.courses.write().await;
        let stored = courses
            .get_mut(&course_id)
            .ok_or(RepoError::NotFound(course_id))?;
        stored.students.push(learner_id);
        Ok(stored.clone())
    }
}
