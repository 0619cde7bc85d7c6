use crate::{
    models::Account,
    repository::{AccountRepositoryState, RepoError},
};
use uuid::Uuid;

/// CredentialError
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("login handle `{0}` is already registered")]
    DuplicateHandle(String),
    /// Unknown handle or wrong password. The two are not distinguished.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Repository(RepoError),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl From<RepoError> for CredentialError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::DuplicateHandle(handle) => CredentialError::DuplicateHandle(handle),
            other => CredentialError::Repository(other),
        }
    }
}

/// CredentialStore
///
/// Registers and authenticates accounts. Wraps an [`AccountRepository`] and
/// owns the hashing policy, so account records themselves stay plain data.
///
/// [`AccountRepository`]: crate::repository::AccountRepository
#[derive(Clone)]
pub struct CredentialStore {
    accounts: AccountRepositoryState,
    cost: u32,
}

impl CredentialStore {
    pub fn new(accounts: AccountRepositoryState, cost: u32) -> Self {
        Self { accounts, cost }
    }

    /// Hashes `raw_password` and persists `account`. The uniqueness check is
    /// done up front and again by the store on insert.
    pub async fn register(
        &self,
        account: Account,
        raw_password: &str,
    ) -> Result<Account, CredentialError> {
        if self.accounts.find_by_handle(&account.username).await?.is_some() {
            return Err(CredentialError::DuplicateHandle(account.username));
        }

        let password_hash = bcrypt::hash(raw_password, self.cost)?;
        self.accounts.insert(&account, &password_hash).await?;

        tracing::info!(account_id = %account.id, role = %account.role, "account registered");
        Ok(account)
    }

    pub async fn authenticate(
        &self,
        handle: &str,
        raw_password: &str,
    ) -> Result<Account, CredentialError> {
        let credential = self
            .accounts
            .find_credential(handle)
            .await?
            .ok_or(CredentialError::InvalidCredentials)?;

        if bcrypt::verify(raw_password, &credential.password_hash)? {
            Ok(credential.account)
        } else {
            Err(CredentialError::InvalidCredentials)
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, CredentialError> {
        Ok(self.accounts.find_by_id(id).await?)
    }

    pub async fn find_by_handle(&self, handle: &str) -> Result<Option<Account>, CredentialError> {
        Ok(self.accounts.find_by_handle(handle).await?)
    }
}
