use crate::error::Result;
use crate::models::{Account, CredentialSet};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Read/write contract the add pipeline has against the account table.
/// Kept narrow so the pipeline can be exercised against an in-memory
/// store in tests.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Account>>;

    /// Persist refreshed tokens, conditional on `expires_at` still holding
    /// the value this request read. Returns false when another request
    /// refreshed concurrently and won the write.
    async fn update_tokens(
        &self,
        account_id: &str,
        creds: &CredentialSet,
        expected_expires_at: i64,
    ) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert a freshly linked account, or update the tokens of an
    /// existing one. Existing accounts keep their API key.
    pub async fn upsert_linked_account(
        &self,
        account_id: &str,
        creds: &CredentialSet,
        new_api_key: &str,
    ) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, access_token, refresh_token, expires_at, api_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(&creds.access_token)
        .bind(&creds.refresh_token)
        .bind(creds.expires_at)
        .bind(new_api_key)
        .fetch_one(&self.db)
        .await?;

        Ok(account)
    }

    pub async fn find_by_id(&self, account_id: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    pub async fn rotate_api_key(&self, account_id: &str, new_api_key: &str) -> Result<()> {
        sqlx::query("UPDATE accounts SET api_key = $1 WHERE id = $2")
            .bind(new_api_key)
            .bind(account_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Sessions cascade via the foreign key.
    pub async fn delete_account(&self, account_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn create_session(&self, account_id: &str) -> Result<Uuid> {
        let session_id = Uuid::new_v4();
        sqlx::query("INSERT INTO sessions (id, account_id) VALUES ($1, $2)")
            .bind(session_id)
            .bind(account_id)
            .execute(&self.db)
            .await?;
        Ok(session_id)
    }

    pub async fn account_for_session(&self, session_id: Uuid) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT a.* FROM accounts a
            JOIN sessions s ON s.account_id = a.id
            WHERE s.id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(account)
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn update_tokens(
        &self,
        account_id: &str,
        creds: &CredentialSet,
        expected_expires_at: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET access_token = $1, refresh_token = $2, expires_at = $3
            WHERE id = $4 AND expires_at = $5
            "#,
        )
        .bind(&creds.access_token)
        .bind(&creds.refresh_token)
        .bind(creds.expires_at)
        .bind(account_id)
        .bind(expected_expires_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
