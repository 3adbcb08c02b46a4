use sqlx::PgPool;

use crate::db::models::{Account, AccountKind};
use crate::error::{Result, TokenError};

/// Account provisioning, driven by the profile collaborator through the
/// internal API. Balance fields are owned by the ledger store; this service
/// only creates and removes rows.
pub struct AccountService {
    db_pool: PgPool,
}

impl AccountService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create(
        &self,
        id: &str,
        kind: AccountKind,
        family_id: Option<&str>,
        display_name: &str,
    ) -> Result<Account> {
        if id.trim().is_empty() {
            return Err(TokenError::Validation("account id must not be empty".to_string()));
        }
        match (kind, family_id) {
            (AccountKind::Child, None) => {
                return Err(TokenError::Validation(
                    "child accounts require a family_id".to_string(),
                ));
            }
            (AccountKind::Family, Some(_)) => {
                return Err(TokenError::Validation(
                    "family accounts must not reference another family".to_string(),
                ));
            }
            _ => {}
        }

        // provisioning is idempotent so the profile service can replay events
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, kind, family_id, display_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(kind)
        .bind(family_id)
        .bind(display_name)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(account)
    }

    /// Removes the account; ledger entries, spend requests and the wallet row
    /// go with it via FK cascade.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM accounts WHERE id = $1"#)
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(TokenError::AccountNotFound(id.to_string()));
        }

        tracing::info!("Removed account {} and its ledger/wallet rows", id);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Account> {
        sqlx::query_as::<_, Account>(r#"SELECT * FROM accounts WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| TokenError::AccountNotFound(id.to_string()))
    }

    pub async fn children_of(&self, family_id: &str) -> Result<Vec<Account>> {
        let children = sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM accounts
            WHERE family_id = $1 AND kind = 'child'
            ORDER BY created_at ASC
            "#,
        )
        .bind(family_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(children)
    }
}
