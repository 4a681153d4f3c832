// Account endpoints
//
// Accounts are fetched in one huge page: the API returns descendants at
// the root level anyway and round trips dominate, so the tree is built
// client side.

use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::Account;
use crate::query::Query;

const ACCOUNT_PAGE_SIZE: usize = 10_000;

/// Sizes of an account's sub-collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountCounts {
    pub routers: u64,
    pub groups: u64,
    pub users: u64,
    pub subaccounts: u64,
}

impl EcmClient {
    /// Every account visible to the session, ignoring the parent scope.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, Error> {
        let query = Query::new()
            .with("page_size", ACCOUNT_PAGE_SIZE)
            .unscoped();
        let records: Vec<Value> = self.pager("accounts", query).try_collect().await?;
        records.into_iter().map(decode).collect()
    }

    pub async fn get_account(&self, ident: &str) -> Result<Account, Error> {
        decode(self.get_by_id_or_name("accounts", ident).await?)
    }

    /// Create an account, optionally under a parent account URN.
    pub async fn create_account(&self, name: &str, parent_urn: Option<&str>) -> Result<Value, Error> {
        let mut body = json!({ "name": name });
        if let Some(parent) = parent_urn {
            body["account"] = json!(parent);
        }
        debug!(name, ?parent_urn, "creating account");
        self.post("accounts", &body, &Query::new()).await
    }

    pub async fn delete_account(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting account");
        self.delete(&format!("accounts/{id}"), &Query::new()).await?;
        Ok(())
    }

    /// Reparent an account.
    pub async fn move_account(&self, id: &str, parent_urn: &str) -> Result<(), Error> {
        self.put(
            &format!("accounts/{id}"),
            &json!({ "account": parent_urn }),
            &Query::new(),
        )
        .await?;
        Ok(())
    }

    pub async fn rename_account(&self, id: &str, name: &str) -> Result<(), Error> {
        self.put(
            &format!("accounts/{id}"),
            &json!({ "name": name }),
            &Query::new(),
        )
        .await?;
        Ok(())
    }

    /// Count routers, groups, users and subaccounts of an account.
    pub async fn account_counts(&self, account: &Account) -> Result<AccountCounts, Error> {
        Ok(AccountCounts {
            routers: self.count_urn(account.routers.as_deref()).await?,
            groups: self.count_urn(account.groups.as_deref()).await?,
            users: self.count_urn(account.user_profiles.as_deref()).await?,
            subaccounts: self.count_urn(account.subaccounts.as_deref()).await?,
        })
    }

    /// `GET {urn}?count=id` answers with `[{"id_count": N}]`.
    async fn count_urn(&self, urn: Option<&str>) -> Result<u64, Error> {
        let Some(urn) = urn else {
            return Ok(0);
        };
        let data = self.get_value(urn, &Query::new().with("count", "id")).await?;
        let first = match &data {
            Value::Array(items) => items.first(),
            other => Some(other),
        };
        Ok(first
            .and_then(|v| v.get("id_count"))
            .and_then(Value::as_u64)
            .unwrap_or_default())
    }
}
