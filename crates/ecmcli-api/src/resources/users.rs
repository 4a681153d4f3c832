// User endpoints

use futures_util::TryStreamExt;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::User;
use crate::query::Query;

impl EcmClient {
    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        let query = Query::new().with("expand", "profile");
        let records: Vec<Value> = self.pager("users", query).try_collect().await?;
        records.into_iter().map(decode).collect()
    }

    /// User by id or username.
    pub async fn get_user(&self, ident: &str) -> Result<User, Error> {
        let selectors: &[&str] = if ident.chars().all(|c| c.is_ascii_digit()) {
            &["id", "username"]
        } else {
            &["username"]
        };
        decode(self.get_by(selectors, "users", ident, &Query::new()).await?)
    }

    /// Create a user and attach it to an account with a role.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
        account_urn: &str,
    ) -> Result<Value, Error> {
        debug!(username, "creating user");
        let user = self
            .post(
                "users",
                &json!({
                    "username": username,
                    "email": email,
                    "first_name": first_name,
                    "last_name": last_name,
                    "password": password,
                    "account": account_urn,
                }),
                &Query::new(),
            )
            .await?;
        Ok(user)
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting user");
        self.delete(&format!("users/{id}"), &Query::new()).await?;
        Ok(())
    }
}
