// Authorization and role endpoints

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::{Authorization, Role};
use crate::query::Query;

const RESOURCE: &str = "authorizations";
const FOREIGN_RESOURCE: &str = "foreign_authorizations";
const EXPANDS: &str = "account,role,user.profile.account,securitytoken.account";

/// Filters for [`EcmClient::list_authorizations`].
#[derive(Debug, Clone, Default)]
pub struct AuthorizationFilter {
    /// Username or security token label.
    pub beneficiary: Option<String>,
    pub role: Option<String>,
    /// Name of the account the rights apply to.
    pub rights_on: Option<String>,
    pub inactive: bool,
}

impl AuthorizationFilter {
    fn query(&self) -> Query {
        let mut query = Query::new().with("expand", EXPANDS);
        if let Some(who) = self.beneficiary.as_deref() {
            query.push("_or", format!("user__username={who}|securitytoken.label={who}"));
        }
        if let Some(role) = self.role.as_deref() {
            query.push("role__name", role);
        }
        if let Some(account) = self.rights_on.as_deref() {
            query.push("account__name", account);
        }
        if self.inactive {
            query.push("active", "false");
        }
        query
    }
}

/// Who receives an authorization.
#[derive(Debug, Clone)]
pub enum Beneficiary {
    /// A user of this account, by URN.
    User(String),
    /// A user of another account, by username.
    Foreign(String),
    /// A security token, by URN.
    Token(String),
}

impl EcmClient {
    pub async fn list_authorizations(
        &self,
        filter: &AuthorizationFilter,
    ) -> Result<Vec<Authorization>, Error> {
        self.collect(RESOURCE, filter.query()).await
    }

    pub async fn get_authorization(&self, id: &str) -> Result<Authorization, Error> {
        let query = Query::new().with("expand", EXPANDS);
        decode(self.get_by(&["id"], RESOURCE, id, &query).await?)
    }

    /// Grant `role_urn` on `account_urn`. Foreign users go through the
    /// foreign authorization resource.
    pub async fn create_authorization(
        &self,
        beneficiary: &Beneficiary,
        role_urn: &str,
        account_urn: &str,
        cascade: bool,
    ) -> Result<Value, Error> {
        let mut body = json!({
            "cascade": cascade,
            "role": role_urn,
            "account": account_urn,
        });
        let resource = match beneficiary {
            Beneficiary::User(urn) => {
                body["user"] = json!(urn);
                RESOURCE
            }
            Beneficiary::Token(urn) => {
                body["securitytoken"] = json!(urn);
                RESOURCE
            }
            Beneficiary::Foreign(username) => {
                body["username"] = json!(username);
                FOREIGN_RESOURCE
            }
        };
        debug!(resource, role_urn, account_urn, "creating authorization");
        self.post(resource, &body, &Query::new()).await
    }

    pub async fn edit_authorization(
        &self,
        id: &str,
        changes: &Map<String, Value>,
    ) -> Result<(), Error> {
        debug!(id, ?changes, "editing authorization");
        self.put(&format!("{RESOURCE}/{id}"), changes, &Query::new())
            .await?;
        Ok(())
    }

    pub async fn delete_authorization(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting authorization");
        self.delete(&format!("{RESOURCE}/{id}"), &Query::new())
            .await?;
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, Error> {
        self.collect("roles", Query::new().with("expand", "permissions"))
            .await
    }

    /// Role by id or name, with its permissions expanded.
    pub async fn get_role(&self, ident: &str) -> Result<Role, Error> {
        let query = Query::new().with("expand", "permissions");
        let record = self
            .find_by_id_or_name("roles", ident, &query)
            .await?
            .ok_or_else(|| Error::not_found("roles", ident))?;
        decode(record)
    }

    /// Security token by id or label.
    pub async fn get_security_token(&self, ident: &str) -> Result<Value, Error> {
        let selectors: &[&str] = if ident.chars().all(|c| c.is_ascii_digit()) {
            &["id", "label"]
        } else {
            &["label"]
        };
        self.get_by(selectors, "securitytokens", ident, &Query::new())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beneficiary_filter_matches_users_or_tokens() {
        let filter = AuthorizationFilter {
            beneficiary: Some("ops".into()),
            inactive: true,
            ..Default::default()
        };
        let query = filter.query();
        let pairs: Vec<(&str, &str)> = query.iter().collect();
        assert!(pairs.contains(&("_or", "user__username=ops|securitytoken.label=ops")));
        assert!(pairs.contains(&("active", "false")));
        assert!(!pairs.iter().any(|(k, _)| *k == "role__name"));
    }
}
