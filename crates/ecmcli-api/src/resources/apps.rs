// Router SDK application endpoints

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::{AppDeploy, AppVersion, Router};
use crate::query::Query;
use crate::resources::record_id;

const VERSIONS: &str = "router_sdk_app_versions";
const DEPLOYS: &str = "router_sdk_group_bindings";

/// State polls after an upload before giving up.
const UPLOAD_POLLS: u32 = 10;
const UPLOAD_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A `name:major.minor` app version identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdent {
    pub name: String,
    pub major: u32,
    pub minor: u32,
}

impl std::str::FromStr for AppIdent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Api {
            exception: "invalid_app_ident".into(),
            message: format!("Expected NAME:MAJOR.MINOR, got `{s}`"),
            status: 400,
        };
        let (name, version) = s.split_once(':').ok_or_else(invalid)?;
        let (major, minor) = version.split_once('.').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_owned(),
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl std::fmt::Display for AppIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}.{}", self.name, self.major, self.minor)
    }
}

impl EcmClient {
    pub async fn list_app_versions(&self) -> Result<Vec<AppVersion>, Error> {
        self.collect(VERSIONS, Query::new().with("expand", "account,app"))
            .await
    }

    /// App version for a `name:major.minor` identifier.
    pub async fn get_app_version(&self, ident: &AppIdent) -> Result<AppVersion, Error> {
        let query = Query::new()
            .with("app__name", &ident.name)
            .with("major_version", ident.major)
            .with("minor_version", ident.minor)
            .with("expand", "account,app,groups");
        let page = self.get_page(VERSIONS, &query).await?;
        let record = page
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("apps", &ident.to_string()))?;
        decode(record)
    }

    /// Routers running an app version.
    pub async fn app_routers(&self, app: &AppVersion) -> Result<Vec<Router>, Error> {
        let Some(urn) = app.routers.as_deref() else {
            return Ok(Vec::new());
        };
        match self.get_urn(urn).await? {
            Value::Array(items) => items.into_iter().map(decode).collect(),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![decode(other)?]),
        }
    }

    /// Upload a package and wait for the server to leave the `uploading`
    /// state. A package the server rejects is deleted again.
    pub async fn upload_app(&self, file_name: &str, bytes: &[u8]) -> Result<AppVersion, Error> {
        debug!(file_name, len = bytes.len(), "uploading app package");
        let created = self
            .post_archive(VERSIONS, file_name, bytes, &Query::new())
            .await?;
        let id = record_id(&created);
        for _ in 0..UPLOAD_POLLS {
            let app: AppVersion = decode(self.get_by(&["id"], VERSIONS, &id, &Query::new()).await?)?;
            if app.state != "uploading" {
                if app.state == "error" {
                    self.delete_app_version(&app.id).await?;
                    return Err(Error::Api {
                        exception: "upload_error".into(),
                        message: app
                            .state_details
                            .unwrap_or_else(|| "Package rejected".into()),
                        status: 400,
                    });
                }
                return Ok(app);
            }
            tokio::time::sleep(UPLOAD_POLL_INTERVAL).await;
        }
        Err(Error::Api {
            exception: "upload_timeout".into(),
            message: "Timeout waiting for upload to complete".into(),
            status: 408,
        })
    }

    pub async fn delete_app_version(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting app version");
        self.delete(&format!("{VERSIONS}/{id}"), &Query::new())
            .await?;
        Ok(())
    }

    pub async fn list_app_deploys(&self) -> Result<Vec<AppDeploy>, Error> {
        self.collect(DEPLOYS, Query::new().with("expand", "app_version.app,group"))
            .await
    }

    /// Deploys of one app version, optionally limited to a group.
    pub async fn find_app_deploys(
        &self,
        app_id: &str,
        group_id: Option<&str>,
    ) -> Result<Vec<AppDeploy>, Error> {
        let mut query = Query::new().with("app_version", app_id);
        if let Some(group) = group_id {
            query.push("group", group);
        }
        self.collect(DEPLOYS, query).await
    }

    /// Install an app version on a group, under the group's account.
    pub async fn install_app(&self, app_urn: &str, group: &Value) -> Result<Value, Error> {
        let body = json!({
            "app_version": app_urn,
            "group": group.get("resource_uri"),
            "account": group.get("account"),
        });
        debug!(app_urn, "installing app on group");
        self.post(DEPLOYS, &body, &Query::new()).await
    }

    pub async fn delete_app_deploy(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting app deploy");
        self.delete(&format!("{DEPLOYS}/{id}"), &Query::new())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_ident_parses_name_and_version() {
        let ident: AppIdent = "hello:1.12".parse().expect("ident");
        assert_eq!(ident.name, "hello");
        assert_eq!((ident.major, ident.minor), (1, 12));
        assert_eq!(ident.to_string(), "hello:1.12");
    }

    #[test]
    fn app_ident_rejects_malformed_input() {
        for bad in ["hello", "hello:1", ":1.0", "hello:a.b"] {
            assert!(bad.parse::<AppIdent>().is_err(), "{bad}");
        }
    }
}
