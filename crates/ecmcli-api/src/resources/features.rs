// Feature binding endpoints

use serde_json::{Value, json};
use tracing::debug;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::{FeatureBinding, Router};
use crate::query::Query;

const RESOURCE: &str = "featurebindings";

impl EcmClient {
    /// Feature bindings of the current account. Internal features are
    /// hidden unless `include_internal` is set.
    pub async fn list_feature_bindings(
        &self,
        include_internal: bool,
    ) -> Result<Vec<FeatureBinding>, Error> {
        let mut query = Query::new().with("expand", "account,feature");
        if !include_internal {
            query.push("feature.category__nin", "internal");
        }
        self.collect(RESOURCE, query).await
    }

    pub async fn get_feature_binding(&self, id: &str) -> Result<FeatureBinding, Error> {
        let query = Query::new().with("expand", "feature");
        decode(self.get_by(&["id"], RESOURCE, id, &query).await?)
    }

    pub async fn delete_feature_binding(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting feature binding");
        self.delete(&format!("{RESOURCE}/{id}"), &Query::new())
            .await?;
        Ok(())
    }

    /// Routers attached to a binding.
    pub async fn feature_routers(&self, binding: &FeatureBinding) -> Result<Vec<Router>, Error> {
        let Some(urn) = binding.routers.as_deref() else {
            return Ok(Vec::new());
        };
        let data = self.get_urn(urn).await?;
        match data {
            Value::Array(items) => items.into_iter().map(decode).collect(),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![decode(other)?]),
        }
    }

    pub async fn add_feature_router(&self, binding_id: &str, router_urn: &str) -> Result<(), Error> {
        debug!(binding_id, router_urn, "binding router to feature");
        self.post(
            &format!("{RESOURCE}/{binding_id}/routers"),
            &json!([router_urn]),
            &Query::new(),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_feature_router(
        &self,
        binding_id: &str,
        router_urn: &str,
    ) -> Result<(), Error> {
        debug!(binding_id, router_urn, "unbinding router from feature");
        self.delete_with(
            &format!("{RESOURCE}/{binding_id}/routers"),
            &json!([router_urn]),
            &Query::new(),
        )
        .await?;
        Ok(())
    }
}
