// WiFi site survey endpoints

use futures_util::TryStreamExt;
use serde_json::Value;
use tracing::debug;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::AccessPointSurvey;
use crate::query::Query;

impl EcmClient {
    /// Access points seen by site surveys, optionally limited to routers.
    pub async fn access_points(&self, router_ids: &[String]) -> Result<Vec<AccessPointSurvey>, Error> {
        let mut query = Query::new().with("expand", "survey.router,trust,wireless_ap");
        if !router_ids.is_empty() {
            query.push("survey__router__in", router_ids.join(","));
        }
        let records: Vec<Value> = self
            .pager("wireless_ap_survey_view", query)
            .try_collect()
            .await?;
        records.into_iter().map(decode).collect()
    }

    /// Start a site survey on the given routers.
    pub async fn start_site_survey(&self, router_ids: &[String]) -> Result<(), Error> {
        debug!(count = router_ids.len(), "starting wifi survey");
        self.post("wireless_site_survey", &router_ids, &Query::new())
            .await?;
        Ok(())
    }
}
