// Alert endpoints

use futures_util::Stream;

use crate::client::EcmClient;
use crate::error::Error;
use crate::models::Alert;
use crate::query::Query;

const ALERT_PAGE_SIZE: usize = 500;

impl EcmClient {
    /// Alerts, newest first.
    pub fn alerts(&self) -> impl Stream<Item = Result<Alert, Error>> + Send + '_ {
        let query = Query::new()
            .with("page_size", ALERT_PAGE_SIZE)
            .with("order_by", "-created_ts");
        self.pager_as("alerts", query)
    }
}
