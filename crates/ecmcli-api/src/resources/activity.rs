// Activity log endpoints

use futures_util::Stream;

use crate::client::EcmClient;
use crate::error::Error;
use crate::models::ActivityLogEntry;
use crate::query::Query;

impl EcmClient {
    /// Activity log entries, newest first.
    pub fn activity_logs(&self) -> impl Stream<Item = Result<ActivityLogEntry, Error>> + Send + '_ {
        let query = Query::new().with("order_by", "-created_at_timeuuid");
        self.pager_as("activity_logs", query)
    }
}
