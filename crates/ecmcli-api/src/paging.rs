// Record streams over paged ECM resources
//
// Most resources page with `limit`/`offset` and a `meta.next` link. The
// time-series resources (`router_alerts`, `activity_logs`) misreport
// `next` and `total_count`, so they are walked by growing the window until
// an empty page comes back.

use async_stream::try_stream;
use futures_util::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::glob::GlobFilter;
use crate::query::Query;

/// Resources whose paging metadata cannot be trusted.
const ABERRANT_RESOURCES: &[&str] = &["router_alerts", "activity_logs"];

/// Query keys that are never treated as glob field filters.
const RESERVED_KEYS: &[&str] = &[
    "expand", "limit", "offset", "timeout", "_or", "page_size", "urn", "data", "fields",
    "order_by", "parentAccount",
];

/// Page size derived from terminal height, leaving a few rows of context.
pub fn page_size_for_rows(rows: u16) -> usize {
    usize::from(rows).saturating_sub(4).clamp(20, 100)
}

fn is_aberrant(path: &str) -> bool {
    let resource = path.trim_matches('/').split('/').next().unwrap_or("");
    ABERRANT_RESOURCES.contains(&resource)
}

impl EcmClient {
    /// Stream every record of a list resource.
    ///
    /// `page_size` in the query sets the page length, otherwise the
    /// client default. A `limit` caps the total number of records.
    pub fn pager<'a>(
        &'a self,
        path: &'a str,
        mut query: Query,
    ) -> impl Stream<Item = Result<Value, Error>> + Send + 'a {
        let page_size = query
            .remove("page_size")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or_else(|| self.page_size());
        let limit = query.remove("limit").and_then(|v| v.parse::<usize>().ok());
        let aberrant = is_aberrant(path);

        try_stream! {
            if aberrant {
                let mut window = limit.unwrap_or(page_size);
                let mut offset = query
                    .remove("offset")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                loop {
                    let mut q = query.clone();
                    q.set("limit", window);
                    q.set("offset", offset);
                    let page = self.get_page(path, &q).await?;
                    let size = page.data.len();
                    trace!(path, offset, window, size, "aberrant page");
                    if size == 0 {
                        break;
                    }
                    offset += size;
                    window += size;
                    for record in page.data {
                        yield record;
                    }
                }
            } else {
                let mut offset = query
                    .remove("offset")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                let mut emitted = 0usize;
                loop {
                    let want = limit.map_or(page_size, |l| page_size.min(l - emitted));
                    let mut q = query.clone();
                    q.set("limit", want);
                    q.set("offset", offset);
                    let page = self.get_page(path, &q).await?;
                    let size = page.data.len();
                    trace!(path, offset, size, "page");
                    for record in page.data {
                        yield record;
                        emitted += 1;
                    }
                    offset += size;
                    let total = page.meta.total_count.and_then(|t| usize::try_from(t).ok());
                    let done = size == 0
                        || page.meta.next.is_none()
                        || total.is_some_and(|t| offset >= t)
                        || limit.is_some_and(|l| emitted >= l);
                    if done {
                        break;
                    }
                }
            }
        }
    }

    /// Typed variant of [`pager`](Self::pager).
    pub fn pager_as<'a, T: DeserializeOwned + 'a>(
        &'a self,
        path: &'a str,
        query: Query,
    ) -> impl Stream<Item = Result<T, Error>> + Send + 'a
    where
        T: Send,
    {
        let inner = self.pager(path, query);
        try_stream! {
            futures_util::pin_mut!(inner);
            while let Some(record) = futures_util::StreamExt::next(&mut inner).await {
                yield decode::<T>(record?)?;
            }
        }
    }

    /// Collect a whole resource into memory.
    pub async fn collect<T: DeserializeOwned + Send + 'static>(
        &self,
        path: &str,
        query: Query,
    ) -> Result<Vec<T>, Error> {
        use futures_util::TryStreamExt;
        self.pager_as::<T>(path, query).try_collect().await
    }

    /// Pager with glob patterns on one field.
    ///
    /// Several patterns form a disjunction. Server prefilters are sent as
    /// `_or` terms only when every pattern yields the same filter key, so an
    /// open-ended pattern is never starved by a narrower one. Records are
    /// then checked client side.
    pub fn glob_pager<'a>(
        &'a self,
        path: &'a str,
        field: &str,
        patterns: &[String],
        mut query: Query,
    ) -> impl Stream<Item = Result<Value, Error>> + Send + 'a {
        let tests: Vec<GlobFilter> = if RESERVED_KEYS.contains(&field) || field.contains("__") {
            Vec::new()
        } else {
            patterns.iter().map(|p| GlobFilter::new(field, p)).collect()
        };
        for term in disjunction_terms(&tests) {
            query.push("_or", term);
        }

        let inner = self.pager(path, query);
        try_stream! {
            futures_util::pin_mut!(inner);
            while let Some(record) = futures_util::StreamExt::next(&mut inner).await {
                let record = record?;
                if tests.is_empty() || tests.iter().any(|t| t.test(&record)) {
                    yield record;
                }
            }
        }
    }
}

/// `_or` terms for the server filters shared by every glob.
fn disjunction_terms(tests: &[GlobFilter]) -> Vec<String> {
    let mut keys: Vec<&str> = Vec::new();
    for test in tests {
        for (key, _) in test.filters() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }
    keys.into_iter()
        .filter_map(|key| {
            let terms: Vec<String> = tests
                .iter()
                .filter_map(|t| {
                    t.filters()
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(k, v)| format!("{k}={v}"))
                })
                .collect();
            (terms.len() == tests.len()).then(|| terms.join("|"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn page_size_clamps_to_terminal() {
        assert_eq!(page_size_for_rows(10), 20);
        assert_eq!(page_size_for_rows(50), 46);
        assert_eq!(page_size_for_rows(500), 100);
    }

    #[test]
    fn aberrant_resources_are_detected() {
        assert!(is_aberrant("activity_logs"));
        assert!(is_aberrant("router_alerts/"));
        assert!(!is_aberrant("routers"));
    }

    #[test]
    fn shared_prefilters_become_or_terms() {
        let tests = vec![GlobFilter::new("name", "foo*"), GlobFilter::new("name", "bar*")];
        assert_eq!(
            disjunction_terms(&tests),
            vec!["name__startswith=foo|name__startswith=bar"]
        );
    }

    #[test]
    fn partial_prefilters_are_dropped() {
        let tests = vec![GlobFilter::new("name", "foo*"), GlobFilter::new("name", "*bar")];
        assert!(disjunction_terms(&tests).is_empty());

        let tests = vec![GlobFilter::new("name", "exact")];
        assert_eq!(disjunction_terms(&tests), vec!["name__exact=exact"]);
    }
}
