// Request lifecycle events
//
// Listeners observe every API call (for tracing) and session token
// changes (for persistence). Delivery is synchronous and in registration
// order, so a listener sees `RequestStarted` before `RequestFinished`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use reqwest::Method;
use url::Url;

/// Outcome of a finished API request.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// Success; `len` is the record count when the payload was a list.
    Ok { len: Option<usize> },
    /// Failure, with the rendered error.
    Failed { error: String },
}

/// Something the client did that listeners may care about.
#[derive(Debug, Clone)]
pub enum ApiEvent {
    RequestStarted {
        call_id: u64,
        method: Method,
        url: Url,
    },
    RequestFinished {
        call_id: u64,
        method: Method,
        url: Url,
        elapsed: Duration,
        outcome: RequestOutcome,
    },
    /// The session token was issued, rotated, or cleared (`token: None`).
    SessionChanged {
        site: Url,
        username: String,
        token: Option<String>,
    },
}

/// Receiver of [`ApiEvent`]s.
pub trait ApiListener: Send + Sync {
    fn on_event(&self, event: &ApiEvent);
}

impl<F> ApiListener for F
where
    F: Fn(&ApiEvent) + Send + Sync,
{
    fn on_event(&self, event: &ApiEvent) {
        self(event);
    }
}

/// Handle returned by [`Listeners::add`]; pass it back to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: AtomicU64,
    entries: RwLock<Vec<(ListenerId, Arc<dyn ApiListener>)>>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: Arc<dyn ApiListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .expect("listener lock poisoned")
            .push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write().expect("listener lock poisoned");
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    pub(crate) fn fire(&self, event: &ApiEvent) {
        // Snapshot so a listener may add/remove listeners without deadlocking.
        let snapshot: Vec<Arc<dyn ApiListener>> = self
            .entries
            .read()
            .expect("listener lock poisoned")
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn listeners_fire_in_order_and_can_be_removed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listeners = Listeners::default();

        let a = Arc::clone(&seen);
        let first = listeners.add(Arc::new(move |_: &ApiEvent| {
            a.lock().expect("poisoned").push("first");
        }));
        let b = Arc::clone(&seen);
        listeners.add(Arc::new(move |_: &ApiEvent| {
            b.lock().expect("poisoned").push("second");
        }));

        let event = ApiEvent::SessionChanged {
            site: Url::parse("https://example.com").expect("url"),
            username: "bob".into(),
            token: None,
        };
        listeners.fire(&event);
        assert!(listeners.remove(first));
        assert!(!listeners.remove(first));
        listeners.fire(&event);

        assert_eq!(
            *seen.lock().expect("poisoned"),
            vec!["first", "second", "second"]
        );
    }
}
