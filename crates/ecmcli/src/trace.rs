//! API call tracer: prints a line to stderr as each request starts and
//! finishes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use owo_colors::OwoColorize;

use ecmcli_api::{ApiEvent, ApiListener, EcmClient, ListenerId, Method, RequestOutcome};

use crate::error::CliError;

pub struct Tracer {
    epoch: Instant,
    color: bool,
    outstanding: Mutex<HashMap<u64, String>>,
}

impl Tracer {
    pub fn new(color: bool) -> Self {
        Self {
            epoch: Instant::now(),
            color,
            outstanding: Mutex::new(HashMap::new()),
        }
    }

    /// `METHOD /path?query` for a request URL.
    fn signature(method: &Method, url: &url::Url) -> String {
        let mut sig = format!("{method} {}", url.path());
        if let Some(query) = url.query() {
            sig.push('?');
            sig.push_str(query);
        }
        sig
    }

    fn line(&self, call_id: u64, category: &str, message: &str, ok: Option<bool>) -> String {
        let stamp = format!("{:.3}[{call_id}]", self.epoch.elapsed().as_secs_f64());
        if !self.color {
            return format!("{stamp} - {category}: {message}");
        }
        let message = match ok {
            Some(true) => message.green().to_string(),
            Some(false) => message.red().to_string(),
            None => message.blue().to_string(),
        };
        format!("{} - {category}: {message}", stamp.cyan())
    }

    /// Render the trace line for an event, if it is a request event.
    pub fn render(&self, event: &ApiEvent) -> Option<String> {
        match event {
            ApiEvent::RequestStarted {
                call_id,
                method,
                url,
            } => {
                let sig = Self::signature(method, url);
                self.outstanding
                    .lock()
                    .expect("tracer lock poisoned")
                    .insert(*call_id, sig.clone());
                Some(self.line(*call_id, "API START", &sig, None))
            }
            ApiEvent::RequestFinished {
                call_id,
                method,
                url,
                elapsed,
                outcome,
            } => {
                let remaining = {
                    let mut outstanding = self.outstanding.lock().expect("tracer lock poisoned");
                    outstanding.remove(call_id);
                    outstanding.len()
                };
                let addendum = if remaining > 0 {
                    format!(" [{remaining} call(s) outstanding]")
                } else {
                    String::new()
                };
                let sig = Self::signature(method, url);
                let category = format!("API FINISH ({}ms)", elapsed.as_millis());
                let (message, ok) = match outcome {
                    RequestOutcome::Ok { len } => {
                        let len = len.map_or_else(|| "empty".to_owned(), |n| n.to_string());
                        (format!("{sig} OK (len: {len}){addendum}"), true)
                    }
                    RequestOutcome::Failed { error } => {
                        (format!("{sig} ERROR ({error}){addendum}"), false)
                    }
                };
                Some(self.line(*call_id, &category, &message, Some(ok)))
            }
            ApiEvent::SessionChanged { .. } => None,
        }
    }
}

impl ApiListener for Tracer {
    fn on_event(&self, event: &ApiEvent) {
        if let Some(line) = self.render(event) {
            eprintln!("{line}");
        }
    }
}

/// Registration of the tracer on a client.
#[derive(Default)]
pub struct TraceState {
    listener: Mutex<Option<ListenerId>>,
}

impl TraceState {
    pub fn is_enabled(&self) -> bool {
        self.listener.lock().expect("trace lock poisoned").is_some()
    }

    pub fn enable(&self, client: &EcmClient, color: bool) -> Result<(), CliError> {
        let mut listener = self.listener.lock().expect("trace lock poisoned");
        if listener.is_some() {
            return Err(CliError::Usage("Tracer already enabled".into()));
        }
        *listener = Some(client.add_listener(Arc::new(Tracer::new(color))));
        Ok(())
    }

    pub fn disable(&self, client: &EcmClient) -> Result<(), CliError> {
        let mut listener = self.listener.lock().expect("trace lock poisoned");
        match listener.take() {
            Some(id) => {
                client.remove_listener(id);
                Ok(())
            }
            None => Err(CliError::Usage("No tracer to disable".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn url(raw: &str) -> url::Url {
        raw.parse().expect("url")
    }

    #[test]
    fn start_and_finish_lines() {
        let tracer = Tracer::new(false);
        let u = url("https://www.cradlepointecm.com/api/v1/routers/?limit=20");
        let start = tracer
            .render(&ApiEvent::RequestStarted {
                call_id: 7,
                method: Method::GET,
                url: u.clone(),
            })
            .expect("start line");
        assert!(start.ends_with("[7] - API START: GET /api/v1/routers/?limit=20"), "{start}");

        let finish = tracer
            .render(&ApiEvent::RequestFinished {
                call_id: 7,
                method: Method::GET,
                url: u,
                elapsed: Duration::from_millis(12),
                outcome: RequestOutcome::Ok { len: Some(3) },
            })
            .expect("finish line");
        assert!(
            finish.ends_with("[7] - API FINISH (12ms): GET /api/v1/routers/?limit=20 OK (len: 3)"),
            "{finish}"
        );
    }

    #[test]
    fn outstanding_calls_are_counted() {
        let tracer = Tracer::new(false);
        for id in [1, 2] {
            tracer.render(&ApiEvent::RequestStarted {
                call_id: id,
                method: Method::PUT,
                url: url("https://ecm/api/v1/remote/"),
            });
        }
        let finish = tracer
            .render(&ApiEvent::RequestFinished {
                call_id: 1,
                method: Method::PUT,
                url: url("https://ecm/api/v1/remote/"),
                elapsed: Duration::from_millis(3),
                outcome: RequestOutcome::Failed {
                    error: "boom".into(),
                },
            })
            .expect("finish line");
        assert!(finish.ends_with("ERROR (boom) [1 call(s) outstanding]"), "{finish}");
    }
}
