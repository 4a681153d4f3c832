// Helpers for router config trees
//
// Router config and status are arbitrary JSON trees addressed with dotted
// paths (`config.wan.rules.0.enabled`). Lists are addressed by index.

use serde_json::{Map, Value};

use crate::glob::{glob_match, is_glob};

/// Convert every list in the tree into an object keyed by index (`"0"`, `"1"`, ...).
pub fn todict(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Object(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), todict(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Object(obj) => Value::Object(obj.into_iter().map(|(k, v)| (k, todict(v))).collect()),
        other => other,
    }
}

/// Follow a dotted key into a config tree. `None` key returns the tree itself.
pub fn walk_config<'a>(key: Option<&str>, config: &'a Value) -> Option<&'a Value> {
    let Some(key) = key else {
        return Some(config);
    };
    let mut offset = config;
    for part in key.split('.') {
        offset = match offset {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(offset)
}

/// A dotted path split into the literal server prefix and the globbed rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    pub server: Vec<String>,
    pub globs: Vec<String>,
}

impl RemotePath {
    /// Split at the first segment containing a glob.
    pub fn parse(path: &str) -> Self {
        let parts: Vec<String> = path
            .split('.')
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect();
        let split = parts.iter().position(|p| is_glob(p)).unwrap_or(parts.len());
        let (server, globs) = parts.split_at(split);
        Self {
            server: server.to_vec(),
            globs: globs.to_vec(),
        }
    }

    /// The server path as URL segments (`status/wan`).
    pub fn server_path(&self) -> String {
        self.server.join("/")
    }
}

/// Walk the globbed segments against fetched data, yielding `(dotted_path, value)`.
pub fn expand_globs(base: &Value, path: &RemotePath) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    expand_into(base, &path.globs, path.server.clone(), &mut out);
    out
}

fn expand_into(base: &Value, tests: &[String], context: Vec<String>, out: &mut Vec<(String, Value)>) {
    let Some((test, rest)) = tests.split_first() else {
        out.push((context.join("."), base.clone()));
        return;
    };
    let items: Vec<(String, &Value)> = match base {
        Value::Object(obj) => obj.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
        _ => return,
    };
    for (key, value) in items {
        if glob_match(&key, test) {
            let mut next = context.clone();
            next.push(key);
            expand_into(value, rest, next, out);
        }
    }
}
