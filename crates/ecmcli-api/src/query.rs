use std::fmt::Display;

/// Ordered query-string parameters for an ECM request.
///
/// ECM filters repeat keys (`_or` may appear several times), so this is a
/// list of pairs rather than a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt out of the client's `parentAccount` scope for this request.
    pub fn unscoped(mut self) -> Self {
        self.set("parentAccount", "");
        self
    }

    /// Builder-style append.
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.push(key, value);
        self
    }

    /// Append a parameter, keeping any existing values for the key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Display) {
        self.0.push((key.into(), value.to_string()));
    }

    /// Replace all values for the key with one value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Display) {
        let key = key.into();
        self.0.retain(|(k, _)| *k != key);
        self.0.push((key, value.to_string()));
    }

    /// First value for the key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove every value for the key, returning the first.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let first = self.get(key).map(str::to_owned);
        self.0.retain(|(k, _)| k != key);
        first
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Extend<(String, String)> for Query {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_and_push_repeats() {
        let mut q = Query::new().with("_or", "a=1").with("_or", "b=2");
        assert_eq!(q.iter().filter(|(k, _)| *k == "_or").count(), 2);
        q.set("_or", "c=3");
        assert_eq!(q.get("_or"), Some("c=3"));
        assert_eq!(q.remove("_or").as_deref(), Some("c=3"));
        assert!(q.is_empty());
    }
}
