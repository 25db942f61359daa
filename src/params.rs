use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::ConsentError;

/// Query parameters of a consent page URL, in first-seen order.
///
/// Values are kept exactly as they appear in the URL: nothing is
/// percent-decoded. A pair without `=` is kept with an absent value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, Option<String>)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw query component (the part after `?`, without the fragment).
    pub fn parse(query: &str) -> Self {
        let mut params = Self::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            match pair.split_once('=') {
                Some((key, value)) => params.insert(key, Some(value.to_string())),
                None => params.insert(pair, None),
            }
        }
        params
    }

    /// Parses the query component of a full page URL.
    ///
    /// Fails with [`ConsentError::MissingQuery`] when the URL carries no `?`.
    pub fn from_url(url: &str) -> Result<Self, ConsentError> {
        let (_, rest) = url.split_once('?').ok_or_else(|| ConsentError::MissingQuery {
            url: url.to_string(),
        })?;
        let query = rest.split_once('#').map_or(rest, |(query, _)| query);
        Ok(Self::parse(query))
    }

    /// Sets `key`. A repeated key keeps its original position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.pairs.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(existing, _)| existing == key)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(existing, _)| existing == key)
    }

    /// Returns the value of `key`, treating an absent or empty value as missing.
    pub fn require(&self, key: &str) -> Result<&str, ConsentError> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ConsentError::MissingParameter(key.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// JSON object of the pairs that carry a value.
    pub fn to_json(&self) -> Result<String, ConsentError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for QueryParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.pairs {
            if let Some(value) = value {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Parses the query parameters of the page at `url`.
pub fn parse_query(url: &str) -> Result<QueryParams, ConsentError> {
    QueryParams::from_url(url)
}

#[cfg(test)]
mod tests {
    use super::{QueryParams, parse_query};
    use crate::ConsentError;

    #[test]
    fn parses_key_value_pairs() {
        let params =
            parse_query("https://auth.local/authorize?response_type=code&client_id=abc&scope=read")
                .unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("response_type"), Some("code"));
        assert_eq!(params.get("client_id"), Some("abc"));
        assert_eq!(params.get("scope"), Some("read"));
    }

    #[test]
    fn keeps_values_percent_encoded() {
        let params = parse_query("http://h/p?redirect_uri=https%3A%2F%2Fexample.com%2Fcb").unwrap();
        assert_eq!(params.get("redirect_uri"), Some("https%3A%2F%2Fexample.com%2Fcb"));
    }

    #[test]
    fn splits_on_first_equals_only() {
        let params = parse_query("http://h/p?state=a=b").unwrap();
        assert_eq!(params.get("state"), Some("a=b"));
    }

    #[test]
    fn pair_without_equals_has_absent_value() {
        let params = parse_query("http://h/p?flag&state=xyz").unwrap();
        assert!(params.contains_key("flag"));
        assert_eq!(params.get("flag"), None);
        assert!(matches!(
            params.require("flag"),
            Err(ConsentError::MissingParameter(name)) if name == "flag"
        ));
    }

    #[test]
    fn last_occurrence_wins_in_first_position() {
        let params = parse_query("http://h/p?a=1&b=2&a=3").unwrap();
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("a", Some("3")), ("b", Some("2"))]);
    }

    #[test]
    fn missing_query_is_an_error() {
        let result = parse_query("https://auth.local/authorize");
        assert!(matches!(result, Err(ConsentError::MissingQuery { .. })));
    }

    #[test]
    fn empty_query_and_fragment() {
        assert!(parse_query("http://h/p?").unwrap().is_empty());

        let params = parse_query("http://h/p?state=xyz#section").unwrap();
        assert_eq!(params.get("state"), Some("xyz"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn json_body_preserves_order_and_drops_absent_values() {
        let params = QueryParams::parse("redirect_uri=https://example.com/cb&state=xyz&flag");
        assert_eq!(
            params.to_json().unwrap(),
            r#"{"redirect_uri":"https://example.com/cb","state":"xyz"}"#
        );
    }
}
