use std::borrow::Cow;
use std::collections::HashMap;

/// An inbound request as handed to [`Engine::handle`](crate::app::Engine::handle).
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    /// Builds a request from a method and a request target such as
    /// `/search?q=rust`. The query string is split off and decoded.
    pub fn new(method: &str, target: &str) -> Request {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, HashMap::new()),
        };
        let path = if path.is_empty() { "/" } else { path };

        Request {
            method: method.to_owned(),
            path: path.to_owned(),
            query,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_lowercase(), value.to_owned());
        self
    }

    pub fn with_body<B: Into<Vec<u8>>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(key)
            .or_else(|| self.headers.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

fn decode(component: &str) -> String {
    let component = component.replace('+', " ");
    match urlencoding::decode(&component) {
        Ok(Cow::Borrowed(decoded)) => decoded.to_owned(),
        Ok(Cow::Owned(decoded)) => decoded,
        Err(_) => component,
    }
}

/// Decodes `a=1&b=two%20words` into a map. The first value of a repeated key
/// wins.
pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.entry(decode(key)).or_insert_with(|| decode(value));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_split_into_path_and_query() {
        let req = Request::new("GET", "/search?q=hello+world&lang=en%2Dus&flag");
        assert_eq!(req.path, "/search");
        assert_eq!(req.get_query("q"), Some("hello world"));
        assert_eq!(req.get_query("lang"), Some("en-us"));
        assert_eq!(req.get_query("flag"), Some(""));
        assert_eq!(req.get_query("missing"), None);
    }

    #[test]
    fn repeated_query_key_keeps_first_value() {
        let params = parse_query("a=1&a=2");
        assert_eq!(params.get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = Request::new("GET", "/").with_header("X-Token", "abc");
        assert_eq!(req.get_header("x-token"), Some("abc"));
        assert_eq!(req.get_header("X-Token"), Some("abc"));
    }

    #[test]
    fn empty_target_becomes_root() {
        assert_eq!(Request::new("GET", "?x=1").path, "/");
    }
}
