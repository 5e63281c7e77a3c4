use crate::error::ServerError;
use serde::Serialize;
use std::collections::HashMap;

pub(crate) const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub(crate) const TEXT_HTML: &str = "text/html; charset=utf-8";
pub(crate) const APPLICATION_JSON: &str = "application/json; charset=utf-8";
pub(crate) const APPLICATION_XML: &str = "application/xml; charset=utf-8";

/// Response buffer filled in by the handlers of one request.
///
/// The status line is committed by the first [`write_header`](Self::write_header)
/// or body write; later status changes are ignored.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    committed: bool,
}

impl Default for Response {
    fn default() -> Self {
        Response::new(200)
    }
}

impl Response {
    pub fn new(status: u16) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
            committed: false,
        }
    }

    pub fn header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        self.headers
            .insert(name.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets `Content-Type` unless a handler already chose one.
    pub fn content_type_if_absent(&mut self, content_type: &str) -> &mut Self {
        if self.get_header("Content-Type").is_none() {
            self.header("Content-Type", content_type);
        }
        self
    }

    /// Commits the status code. Returns false when it was already committed.
    pub fn write_header(&mut self, status: u16) -> bool {
        if self.committed {
            return false;
        }
        self.status = status;
        self.committed = true;
        true
    }

    pub fn write(&mut self, data: &[u8]) {
        self.committed = true;
        self.body.extend_from_slice(data);
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, ServerError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| ServerError::InternalError(format!("JSON serialization error: {}", e)))?;
        self.header("Content-Type", APPLICATION_JSON);
        self.body = body;
        Ok(self)
    }

    pub fn text<T: AsRef<str>>(status: u16, content: T) -> Response {
        let mut response = Response::new(status);
        response.header("Content-Type", TEXT_PLAIN);
        response.body = content.as_ref().as_bytes().to_vec();
        response
    }

    pub fn error(err: ServerError) -> Response {
        let status = err.status_code();
        let body = serde_json::json!({
            "error": {
                "message": err.to_string(),
                "status": status
            }
        });
        let mut response = Response::new(status);
        if response.json(&body).is_err() {
            return Response::text(status, err.to_string());
        }
        response
    }

    pub(crate) fn clear(&mut self) {
        self.status = 200;
        self.headers.clear();
        self.body.clear();
        self.committed = false;
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}
