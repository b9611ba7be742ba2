use std::io::Read;

use crate::error::Error;

/// Upper bound on the size of a webhook body.
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// An inbound webhook delivery, independent of any HTTP framework.
///
/// Query and form parameters are expected already percent-decoded.
#[derive(Debug, Clone)]
pub struct Request<B> {
    method: String,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    body: B,
}

impl<B: Read> Request<B> {
    pub fn new(body: B) -> Self {
        Self {
            method: "POST".to_string(),
            headers: Vec::new(),
            params: Vec::new(),
            body,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Reads the whole body, failing if it is larger than `limit` bytes.
    pub(crate) fn read_body(&mut self, limit: usize) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        (&mut self.body)
            .take(limit as u64 + 1)
            .read_to_end(&mut buf)?;
        if buf.len() > limit {
            return Err(Error::PayloadTooLarge { limit });
        }
        Ok(buf)
    }
}

impl<B> Request<B> {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Case-insensitive header lookup; the first value wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(&b""[..]).with_header("X-GitHub-Event", "push");
        assert_eq!(req.header("x-github-event"), Some("push"));
        assert_eq!(req.header("X-Event-Key"), None);
    }

    #[test]
    fn param_lookup_is_exact() {
        let req = Request::new(&b""[..]).with_param("secret", "s3cr3t");
        assert_eq!(req.param("secret"), Some("s3cr3t"));
        assert_eq!(req.param("Secret"), None);
    }

    #[test]
    fn body_at_limit_is_read() {
        let mut req = Request::new(&b"0123456789"[..]);
        assert_eq!(req.read_body(10).unwrap(), b"0123456789");
    }

    #[test]
    fn body_over_limit_is_rejected() {
        let mut req = Request::new(&b"0123456789A"[..]);
        assert!(matches!(
            req.read_body(10),
            Err(Error::PayloadTooLarge { limit: 10 })
        ));
    }
}
