use std::fmt;

use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum HttpStatus {
    Ok,
    Created,
    NotFound,
    InternalServerError,
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        match self {
            HttpStatus::Ok => 200,
            HttpStatus::Created => 201,
            HttpStatus::NotFound => 404,
            HttpStatus::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            HttpStatus::Ok => "OK",
            HttpStatus::Created => "Created",
            HttpStatus::NotFound => "Not Found",
            HttpStatus::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP/1.1 {} {}", self.code(), self.reason())
    }
}

/// A response as handlers build it. Headers are written in insertion order.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: HttpStatus,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponse {
    pub fn new() -> Self {
        HttpResponse {
            status: HttpStatus::Ok,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: HttpStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets the body along with its `Content-Type` and `Content-Length`.
    pub fn with_body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        let len = body.len().to_string();
        self.body = body;
        self.with_header("Content-Type", content_type)
            .with_header("Content-Length", &len)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Everything up to and including the blank line that ends the header block.
    pub fn head(&self) -> String {
        let mut head = format!("{}\r\n", self.status);
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");
        head
    }
}

pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn from(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_all(&mut self, response: &HttpResponse) -> Result<(), std::io::Error> {
        self.writer.write_all(response.head().as_bytes()).await?;
        self.writer.write_all(&response.body).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_lines() {
        let cases = [
            (HttpStatus::Ok, "HTTP/1.1 200 OK"),
            (HttpStatus::Created, "HTTP/1.1 201 Created"),
            (HttpStatus::NotFound, "HTTP/1.1 404 Not Found"),
            (HttpStatus::InternalServerError, "HTTP/1.1 500 Internal Server Error"),
        ];
        for (status, line) in cases {
            assert_eq!(status.to_string(), line);
        }
    }

    #[tokio::test]
    async fn bodyless_response_is_status_line_only() {
        let mut out = Vec::new();
        ResponseWriter::from(&mut out)
            .write_all(&HttpResponse::new().with_status(HttpStatus::NotFound))
            .await
            .unwrap();
        assert_eq!(out, b"HTTP/1.1 404 Not Found\r\n\r\n");
    }

    #[tokio::test]
    async fn headers_written_in_order() {
        let response = HttpResponse::new()
            .with_header("Content-Encoding", "gzip")
            .with_body("text/plain", b"abc".to_vec());
        let mut out = Vec::new();
        ResponseWriter::from(&mut out).write_all(&response).await.unwrap();
        assert_eq!(
            out,
            b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\nabc"
        );
    }

    #[test]
    fn content_length_matches_body() {
        let response = HttpResponse::new().with_body("application/octet-stream", vec![0u8; 1500]);
        assert_eq!(response.header("content-length"), Some("1500"));
        assert_eq!(response.body.len(), 1500);
    }
}
