use core::fmt;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::headers::Headers;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Other(String),
}

impl From<&str> for HttpMethod {
    fn from(value: &str) -> Self {
        match value {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            other => HttpMethod::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Other(method) => write!(f, "{}", method),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestLine {
    pub method: HttpMethod,
    pub target: String,
    pub version: Option<String>,
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.target)?;
        if let Some(version) = &self.version {
            write!(f, " {}", version)?;
        }
        Ok(())
    }
}

impl RequestLine {
    /// Parses the request line at the start of `data`, returning it together
    /// with the number of bytes consumed (including the line terminator).
    pub fn parse_request_line(data: &[u8]) -> Result<(Self, usize)> {
        let line_len = data
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| anyhow::anyhow!("invalid http request line: no line terminator"))?;
        let raw = &data[..line_len];
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);

        let mut fields = line.split(' ');
        let method_raw = fields.next().unwrap_or_default();
        let target_raw = fields
            .next()
            .ok_or_else(|| anyhow::anyhow!("invalid http request line: {}", line))?;
        let version = fields.next().map(str::to_string);

        if method_raw.is_empty() {
            bail!("invalid http request line: missing method");
        }
        if !target_raw.starts_with('/') {
            bail!("target must start with '/': {}", target_raw);
        }

        let request_line = Self {
            method: HttpMethod::from(method_raw),
            target: target_raw.to_string(),
            version,
        };
        Ok((request_line, line_len + 1))
    }
}

/// A request parsed from the bytes of a single read.
///
/// `body` holds whatever followed the header block in that read; the rest of a
/// larger body is still waiting on the connection.
#[derive(Debug, Clone)]
pub struct Request {
    pub request_line: RequestLine,
    pub path_segments: Vec<String>,
    pub headers: Headers,
    body: Vec<u8>,
}

impl Request {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (request_line, consumed) = RequestLine::parse_request_line(data)?;
        let (headers, header_len) =
            Headers::parse_headers(&data[consumed..]).context("invalid header block")?;
        let body = data[consumed + header_len..].to_vec();
        let path_segments = request_line.target.split('/').map(str::to_string).collect();

        Ok(Self {
            request_line,
            path_segments,
            headers,
            body,
        })
    }

    pub fn method(&self) -> &HttpMethod {
        &self.request_line.method
    }

    pub fn path(&self) -> &str {
        &self.request_line.target
    }

    /// Reads exactly `len` body bytes, taking buffered bytes first and the
    /// remainder from `conn`.
    ///
    /// `len` comes from the client, so the buffer only grows as bytes arrive.
    pub async fn read_body<R>(&self, conn: &mut R, len: usize) -> Result<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        let buffered = self.body.len().min(len);
        let mut body = self.body[..buffered].to_vec();
        let remaining = (len - buffered) as u64;
        if remaining > 0 {
            conn.take(remaining)
                .read_to_end(&mut body)
                .await
                .context("error reading request body")?;
        }
        if body.len() < len {
            bail!("request body ended after {} of {} bytes", body.len(), len);
        }
        Ok(body)
    }
}
