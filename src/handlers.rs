use std::io::{ErrorKind, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::io::AsyncRead;

use crate::config::ServerConfig;
use crate::request::{HttpMethod, Request};
use crate::response::{HttpResponse, HttpStatus};
use crate::router::{accepts_gzip, route, RouteDecision};

// Handler error type
#[derive(Debug)]
pub struct HandlerError {
    pub status_code: HttpStatus,
    pub message: String,
}

impl HandlerError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status_code: HttpStatus::InternalServerError,
            message: message.into(),
        }
    }

    pub fn to_response(&self) -> HttpResponse {
        HttpResponse::new().with_status(self.status_code)
    }
}

/// Routes `req` and runs its handler. `body` is the connection the request
/// arrived on, read from only by routes that consume a request body.
pub async fn dispatch_handler<R: AsyncRead + Unpin>(
    req: &Request,
    body: &mut R,
    config: &ServerConfig,
) -> HttpResponse {
    let result = match route(req.method(), &req.path_segments) {
        RouteDecision::Root => Ok(HttpResponse::new()),
        RouteDecision::Echo(message) => echo_handler(req, message),
        RouteDecision::UserAgent => Ok(user_agent_handler(req)),
        RouteDecision::File { name, method } => {
            file_handler(req, body, config, name, method).await
        }
        RouteDecision::NotFound => Ok(not_found()),
    };

    result.unwrap_or_else(|e| {
        tracing::warn!(
            path = %req.path(),
            status = e.status_code.code(),
            error = %e.message,
            "handler failed"
        );
        e.to_response()
    })
}

fn not_found() -> HttpResponse {
    HttpResponse::new().with_status(HttpStatus::NotFound)
}

pub fn echo_handler(req: &Request, message: &str) -> Result<HttpResponse, HandlerError> {
    if !accepts_gzip(&req.headers) {
        return Ok(HttpResponse::new().with_body("text/plain", message.as_bytes().to_vec()));
    }
    let compressed = gzip(message.as_bytes())
        .map_err(|e| HandlerError::internal(format!("gzip failed: {}", e)))?;
    Ok(HttpResponse::new()
        .with_header("Content-Encoding", "gzip")
        .with_body("text/plain", compressed))
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn user_agent_handler(req: &Request) -> HttpResponse {
    let agent = req.headers.get("User-Agent").map(String::as_str).unwrap_or("");
    HttpResponse::new().with_body("text/plain", agent.as_bytes().to_vec())
}

pub async fn file_handler<R: AsyncRead + Unpin>(
    req: &Request,
    body: &mut R,
    config: &ServerConfig,
    name: &str,
    method: &HttpMethod,
) -> Result<HttpResponse, HandlerError> {
    let Some(directory) = config.directory.as_ref() else {
        return Err(HandlerError::internal("no directory configured for file routes"));
    };
    let path = directory.join(name);

    match method {
        HttpMethod::Get => match tokio::fs::read(&path).await {
            Ok(data) => Ok(HttpResponse::new().with_body("application/octet-stream", data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(not_found()),
            Err(e) => Err(HandlerError::internal(format!("reading {}: {}", path.display(), e))),
        },
        HttpMethod::Post => {
            let len = match req.headers.get("Content-Length") {
                Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                    HandlerError::internal(format!("invalid Content-Length '{}': {}", raw, e))
                })?,
                None => 0,
            };
            let data = req
                .read_body(body, len)
                .await
                .map_err(|e| HandlerError::internal(format!("{:#}", e)))?;
            tokio::fs::write(&path, &data).await.map_err(|e| {
                HandlerError::internal(format!("writing {}: {}", path.display(), e))
            })?;
            tracing::debug!(path = %path.display(), bytes = data.len(), "file written");
            Ok(HttpResponse::new().with_status(HttpStatus::Created))
        }
        HttpMethod::Other(_) => Ok(not_found()),
    }
}
