use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::ServerConfig;
use crate::handlers::dispatch_handler;
use crate::request::Request;
use crate::response::ResponseWriter;

/// Serves one request on `conn` and closes it. Errors end the cycle without a
/// response and never reach the caller.
pub async fn handle_connection<S>(mut conn: S, addr: SocketAddr, config: &ServerConfig)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::debug!(peer = %addr, "accepted connection");
    if let Err(e) = serve_one(&mut conn, config).await {
        tracing::warn!(peer = %addr, error = %format!("{:#}", e), "connection aborted");
    }
    let _ = conn.shutdown().await;
    tracing::debug!(peer = %addr, "terminating connection");
}

/// One read, one parse, one response. The request must fit in a single read
/// of `config.read_buffer_size` bytes; anything beyond is left unparsed.
pub async fn serve_one<S>(conn: &mut S, config: &ServerConfig) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; config.read_buffer_size];
    let n = conn.read(&mut buf).await.context("error reading request")?;
    if n == 0 {
        bail!("connection closed before a request arrived");
    }

    let request = Request::parse(&buf[..n]).context("error parsing request")?;
    let response = dispatch_handler(&request, conn, config).await;
    tracing::info!(
        request = %request.request_line,
        status = response.status.code(),
        "request served"
    );

    ResponseWriter::from(conn)
        .write_all(&response)
        .await
        .context("error writing response")?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::io::duplex;

    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    async fn exchange(request: &[u8], config: ServerConfig) -> Vec<u8> {
        let (mut client, server) = duplex(64 * 1024);
        let serve =
            tokio::spawn(async move { handle_connection(server, addr(), &config).await });
        client.write_all(request).await.unwrap();
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        serve.await.unwrap();
        out
    }

    #[tokio::test]
    async fn full_cycle() {
        let raw = b"GET /echo/abc HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let out = exchange(raw, ServerConfig::default()).await;
        assert_eq!(
            out,
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\nabc"
        );
    }

    #[tokio::test]
    async fn root_response_bytes() {
        let out = exchange(b"GET / HTTP/1.1\r\n\r\n", ServerConfig::default()).await;
        assert_eq!(out, b"HTTP/1.1 200 OK\r\n\r\n");
    }

    #[tokio::test]
    async fn malformed_request_gets_no_response() {
        let cases: [&[u8]; 3] = [
            b"GARBAGE\r\n\r\n",
            b"GET / HTTP/1.1\r\nbroken header\r\n\r\n",
            b"GET nopath HTTP/1.1\r\n\r\n",
        ];
        for raw in cases {
            assert!(exchange(raw, ServerConfig::default()).await.is_empty());
        }
    }

    #[tokio::test]
    async fn request_larger_than_buffer_is_not_answered() {
        let config = ServerConfig {
            read_buffer_size: 32,
            ..ServerConfig::default()
        };
        let raw = b"GET /user-agent HTTP/1.1\r\nUser-Agent: a-rather-long-agent-string\r\n\r\n";
        let out = exchange(raw, config).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn eof_without_data_closes_quietly() {
        let (client, server) = duplex(1024);
        drop(client);
        let config = ServerConfig::default();
        tokio::time::timeout(Duration::from_secs(1), handle_connection(server, addr(), &config))
            .await
            .unwrap();
    }
}
