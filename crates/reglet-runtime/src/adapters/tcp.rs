//! Raw TCP adapter: connect, write the payload, read whatever comes back.

use reglet_types::wire::{TcpRequest, TcpResponse};
use reglet_types::ErrorDetail;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

pub async fn connect(request: &TcpRequest, timeout_ms: Option<u64>) -> TcpResponse {
    let budget = Duration::from_millis(timeout_ms.unwrap_or(10_000));
    let address = format!("{}:{}", request.host, request.port);

    let result = timeout(budget, async {
        let mut stream = TcpStream::connect(&address).await?;
        if !request.payload.is_empty() {
            stream.write_all(request.payload.as_bytes()).await?;
        }
        stream.shutdown().await.ok();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    })
    .await;

    match result {
        Ok(Ok(bytes)) => TcpResponse {
            payload: String::from_utf8_lossy(&bytes).into_owned(),
            error: None,
        },
        Ok(Err(e)) => TcpResponse {
            payload: String::new(),
            error: Some(ErrorDetail::new(
                reglet_types::ErrorKind::Network,
                "tcp_connect_failed",
                e.to_string(),
            )),
        },
        Err(_) => TcpResponse {
            payload: String::new(),
            error: Some(ErrorDetail::timeout(
                "tcp_timeout",
                format!("connection to {address} exceeded its budget"),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt as _;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn echoes_payload_from_a_loopback_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            let _ = tokio::io::AsyncReadExt::read_exact(&mut socket, &mut buf).await;
            socket.write_all(b"reply").await.unwrap();
        });

        let response = connect(
            &TcpRequest {
                host: addr.ip().to_string(),
                port: addr.port(),
                payload: "hello".to_string(),
            },
            Some(2_000),
        )
        .await;

        assert!(response.error.is_none());
        assert_eq!(response.payload, "reply");
    }

    #[tokio::test]
    async fn connection_refused_reports_a_network_error() {
        let response = connect(
            &TcpRequest {
                host: "127.0.0.1".to_string(),
                port: 1,
                payload: String::new(),
            },
            Some(500),
        )
        .await;
        assert!(response.error.is_some());
    }
}
