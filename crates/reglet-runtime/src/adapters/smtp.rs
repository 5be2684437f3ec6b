//! Minimal SMTP adapter: a hand-rolled HELO/MAIL FROM/RCPT TO/DATA/QUIT
//! dialogue over a plain TCP socket. No MIME, no auth, no TLS — enough to
//! exercise the `smtp_send` host function's wire contract.

use reglet_types::wire::{SmtpRequest, SmtpResponse};
use reglet_types::ErrorDetail;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

const SUCCESS_CODES: &[&str] = &["220", "221", "250", "221", "354"];

pub async fn send(request: &SmtpRequest, timeout_ms: Option<u64>) -> SmtpResponse {
    let budget = Duration::from_millis(timeout_ms.unwrap_or(10_000));
    match timeout(budget, dialogue(request)).await {
        Ok(Ok(())) => SmtpResponse {
            accepted: true,
            error: None,
        },
        Ok(Err(e)) => SmtpResponse {
            accepted: false,
            error: Some(ErrorDetail::new(
                reglet_types::ErrorKind::Network,
                "smtp_send_failed",
                e,
            )),
        },
        Err(_) => SmtpResponse {
            accepted: false,
            error: Some(ErrorDetail::timeout(
                "smtp_timeout",
                "SMTP dialogue exceeded its budget",
            )),
        },
    }
}

async fn dialogue(request: &SmtpRequest) -> Result<(), String> {
    let address = format!("{}:{}", request.host, request.port);
    let stream = TcpStream::connect(&address)
        .await
        .map_err(|e| e.to_string())?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    read_reply(&mut reader).await?;
    send_line(&mut write_half, &format!("HELO {}\r\n", local_name())).await?;
    read_reply(&mut reader).await?;
    send_line(&mut write_half, &format!("MAIL FROM:<{}>\r\n", request.from)).await?;
    read_reply(&mut reader).await?;
    for recipient in &request.to {
        send_line(&mut write_half, &format!("RCPT TO:<{recipient}>\r\n")).await?;
        read_reply(&mut reader).await?;
    }
    send_line(&mut write_half, "DATA\r\n").await?;
    read_reply(&mut reader).await?;

    let message = format!(
        "Subject: {}\r\n\r\n{}\r\n.\r\n",
        request.subject, request.body
    );
    send_line(&mut write_half, &message).await?;
    read_reply(&mut reader).await?;

    send_line(&mut write_half, "QUIT\r\n").await?;
    read_reply(&mut reader).await?;
    Ok(())
}

fn local_name() -> String {
    "reglet".to_string()
}

async fn send_line(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    line: &str,
) -> Result<(), String> {
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| e.to_string())
}

async fn read_reply(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
) -> Result<String, String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .map_err(|e| e.to_string())?;
    let code = line.get(0..3).unwrap_or("");
    if SUCCESS_CODES.contains(&code) || code.starts_with('2') || code.starts_with('3') {
        Ok(line)
    } else {
        Err(format!("unexpected SMTP reply: {}", line.trim_end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt as _;
    use tokio::net::TcpListener;

    async fn fake_server_line(stream: &mut TcpStream, reply: &str) {
        stream.write_all(reply.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn full_dialogue_is_accepted_by_a_cooperative_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            fake_server_line(&mut socket, "220 ready\r\n").await;
            let (read_half, mut write_half) = socket.into_split();
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            for reply in ["250 ok\r\n", "250 ok\r\n", "250 ok\r\n", "354 go\r\n", "250 ok\r\n", "221 bye\r\n"] {
                line.clear();
                reader.read_line(&mut line).await.unwrap();
                write_half.write_all(reply.as_bytes()).await.unwrap();
            }
        });

        let response = send(
            &SmtpRequest {
                host: addr.ip().to_string(),
                port: addr.port(),
                from: "a@example.com".to_string(),
                to: vec!["b@example.com".to_string()],
                subject: "hi".to_string(),
                body: "hello".to_string(),
            },
            Some(2_000),
        )
        .await;

        assert!(response.accepted);
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn connection_refused_reports_a_network_error() {
        let response = send(
            &SmtpRequest {
                host: "127.0.0.1".to_string(),
                port: 1,
                from: "a@example.com".to_string(),
                to: vec!["b@example.com".to_string()],
                subject: "hi".to_string(),
                body: "hello".to_string(),
            },
            Some(500),
        )
        .await;
        assert!(!response.accepted);
        assert!(response.error.is_some());
    }
}
