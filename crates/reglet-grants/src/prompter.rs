//! Line-oriented interactive capability prompter.

use reglet_types::PolicyRequest;
use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Allow,
    Deny,
    Always,
}

#[derive(Debug, Error)]
pub enum PrompterError {
    #[error("non-interactive: missing capabilities: {0}")]
    NonInteractive(String),
    #[error("failed to read prompt response: {0}")]
    Io(#[from] std::io::Error),
}

impl PrompterError {
    pub fn to_wire(&self) -> reglet_types::ErrorDetail {
        reglet_types::ErrorDetail::capability(self.to_string())
    }
}

/// Risk label shown in a prompt line, attached by the caller per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl Risk {
    fn as_str(&self) -> &'static str {
        match self {
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        }
    }
}

/// Drives the line-buffered allow/deny/always dialog over arbitrary
/// reader/writer streams, so tests can supply an in-memory pair instead of
/// real stdin/stdout.
pub struct Prompter<R, W> {
    reader: R,
    writer: W,
    interactive: bool,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(reader: R, writer: W, interactive: bool) -> Self {
        Self {
            reader,
            writer,
            interactive,
        }
    }

    /// Prompt for a single capability request. Any response other than a
    /// known token is treated as deny.
    pub fn prompt_one(
        &mut self,
        request: &PolicyRequest,
        risk: Risk,
    ) -> Result<Choice, PrompterError> {
        if !self.interactive {
            return Err(PrompterError::NonInteractive(request.describe()));
        }

        writeln!(self.writer, "Plugin Request: {}", request.describe())?;
        writeln!(self.writer, "Risk: {}", risk.as_str())?;
        write!(self.writer, "Allow? [y/n/always]: ")?;
        self.writer.flush()?;

        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(parse_choice(&line))
    }

    /// Prompt once for an entire batch of requests, authorizing all or
    /// none.
    pub fn prompt_batch(
        &mut self,
        requests: &[PolicyRequest],
    ) -> Result<Choice, PrompterError> {
        if !self.interactive {
            let missing = requests
                .iter()
                .map(|r| r.describe())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(PrompterError::NonInteractive(missing));
        }

        for request in requests {
            writeln!(self.writer, "Plugin Request: {}", request.describe())?;
        }
        write!(self.writer, "Grant all? [y/n]: ")?;
        self.writer.flush()?;

        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(match parse_choice(&line) {
            Choice::Always => Choice::Allow,
            other => other,
        })
    }
}

fn parse_choice(line: &str) -> Choice {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Choice::Allow,
        "always" => Choice::Always,
        _ => Choice::Deny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reglet_types::{EnvironmentRequest, NetworkRequest};
    use std::io::Cursor;

    fn request() -> PolicyRequest {
        PolicyRequest::Network(NetworkRequest {
            host: "example.com".into(),
            port: 443,
        })
    }

    #[test]
    fn non_interactive_single_request_is_an_error_not_a_prompt() {
        let mut prompter = Prompter::new(Cursor::new(Vec::new()), Vec::new(), false);
        let err = prompter.prompt_one(&request(), Risk::Medium).unwrap_err();
        match err {
            PrompterError::NonInteractive(desc) => {
                assert!(desc.contains("network outbound:example.com:443"))
            }
            other => panic!("expected NonInteractive, got {other:?}"),
        }
    }

    #[test]
    fn non_interactive_batch_enumerates_every_missing_capability() {
        let requests = vec![
            request(),
            PolicyRequest::Environment(EnvironmentRequest {
                variable: "HOME".into(),
            }),
        ];
        let mut prompter = Prompter::new(Cursor::new(Vec::new()), Vec::new(), false);
        let err = prompter.prompt_batch(&requests).unwrap_err();
        match err {
            PrompterError::NonInteractive(desc) => {
                assert!(desc.contains("example.com"));
                assert!(desc.contains("HOME"));
            }
            other => panic!("expected NonInteractive, got {other:?}"),
        }
    }

    #[test]
    fn interactive_yes_allows() {
        let mut prompter = Prompter::new(Cursor::new(b"y\n".to_vec()), Vec::new(), true);
        assert_eq!(prompter.prompt_one(&request(), Risk::Low).unwrap(), Choice::Allow);
    }

    #[test]
    fn interactive_always_is_distinct_from_allow() {
        let mut prompter = Prompter::new(Cursor::new(b"always\n".to_vec()), Vec::new(), true);
        assert_eq!(
            prompter.prompt_one(&request(), Risk::Low).unwrap(),
            Choice::Always
        );
    }

    #[test]
    fn unrecognized_response_denies() {
        let mut prompter = Prompter::new(Cursor::new(b"maybe\n".to_vec()), Vec::new(), true);
        assert_eq!(prompter.prompt_one(&request(), Risk::Low).unwrap(), Choice::Deny);
    }

    #[test]
    fn batch_always_collapses_to_allow() {
        let mut prompter = Prompter::new(Cursor::new(b"always\n".to_vec()), Vec::new(), true);
        assert_eq!(prompter.prompt_batch(&[request()]).unwrap(), Choice::Allow);
    }
}
