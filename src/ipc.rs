//! Events from the assistant loop to the control surface
//!
//! In-process, events travel over a tokio channel. Between processes they
//! are written to the assistant's stdout in one of two line encodings:
//! - `json`: one serialized [`AssistantEvent`] per line
//! - `legacy`: plain text, with the reply bracketed by sentinel lines
//!
//! [`LineDecoder`] accepts both, so a control surface can supervise either.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Line opening a reply block in the legacy encoding
pub const RESPONSE_START: &str = "CHATGPT_RESPONSE_START";

/// Line closing a reply block in the legacy encoding
pub const RESPONSE_END: &str = "CHATGPT_RESPONSE_END";

/// Line announcing an applied configuration in the legacy encoding
pub const CONFIG_APPLIED: &str = "AI assistant configuration updated and saved to file.";

/// Signal emitted by the assistant loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AssistantEvent {
    /// Free-form status line for the operator log
    Diagnostic { line: String },
    /// Complete assistant reply
    Response { text: String },
    /// A new persona configuration was installed
    ConfigApplied,
}

impl AssistantEvent {
    #[must_use]
    pub fn diagnostic(line: impl Into<String>) -> Self {
        Self::Diagnostic { line: line.into() }
    }
}

/// Line encoding used on the assistant's stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum WireFormat {
    #[default]
    Json,
    Legacy,
}

impl WireFormat {
    /// Encode one event as output lines
    #[must_use]
    pub fn encode(self, event: &AssistantEvent) -> Vec<String> {
        match self {
            Self::Json => vec![serde_json::to_string(event).unwrap_or_else(|e| {
                tracing::error!(error = %e, "event serialization failed");
                String::new()
            })],
            Self::Legacy => match event {
                AssistantEvent::Diagnostic { line } => line.lines().map(String::from).collect(),
                AssistantEvent::Response { text } => std::iter::once(RESPONSE_START.to_string())
                    .chain(text.lines().map(String::from))
                    .chain(std::iter::once(RESPONSE_END.to_string()))
                    .collect(),
                AssistantEvent::ConfigApplied => vec![CONFIG_APPLIED.to_string()],
            },
        }
    }
}

/// Reassembles events from stdout lines of either encoding
#[derive(Debug, Default)]
pub struct LineDecoder {
    response: Option<Vec<String>>,
}

impl LineDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self { response: None }
    }

    /// Feed one line; returns an event once one is complete
    pub fn push(&mut self, line: &str) -> Option<AssistantEvent> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(buf) = self.response.as_mut() {
            if line == RESPONSE_END {
                let text = buf.join("\n");
                self.response = None;
                return Some(AssistantEvent::Response { text });
            }
            buf.push(line.to_string());
            return None;
        }

        match line {
            RESPONSE_START => {
                self.response = Some(Vec::new());
                None
            }
            CONFIG_APPLIED => Some(AssistantEvent::ConfigApplied),
            "" => None,
            _ if line.starts_with('{') => Some(
                serde_json::from_str(line).unwrap_or_else(|_| AssistantEvent::diagnostic(line)),
            ),
            _ => Some(AssistantEvent::diagnostic(line)),
        }
    }

    /// Whether a legacy reply block is open
    #[must_use]
    pub const fn in_response(&self) -> bool {
        self.response.is_some()
    }
}

/// Sending half of the event channel
///
/// Sending never fails: a closed channel means nobody is listening, which
/// the assistant loop tolerates.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AssistantEvent>,
}

impl EventSink {
    /// Create a sink and the receiver that drains it
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AssistantEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event
    pub fn emit(&self, event: AssistantEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }

    /// Emit a diagnostic line
    pub fn diagnostic(&self, line: impl Into<String>) {
        self.emit(AssistantEvent::diagnostic(line));
    }
}

/// Write every received event to stdout until the channel closes
pub async fn write_stdout(mut rx: mpsc::UnboundedReceiver<AssistantEvent>, format: WireFormat) {
    use tokio::io::AsyncWriteExt;

    let mut stdout = tokio::io::stdout();
    while let Some(event) = rx.recv().await {
        for line in format.encode(&event) {
            let written = async {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            }
            .await;
            if let Err(e) = written {
                tracing::warn!(error = %e, "stdout closed, dropping events");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(lines: &[String]) -> Vec<AssistantEvent> {
        let mut decoder = LineDecoder::new();
        lines.iter().filter_map(|l| decoder.push(l)).collect()
    }

    #[test]
    fn legacy_response_uses_literal_sentinels() {
        let lines = WireFormat::Legacy.encode(&AssistantEvent::Response {
            text: "line one\nline two".to_string(),
        });
        assert_eq!(
            lines,
            vec!["CHATGPT_RESPONSE_START", "line one", "line two", "CHATGPT_RESPONSE_END"]
        );
    }

    #[test]
    fn legacy_config_applied_is_one_line() {
        assert_eq!(
            WireFormat::Legacy.encode(&AssistantEvent::ConfigApplied),
            vec![CONFIG_APPLIED.to_string()]
        );
    }

    #[test]
    fn legacy_stream_decodes_to_events() {
        let mut lines = WireFormat::Legacy.encode(&AssistantEvent::diagnostic("listening"));
        lines.extend(WireFormat::Legacy.encode(&AssistantEvent::Response {
            text: "hey chat\nwhat's up".to_string(),
        }));
        lines.extend(WireFormat::Legacy.encode(&AssistantEvent::ConfigApplied));

        assert_eq!(
            decode_all(&lines),
            vec![
                AssistantEvent::diagnostic("listening"),
                AssistantEvent::Response {
                    text: "hey chat\nwhat's up".to_string()
                },
                AssistantEvent::ConfigApplied,
            ]
        );
    }

    #[test]
    fn json_stream_decodes_to_events() {
        let events = vec![
            AssistantEvent::diagnostic("ready"),
            AssistantEvent::Response {
                text: "multi\nline".to_string(),
            },
            AssistantEvent::ConfigApplied,
        ];
        let lines: Vec<String> = events
            .iter()
            .flat_map(|e| WireFormat::Json.encode(e))
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(decode_all(&lines), events);
    }

    #[test]
    fn reply_lines_that_look_like_sentinels_stay_inside_block() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(RESPONSE_START).is_none());
        assert!(decoder.in_response());
        assert!(decoder.push(CONFIG_APPLIED).is_none());
        assert_eq!(
            decoder.push(RESPONSE_END),
            Some(AssistantEvent::Response {
                text: CONFIG_APPLIED.to_string()
            })
        );
        assert!(!decoder.in_response());
    }

    #[test]
    fn unparseable_brace_line_is_diagnostic() {
        let mut decoder = LineDecoder::new();
        assert_eq!(
            decoder.push("{not json"),
            Some(AssistantEvent::diagnostic("{not json"))
        );
    }

    #[tokio::test]
    async fn sink_survives_dropped_receiver() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.diagnostic("nobody hears this");
    }

    #[tokio::test]
    async fn sink_delivers_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.diagnostic("a");
        sink.emit(AssistantEvent::ConfigApplied);
        assert_eq!(rx.recv().await, Some(AssistantEvent::diagnostic("a")));
        assert_eq!(rx.recv().await, Some(AssistantEvent::ConfigApplied));
    }
}
