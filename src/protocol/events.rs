/*!
 * Typed stream events.
 *
 * Every recognised event-type label maps to one `EventLabel` variant, and
 * every decoded frame to one `StreamEvent`. Adding a stage means adding a
 * variant, and the exhaustive matches below then point at every place that
 * has to handle it.
 */

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::sse::SseFrame;

/// Ordered pipeline stages reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    Initializing,
    Connected,
    Classifying,
    Categorized,
    Subcategorized,
    Transforming,
    Formatting,
    Complete,
}

impl Stage {
    /// Position in the pipeline, used for advance-or-ignore ordering
    pub fn index(self) -> usize {
        self as usize
    }

    /// Default human status line for the stage
    pub fn default_status(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Connected => "connected",
            Self::Classifying => "classifying input",
            Self::Categorized => "category assigned",
            Self::Subcategorized => "sub-category assigned",
            Self::Transforming => "transforming",
            Self::Formatting => "transformation complete, formatting",
            Self::Complete => "",
        }
    }
}

/// Closed set of event-type labels understood on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventLabel {
    Classifying,
    IsResume,
    Category,
    Subcategory,
    Modified,
    Formatting,
    FormatUpdate,
    Success,
    Error,
    // Labels carried in the JSON `type` field of data-only frames
    LegacyStart,
    LegacyUpdate,
    LegacyCategory,
    LegacySubcategory,
    LegacyTransformed,
    LegacyVerified,
    LegacyEnd,
}

impl EventLabel {
    /// Resolve a named `event:` label
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "classifying" => Some(Self::Classifying),
            "is_resume" => Some(Self::IsResume),
            "category" => Some(Self::Category),
            "subcategory" => Some(Self::Subcategory),
            "modified" => Some(Self::Modified),
            "formatting" => Some(Self::Formatting),
            "format_update" => Some(Self::FormatUpdate),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Resolve the `type` field of a data-only frame
    pub fn from_legacy_type(kind: &str) -> Option<Self> {
        match kind {
            "start" => Some(Self::LegacyStart),
            "update" => Some(Self::LegacyUpdate),
            "end1" => Some(Self::LegacyCategory),
            "end12" => Some(Self::LegacySubcategory),
            "end2" => Some(Self::LegacyTransformed),
            "end3" => Some(Self::LegacyVerified),
            "end" => Some(Self::LegacyEnd),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether an event with this label ends the session
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Error | Self::LegacyVerified | Self::LegacyEnd
        )
    }
}

/// A decoded inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The server acknowledged the job
    Started,
    /// Input classification is running
    Classifying { status: Option<String> },
    /// Verdict on whether the text is valid job input
    DomainVerdict { accepted: bool },
    /// A category was assigned
    CategoryAssigned { category: Option<String> },
    /// A sub-category was assigned
    SubcategoryAssigned { subcategory: Option<String> },
    /// Full candidate output; replaces any earlier snapshot
    Snapshot {
        text: String,
        stage: Option<Stage>,
        status: Option<String>,
    },
    /// Transformation finished, formatting in progress
    Formatting { status: Option<String> },
    /// Terminal success, optionally carrying the final output
    Succeeded { text: Option<String> },
    /// Terminal business failure reported by the server
    ServerError { message: Option<String> },
}

impl StreamEvent {
    /// Decode a raw frame into a typed event
    pub fn decode(frame: &SseFrame) -> Result<Self, DecodeError> {
        match frame.event.as_deref() {
            Some(name) if name != "message" => {
                let label = EventLabel::from_event_name(name)
                    .ok_or_else(|| DecodeError::unknown(name))?;
                decode_payload(label, name, &frame.data)
            }
            _ => decode_legacy(&frame.data),
        }
    }
}

/// A frame that could not be turned into a `StreamEvent`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed `{label}` event: {reason}")]
pub struct DecodeError {
    /// Label as seen on the wire, or `message` when unknown
    pub label: String,
    /// Whether the frame was a terminal envelope
    pub terminal: bool,
    /// What went wrong
    pub reason: String,
}

impl DecodeError {
    fn unknown(label: &str) -> Self {
        Self {
            label: label.to_string(),
            terminal: false,
            reason: "unrecognised event type".to_string(),
        }
    }

    fn invalid(label: EventLabel, wire: &str, reason: impl ToString) -> Self {
        Self {
            label: wire.to_string(),
            terminal: label.is_terminal(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnapshotPayload {
    text: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Verdict {
    Flag(bool),
    Word(String),
}

#[derive(Debug, Deserialize)]
struct VerdictPayload {
    #[serde(alias = "text", alias = "valid")]
    is_resume: Verdict,
}

#[derive(Debug, Default, Deserialize)]
struct TerminalPayload {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse a payload, treating an empty body as all-defaults
fn parse_optional<T>(data: &str) -> Result<T, serde_json::Error>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if data.trim().is_empty() {
        Ok(T::default())
    } else {
        serde_json::from_str(data)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn decode_payload(label: EventLabel, wire: &str, data: &str) -> Result<StreamEvent, DecodeError> {
    let invalid = |e: serde_json::Error| DecodeError::invalid(label, wire, e);

    let event = match label {
        EventLabel::LegacyStart => StreamEvent::Started,
        EventLabel::Classifying => {
            let p: StatusPayload = parse_optional(data).map_err(invalid)?;
            StreamEvent::Classifying {
                status: non_empty(p.status.or(p.text)),
            }
        }
        EventLabel::IsResume => {
            let p: VerdictPayload = serde_json::from_str(data).map_err(invalid)?;
            let accepted = match p.is_resume {
                Verdict::Flag(flag) => flag,
                Verdict::Word(word) => match word.trim().to_lowercase().as_str() {
                    "yes" | "true" | "y" => true,
                    "no" | "false" | "n" => false,
                    other => {
                        return Err(DecodeError::invalid(
                            label,
                            wire,
                            format!("unrecognised verdict '{}'", other),
                        ));
                    }
                },
            };
            StreamEvent::DomainVerdict { accepted }
        }
        EventLabel::Category | EventLabel::LegacyCategory => {
            let p: StatusPayload = parse_optional(data).map_err(invalid)?;
            StreamEvent::CategoryAssigned {
                category: non_empty(p.text.or(p.status)),
            }
        }
        EventLabel::Subcategory | EventLabel::LegacySubcategory => {
            let p: StatusPayload = parse_optional(data).map_err(invalid)?;
            StreamEvent::SubcategoryAssigned {
                subcategory: non_empty(p.text.or(p.status)),
            }
        }
        EventLabel::Modified | EventLabel::FormatUpdate | EventLabel::LegacyUpdate => {
            let p: SnapshotPayload = serde_json::from_str(data).map_err(invalid)?;
            let stage = match label {
                EventLabel::Modified => Some(Stage::Transforming),
                EventLabel::FormatUpdate => Some(Stage::Formatting),
                _ => None,
            };
            StreamEvent::Snapshot {
                text: p.text,
                stage,
                status: non_empty(p.status),
            }
        }
        EventLabel::Formatting | EventLabel::LegacyTransformed => {
            let p: StatusPayload = parse_optional(data).map_err(invalid)?;
            // The legacy envelope repeats the output in `text`; only `status` is a status line
            let status = if label == EventLabel::Formatting {
                p.status.or(p.text)
            } else {
                p.status
            };
            StreamEvent::Formatting {
                status: non_empty(status),
            }
        }
        EventLabel::Success | EventLabel::LegacyEnd => {
            let p: TerminalPayload = parse_optional(data).map_err(invalid)?;
            StreamEvent::Succeeded { text: p.text }
        }
        EventLabel::LegacyVerified => {
            // Its `text` is the pre-verification draft, so the streamed snapshot wins
            let _: TerminalPayload = parse_optional(data).map_err(invalid)?;
            StreamEvent::Succeeded { text: None }
        }
        EventLabel::Error => {
            let p: ErrorPayload = parse_optional(data).map_err(invalid)?;
            StreamEvent::ServerError {
                message: non_empty(p.message.or(p.error)),
            }
        }
    };
    Ok(event)
}

fn decode_legacy(data: &str) -> Result<StreamEvent, DecodeError> {
    let value: Value = serde_json::from_str(data).map_err(|e| DecodeError {
        label: "message".to_string(),
        terminal: false,
        reason: e.to_string(),
    })?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError {
            label: "message".to_string(),
            terminal: false,
            reason: "missing `type` field".to_string(),
        })?;

    let label = EventLabel::from_legacy_type(kind).ok_or_else(|| DecodeError::unknown(kind))?;
    decode_payload(label, kind, data)
}
