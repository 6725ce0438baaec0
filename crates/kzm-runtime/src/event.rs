//! Decodes a raw gateway event payload into a typed [`GatewayEvent`], and
//! carries the four ambient values (`context`, `sender`, `text`,
//! `message_id`) every message-shaped handler is bound against.

use kzm_core::ids::{Context, Sender};
use serde_json::Value;

use crate::error::RuntimeError;

/// The ambient parameters a message-shaped handler may ask for by name;
/// bound from the event rather than parsed out of the command text.
#[derive(Clone, Debug)]
pub struct Ambient {
    pub context: Context,
    pub sender: Sender,
    pub text: String,
    pub message_id: i64,
}

/// Opportunistic sender metadata present on most message events, used to
/// feed the name cache without a round trip to the gateway.
#[derive(Clone, Debug)]
pub struct SenderMeta {
    pub nickname: String,
    pub card: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Friend,
    Group,
}

/// A decoded inbound event, post-`post_type`/`notice_type` dispatch.
#[derive(Clone, Debug)]
pub enum GatewayEvent {
    Message { context: Context, sender: Sender, raw_message: String, message_id: i64, sender_meta: Option<SenderMeta> },
    Request { context: Context, sender: Sender, comment: String, flag: String, kind: RequestKind, sub_type: String },
    MetaEvent,
    MessageRecalled { context: Context, sender: Sender, message_id: i64 },
    OfflineFile { context: Context, sender: Sender, name: String, size: i64, url: String },
    GroupUpload { context: Context, sender: Sender, name: String, size: i64, file_id: String, bus_id: i64 },
    /// A `notice_type` outside the four this runtime understands. Not an
    /// error: go-cqhttp emits many notice kinds the source silently ignores.
    Ignored,
}

/// Extracts `(context, sender)` the same way as every event kind: `sender`
/// is `user_id` (or zero), `context` is the negated `group_id` if present,
/// otherwise `sender` itself.
pub fn context_sender_from_event(data: &Value) -> (Context, Sender) {
    let sender = field_i64(data, "user_id").unwrap_or(0);
    let group_id = field_i64(data, "group_id");
    kzm_core::ids::context_sender_from(Some(sender), group_id)
}

pub fn parse_event(data: &Value) -> Result<GatewayEvent, RuntimeError> {
    let post_type = data
        .get("post_type")
        .and_then(Value::as_str)
        .ok_or(RuntimeError::MissingField("post_type"))?;
    let (context, sender) = context_sender_from_event(data);

    match post_type {
        "message" => {
            let raw_message = string_field(data, "raw_message")?;
            let message_id = int_field(data, "message_id")?;
            let sender_meta = data.get("sender").map(|s| SenderMeta {
                nickname: s.get("nickname").and_then(Value::as_str).unwrap_or_default().to_string(),
                card: s.get("card").and_then(Value::as_str).map(str::to_string),
            });
            Ok(GatewayEvent::Message { context, sender, raw_message, message_id, sender_meta })
        }
        "request" => {
            let comment = string_field(data, "comment")?;
            let flag = string_field(data, "flag")?;
            let kind = match string_field(data, "request_type")?.as_str() {
                "friend" => RequestKind::Friend,
                "group" => RequestKind::Group,
                other => return Err(RuntimeError::MalformedField { field: "request_type", detail: other.to_string() }),
            };
            let sub_type = data.get("sub_type").and_then(Value::as_str).unwrap_or_default().to_string();
            Ok(GatewayEvent::Request { context, sender, comment, flag, kind, sub_type })
        }
        "meta_event" => Ok(GatewayEvent::MetaEvent),
        "notice" => match data.get("notice_type").and_then(Value::as_str) {
            Some("friend_recall") | Some("group_recall") => {
                Ok(GatewayEvent::MessageRecalled { context, sender, message_id: int_field(data, "message_id")? })
            }
            Some("offline_file") => {
                let file = data.get("file").ok_or(RuntimeError::MissingField("file"))?;
                Ok(GatewayEvent::OfflineFile {
                    context,
                    sender,
                    name: string_field(file, "name")?,
                    size: int_field(file, "size")?,
                    url: string_field(file, "url")?,
                })
            }
            Some("group_upload") => {
                let file = data.get("file").ok_or(RuntimeError::MissingField("file"))?;
                Ok(GatewayEvent::GroupUpload {
                    context,
                    sender,
                    name: string_field(file, "name")?,
                    size: int_field(file, "size")?,
                    file_id: string_field(file, "id")?,
                    bus_id: int_field(file, "busid")?,
                })
            }
            _ => Ok(GatewayEvent::Ignored),
        },
        other => Err(RuntimeError::UnknownPostType(other.to_string())),
    }
}

fn field_i64(data: &Value, key: &str) -> Option<i64> {
    match data.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string_field(data: &Value, key: &'static str) -> Result<String, RuntimeError> {
    data.get(key).and_then(Value::as_str).map(str::to_string).ok_or(RuntimeError::MissingField(key))
}

fn int_field(data: &Value, key: &'static str) -> Result<i64, RuntimeError> {
    field_i64(data, key).ok_or(RuntimeError::MissingField(key))
}
