//! The `(context, sender)` identifier convention shared across the runtime.
//!
//! A single signed integer carries both the conversation and the sender: a
//! positive `Context` is a one-to-one conversation with that participant, a
//! negative one is a group (its absolute value is the gateway-side group
//! id), and a `Sender` of zero marks a system-originated event.

/// Signed conversation identifier. Positive: direct message. Negative: group
/// (absolute value is the gateway's group id). Zero: no channel to reply to.
pub type Context = i64;

/// Signed participant identifier. Zero means the event has no real sender
/// (e.g. a periodic keepalive).
pub type Sender = i64;

/// `true` when `context` addresses a group rather than a one-to-one chat.
pub fn is_group(context: Context) -> bool {
    context < 0
}

/// The gateway-side group id for a group `context`, or `None` for a
/// one-to-one `context`.
pub fn group_id(context: Context) -> Option<i64> {
    is_group(context).then(|| -context)
}

/// `true` when `sender` marks a system-originated event rather than a real
/// participant.
pub fn is_system(sender: Sender) -> bool {
    sender == 0
}

/// Derives `(context, sender)` from the gateway's `user_id`/`group_id`
/// fields, mirroring the source's rule: a private message's context is its
/// sender; a group message's context is the negated group id.
pub fn context_sender_from(user_id: Option<i64>, group_id: Option<i64>) -> (Context, Sender) {
    let sender = user_id.unwrap_or(0);
    let context = match group_id {
        Some(g) => -g,
        None => sender,
    };
    (context, sender)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_message_context_is_sender() {
        assert_eq!(context_sender_from(Some(7), None), (7, 7));
    }

    #[test]
    fn group_message_context_is_negated_group_id() {
        assert_eq!(context_sender_from(Some(9), Some(2)), (-2, 9));
    }

    #[test]
    fn system_event_has_no_sender() {
        assert_eq!(context_sender_from(None, None), (0, 0));
        assert!(is_system(0));
    }

    #[test]
    fn group_id_round_trips() {
        assert_eq!(group_id(-2), Some(2));
        assert_eq!(group_id(7), None);
    }
}
