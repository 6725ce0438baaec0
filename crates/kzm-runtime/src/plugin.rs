//! The plugin trait and the command table every registered plugin exposes.
//!
//! §9's design notes replace the source's reflective plugin discovery
//! (`leaf_subclasses`) with an explicit, ordered registration list built by
//! the binary at startup, and its duck-typed `on_command_*` lookup with an
//! explicit table of [`CommandSpec`]s built once per plugin.

use async_trait::async_trait;

use crate::command::{CommandSpec, Outcome};
use crate::event::Ambient;

/// One plugin: a fixed name, a command table, and the optional event hooks
/// the source allows any plugin to override. Every hook defaults to "not my
/// concern" so a plugin only needs to implement what it actually handles.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable name used in logs and in `leaf_subclasses`-equivalent
    /// discovery diagnostics.
    fn plugin_name(&self) -> &str;

    /// The commands this plugin answers to. Consulted once per dispatch;
    /// implementations typically return a clone of a table built in `new`.
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }

    /// Generic message hook, tried when no registered command matches.
    async fn on_message(&self, _ambient: Ambient) -> Outcome {
        Outcome::Absent
    }

    /// A previously sent message was recalled.
    async fn on_message_deleted(&self, _ambient: Ambient) -> Outcome {
        Outcome::Absent
    }

    /// An offline private file or a new group file arrived.
    async fn on_file(&self, _context: i64, _sender: i64, _name: &str, _size: i64, _url: &str) -> Outcome {
        Outcome::Absent
    }

    /// A friend-add or group-join request. `None` passes it to the next
    /// plugin; `Some(true)`/`Some(false)` accepts/rejects it.
    async fn on_admission(&self, _context: i64, _sender: i64, _comment: &str) -> Option<bool> {
        None
    }

    /// Called roughly once a minute. May not hijack the pipeline — there is
    /// deliberately no return value to reply with.
    async fn on_interval(&self) {}
}
