// SPDX-License-Identifier: MIT OR Apache-2.0
//! The event-driven core: decodes gateway events, runs them through the
//! conversation-flow engine and the command router, and hosts the ordered
//! plugin pipeline that ties everything to the document store.
#![deny(unsafe_code)]

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod flow;
pub mod help;
pub mod host;
pub mod plugin;

pub use command::{CommandFuture, CommandSpec, Outcome};
pub use error::RuntimeError;
pub use event::{context_sender_from_event, parse_event, Ambient, GatewayEvent, RequestKind, SenderMeta};
pub use flow::{Flow, FlowStep, FlowTable};
pub use help::HelpRegistry;
pub use host::PipelineHost;
pub use plugin::Plugin;
