// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identifiers, the message-entity codec, and command-name normalisation —
//! the small, dependency-free vocabulary the rest of the runtime is built
//! on.
#![deny(unsafe_code)]

pub mod command;
pub mod entity;
pub mod humanity;
pub mod ids;

pub use command::{ArgValue, CommandSyntaxError, ParamDescriptor, ParamKind, parse_command};
pub use entity::{decode, encode, ESC_CLOSE, ESC_OPEN, NUL};
pub use humanity::{command_body_after_name, format_timespan, is_command_attempt, normalize, tokenize_command_name};
pub use ids::{context_sender_from, group_id, is_group, is_system, Context, Sender};
