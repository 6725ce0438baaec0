// SPDX-License-Identifier: MIT OR Apache-2.0
//! The outbound side of the chat gateway: an HTTP client for the local
//! gateway process's RPC API, and the display-name cache built on top of
//! it.
#![deny(unsafe_code)]

pub mod error;
pub mod gateway;
pub mod names;

pub use error::GatewayError;
pub use gateway::Gateway;
pub use names::NameCache;
