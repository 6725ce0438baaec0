// SPDX-License-Identifier: MIT OR Apache-2.0
//! Illustrative plugins demonstrating the plugin contract — every module
//! here is an example, not a contract the runtime itself depends on.
#![deny(unsafe_code)]

pub mod clock;
pub mod commander;
pub mod demo;
pub mod help;
pub mod ledger;

pub use clock::Clock;
pub use commander::Commander;
pub use demo::Demo;
pub use help::Help;
pub use ledger::{Ledger, Tally};
