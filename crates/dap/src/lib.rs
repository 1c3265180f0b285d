// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dapmux-dap: the Debug Adapter Protocol layer.
//!
//! Wire format: `Content-Length: <N>\r\n\r\n` + N UTF-8 bytes of JSON.
//! [`client::DapClient`] frames and correlates messages on a duplex byte
//! stream; [`adapter::DebugAdapter`] owns the adapter subprocess and exposes
//! the typed operation surface sessions call.

pub mod adapter;
pub mod client;
pub mod error;
pub mod types;
pub mod wire;

pub use adapter::{
    AdapterEvent, AdapterOptions, AttachConfig, ConsoleMode, DebugAdapter, EventSink,
    ExceptionFilter, LaunchConfig,
};
pub use client::{ClientOptions, DapClient, EventHandler};
pub use error::DapError;
