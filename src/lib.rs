// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Monitored item lifecycle management for OPC UA client subscriptions.
//!
//! The [`client::MonitoredItemManager`] turns a desired set of things to observe on a server
//! into server side monitored items, keeps them synchronized as their configuration changes
//! and re-synchronizes handles after a reconnect or a subscription transfer. Wire calls are
//! batched and per item failures are classified into retryable and fatal outcomes.
//!
//! The transport and session layers are not part of this crate. The manager talks to the
//! server through the [`client::MonitoredItemServiceSet`] and [`client::MethodServiceSet`]
//! traits which a session, or a test double, implements.

#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::float_cmp)]
#![allow(clippy::result_unit_err)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[cfg(test)]
extern crate tempdir;
#[macro_use]
extern crate serde_derive;

/// Tracing macro for obtaining a lock on a `Mutex`. Sometimes deadlocks can happen in code,
/// and if they do, this macro is useful for finding out where they happened.
#[macro_export]
macro_rules! trace_lock {
    ( $x:expr ) => {
        {
//            use std::thread;
//            trace!("Thread {:?}, {} locking at {}, line {}", thread::current().id(), stringify!($x), file!(), line!());
            let v = $x.lock();
//            trace!("Thread {:?}, {} lock completed", thread::current().id(), stringify!($x));
            v
        }
    }
}

pub mod client;
#[cfg(feature = "console-logging")]
pub mod console_logging;
pub mod core;
pub mod types;

pub mod prelude {
    pub use crate::client::*;
    pub use crate::core::prelude::*;
    pub use crate::types::*;
}
