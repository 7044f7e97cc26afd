// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Monitored item lifecycle management for a subscription.
//!
//! The [`MonitoredItemManager`] owns the monitored items of one subscription. Callers supply
//! the desired state, the manager queues the changes on the items and applies them in batches
//! through [`MonitoredItemServiceSet`]. After a reconnect or transfer,
//! [`MonitoredItemManager::try_synchronize_handles`] reconciles the items with what the server
//! reports.

pub mod change;
pub mod configuration;
pub mod context;
pub mod item;
pub mod manager;
pub mod notification;
pub mod services;

pub use self::{
    change::*, configuration::*, context::*, item::*, manager::*, notification::*, services::*,
};

macro_rules! item_trace {
    ($item: expr, $($arg:tt)*) =>  {
        trace!("{} {}", $item, format!($($arg)*))
    }
}
pub(crate) use item_trace;

macro_rules! item_debug {
    ($item: expr, $($arg:tt)*) =>  {
        debug!("{} {}", $item, format!($($arg)*))
    }
}
pub(crate) use item_debug;

macro_rules! item_info {
    ($item: expr, $($arg:tt)*) =>  {
        info!("{} {}", $item, format!($($arg)*))
    }
}
pub(crate) use item_info;

macro_rules! item_warn {
    ($item: expr, $($arg:tt)*) =>  {
        warn!("{} {}", $item, format!($($arg)*))
    }
}
pub(crate) use item_warn;

macro_rules! item_error {
    ($item: expr, $($arg:tt)*) =>  {
        error!("{} {}", $item, format!($($arg)*))
    }
}
pub(crate) use item_error;

#[cfg(test)]
mod tests;
