// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

use std::sync::Arc;

use crate::types::{DataValue, DiagnosticInfo, Variant};

use super::item::MonitoredItem;

/// A value change of a monitored item, mapped from a data change notification.
#[derive(Debug, Clone)]
pub struct DataValueChange {
    /// The item the notification is for, `None` if no item has the client handle, e.g. when
    /// it was removed while the notification was in flight
    pub item: Option<Arc<MonitoredItem>>,
    pub client_handle: u32,
    pub value: DataValue,
    pub diagnostic_info: Option<DiagnosticInfo>,
}

/// The fields of an event, mapped from an event notification list.
#[derive(Debug, Clone)]
pub struct EventNotification {
    pub item: Option<Arc<MonitoredItem>>,
    pub client_handle: u32,
    pub event_fields: Vec<Variant>,
}
