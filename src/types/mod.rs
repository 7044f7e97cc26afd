// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! The OPC UA types used by the monitored item services. Only the plain data shape is
//! provided, binary encoding belongs to the transport layer.

/// Timestamps are UTC date times
pub type DateTime = chrono::DateTime<chrono::Utc>;

pub mod data_value;
pub mod diagnostic_info;
pub mod monitoring;
pub mod node_id;
pub mod node_ids;
pub mod service_types;
pub mod status_code;
pub mod variant;

pub use self::{
    data_value::*, diagnostic_info::*, monitoring::*, node_id::*, node_ids::*, service_types::*,
    status_code::*, variant::*,
};
