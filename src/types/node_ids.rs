// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Well known node ids in namespace 0 that the client calls into.

use crate::types::node_id::NodeId;

#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum ObjectId {
    Server = 2253,
}

impl From<ObjectId> for NodeId {
    fn from(r: ObjectId) -> Self {
        NodeId::new(0, r as u32)
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum MethodId {
    Server_GetMonitoredItems = 11492,
}

impl From<MethodId> for NodeId {
    fn from(r: MethodId) -> Self {
        NodeId::new(0, r as u32)
    }
}
