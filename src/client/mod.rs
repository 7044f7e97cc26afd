// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Client side functionality. The client maintains a shadow copy of the monitored items of a
//! subscription and drives the server towards the desired state through the monitored item
//! service set.

pub mod subscriptions;

pub use self::subscriptions::*;
