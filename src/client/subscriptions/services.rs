// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! The service sets the monitored item manager calls on the server. A session implements them
//! by sending the corresponding requests, tests implement them in memory.

use async_trait::async_trait;

use crate::types::{
    CallMethodRequest, CallResponse, CreateMonitoredItemsResponse, DeleteMonitoredItemsResponse,
    ModifyMonitoredItemsResponse, MonitoredItemCreateRequest, MonitoredItemModifyRequest,
    MonitoringMode, SetMonitoringModeResponse, StatusCode, TimestampsToReturn,
};

/// MonitoredItem service set, see OPC UA Part 4 - Services 5.12.
///
/// Results are positionally correlated with the request. An `Err` means the whole call
/// failed, per item failures are reported through the status codes of the results.
#[async_trait]
pub trait MonitoredItemServiceSet: Send + Sync {
    async fn create_monitored_items(
        &self,
        subscription_id: u32,
        timestamps_to_return: TimestampsToReturn,
        items_to_create: Vec<MonitoredItemCreateRequest>,
    ) -> Result<CreateMonitoredItemsResponse, StatusCode>;

    async fn modify_monitored_items(
        &self,
        subscription_id: u32,
        timestamps_to_return: TimestampsToReturn,
        items_to_modify: Vec<MonitoredItemModifyRequest>,
    ) -> Result<ModifyMonitoredItemsResponse, StatusCode>;

    async fn set_monitoring_mode(
        &self,
        subscription_id: u32,
        monitoring_mode: MonitoringMode,
        monitored_item_ids: Vec<u32>,
    ) -> Result<SetMonitoringModeResponse, StatusCode>;

    async fn delete_monitored_items(
        &self,
        subscription_id: u32,
        monitored_item_ids: Vec<u32>,
    ) -> Result<DeleteMonitoredItemsResponse, StatusCode>;
}

/// Method service set, see OPC UA Part 4 - Services 5.11.
#[async_trait]
pub trait MethodServiceSet: Send + Sync {
    async fn call(&self, methods_to_call: Vec<CallMethodRequest>)
        -> Result<CallResponse, StatusCode>;
}
