// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Pending changes of a monitored item. A change is computed by comparing the configuration
//! an item is moving to against the one it was last moving to. It carries only what is needed
//! to build the wire request and to report the outcome back to the item.

use std::sync::Arc;

use crate::types::{
    MonitoredItemCreateRequest, MonitoredItemModifyRequest, MonitoringMode, StatusCode,
    TimestampsToReturn,
};

use super::configuration::MonitoredItemConfiguration;

/// The operation a change performs on the server.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChangeOperation {
    /// The item must be created from scratch. An item that exists on the server is deleted
    /// first.
    Create,
    /// Parameters are modified, optionally followed by a monitoring mode change.
    Modify { mode_change: Option<MonitoringMode> },
    /// Only the monitoring mode changes, no modify call is needed.
    ModeChange(MonitoringMode),
}

/// A change queued on a monitored item, with its retry bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    id: u64,
    configuration: Arc<MonitoredItemConfiguration>,
    operation: ChangeOperation,
    retry_count: u32,
}

impl PendingChange {
    /// Computes the change that moves an item from `previous` to `configuration`. Without a
    /// previous configuration, or when the monitored target differs, the item is recreated.
    pub fn new(
        id: u64,
        configuration: Arc<MonitoredItemConfiguration>,
        previous: Option<&MonitoredItemConfiguration>,
    ) -> PendingChange {
        let operation = match previous {
            Some(previous) if previous.same_target(&configuration) => {
                if configuration.differs_only_in_mode(previous) {
                    ChangeOperation::ModeChange(configuration.monitoring_mode)
                } else if previous.monitoring_mode != configuration.monitoring_mode {
                    ChangeOperation::Modify {
                        mode_change: Some(configuration.monitoring_mode),
                    }
                } else {
                    ChangeOperation::Modify { mode_change: None }
                }
            }
            _ => ChangeOperation::Create,
        };
        PendingChange {
            id,
            configuration,
            operation,
            retry_count: 0,
        }
    }

    /// Sequence number of the change within its item
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The configuration the change moves the item towards
    pub fn configuration(&self) -> &Arc<MonitoredItemConfiguration> {
        &self.configuration
    }

    pub fn operation(&self) -> ChangeOperation {
        self.operation
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn timestamps_to_return(&self) -> TimestampsToReturn {
        self.configuration.timestamps_to_return
    }

    pub fn force_recreate(&self) -> bool {
        self.operation == ChangeOperation::Create
    }

    pub fn modify_needed(&self) -> bool {
        matches!(self.operation, ChangeOperation::Modify { .. })
    }

    /// The monitoring mode to apply after any modification
    pub fn mode_change(&self) -> Option<MonitoringMode> {
        match self.operation {
            ChangeOperation::Modify { mode_change } => mode_change,
            ChangeOperation::ModeChange(mode) => Some(mode),
            ChangeOperation::Create => None,
        }
    }

    /// Any item can be created from its change, whatever the operation.
    pub fn create_request(&self, client_handle: u32) -> MonitoredItemCreateRequest {
        self.configuration.create_request(client_handle)
    }

    pub fn modify_request(
        &self,
        client_handle: u32,
        server_handle: u32,
    ) -> Option<MonitoredItemModifyRequest> {
        if self.modify_needed() {
            Some(MonitoredItemModifyRequest {
                monitored_item_id: server_handle,
                requested_parameters: self.configuration.monitoring_parameters(client_handle),
            })
        } else {
            None
        }
    }

    /// Drops any modify or mode change in favour of deleting and creating the item again.
    pub(crate) fn promote_to_recreate(&mut self) {
        self.operation = ChangeOperation::Create;
    }

    /// Records a successful modify, leaving only the monitoring mode to set.
    pub(crate) fn modify_applied(&mut self) {
        if let ChangeOperation::Modify {
            mode_change: Some(mode),
        } = self.operation
        {
            self.operation = ChangeOperation::ModeChange(mode);
        }
    }

    pub(crate) fn increment_retry(&mut self) {
        self.retry_count += 1;
    }
}

/// Tests if the status indicates that the channel or connection failed, rather than the
/// server rejecting the request. Good and uncertain codes are not communication errors.
pub fn is_communication_error(status: StatusCode) -> bool {
    let status = status.status();
    status == StatusCode::BadCommunicationError
        || status == StatusCode::BadNotConnected
        || status == StatusCode::BadSecureChannelClosed
}
