// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

use std::{fmt, sync::Arc, time::Duration};

use crate::{
    core::handle::AtomicHandle,
    types::{MonitoringFilterResult, StatusCode},
};

use super::{
    configuration::MonitoredItemConfiguration,
    item::MonitoredItem,
    services::{MethodServiceSet, MonitoredItemServiceSet},
};

/// State of the subscription that owns the monitored items.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    /// Opened on the client, not yet known to the server
    Opened,
    /// Created on the server
    Created,
    /// Subscription parameters were modified on the server
    Modified,
    /// Closed and deleted
    Closed,
}

/// Outcome of applying, or failing to apply, a change to a monitored item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemChangeResult {
    /// Sequence number of the change, 0 when the change was rejected before being queued
    pub change_id: u64,
    pub retry_count: u32,
    /// Configuration the change was moving the item to
    pub configuration: Arc<MonitoredItemConfiguration>,
    pub status: StatusCode,
    /// The change completed, either successfully or because it cannot ever succeed
    pub is_final: bool,
    pub filter_result: Option<MonitoringFilterResult>,
}

/// The subscription side of the monitored item manager. It identifies the subscription on the
/// server, provides the service sets and is told when work is pending.
///
/// Callbacks can be invoked while the manager holds its internal locks, so an implementation
/// must not call back into the manager from them.
pub trait SubscriptionContext: fmt::Display + Send + Sync {
    /// Server assigned id of the subscription
    fn subscription_id(&self) -> u32;

    fn monitored_item_service(&self) -> &dyn MonitoredItemServiceSet;

    fn method_service(&self) -> &dyn MethodServiceSet;

    /// Changes were queued, the owner should call `apply_changes` at a convenient time.
    fn notify_work_pending(&self) {}

    /// Observes every outcome reported for a change of a monitored item.
    fn on_item_change_result(&self, _item: &MonitoredItem, _result: &ItemChangeResult) {}

    /// Constructs the monitored item for a name. Override to construct items with extra
    /// behaviour.
    fn create_monitored_item(
        &self,
        name: &str,
        client_handle: u32,
        context: Arc<ItemContext>,
    ) -> MonitoredItem {
        MonitoredItem::new(name, client_handle, context)
    }
}

/// The context every monitored item of one manager shares.
pub struct ItemContext {
    subscription: Arc<dyn SubscriptionContext>,
    handles: Arc<AtomicHandle>,
    max_change_retries: u32,
}

impl fmt::Display for ItemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subscription)
    }
}

impl fmt::Debug for ItemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemContext")
            .field("subscription", &self.subscription.to_string())
            .field("max_change_retries", &self.max_change_retries)
            .finish()
    }
}

impl ItemContext {
    pub fn new(
        subscription: Arc<dyn SubscriptionContext>,
        handles: Arc<AtomicHandle>,
        max_change_retries: u32,
    ) -> Self {
        Self {
            subscription,
            handles,
            max_change_retries,
        }
    }

    pub fn subscription(&self) -> &Arc<dyn SubscriptionContext> {
        &self.subscription
    }

    /// The client handle counter shared by all items
    pub fn handles(&self) -> &Arc<AtomicHandle> {
        &self.handles
    }

    pub fn max_change_retries(&self) -> u32 {
        self.max_change_retries
    }

    /// Decides if a change is done with, either because it is final or because it was
    /// retried too often.
    pub(crate) fn should_stop(&self, retry_count: u32, is_final: bool) -> bool {
        is_final || retry_count > self.max_change_retries
    }

    pub(crate) fn notify_work_pending(&self) {
        self.subscription.notify_work_pending();
    }

    pub(crate) fn report(&self, item: &MonitoredItem, result: &ItemChangeResult) {
        self.subscription.on_item_change_result(item, result);
    }
}

/// The subscription publishing interval as remembered by items for auto queue sizing.
pub(crate) fn remembered_interval(
    state: SubscriptionState,
    publishing_interval: Duration,
) -> Option<Duration> {
    match state {
        SubscriptionState::Created | SubscriptionState::Modified
            if !publishing_interval.is_zero() =>
        {
            Some(publishing_interval)
        }
        _ => None,
    }
}
