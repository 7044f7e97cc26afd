// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Provides the monitored item, the client side shadow of one monitored item on the server.
//!
//! An item holds the values last confirmed by the server and a queue of changes that move it
//! towards its desired configuration. The manager takes the head of the queue, performs the
//! wire call and reports the outcome back through the `set_*_result` functions, which decide
//! if the change completed, must be retried or must be turned into a recreate.

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::{Mutex, MutexGuard};

use crate::types::{
    MonitoredItemCreateRequest, MonitoredItemCreateResult, MonitoredItemModifyResult,
    MonitoringFilterResult, MonitoringMode, StatusCode,
};

use super::{
    change::{is_communication_error, PendingChange},
    configuration::{duration_millis, MonitoredItemConfiguration},
    context::{remembered_interval, ItemChangeResult, ItemContext, SubscriptionState},
    item_debug, item_info, item_trace, item_warn,
};

/// Lifecycle state of a monitored item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MonitoredItemState {
    /// Not on the server and nothing pending
    NotCreated,
    /// Waiting to be created, or deleted and created again
    PendingCreate,
    /// On the server with nothing pending
    Created,
    PendingModify,
    PendingModeChange,
    /// Removed from the manager, waiting for the server side delete
    PendingDelete,
    Disposed,
}

#[derive(Debug)]
struct ItemState {
    current_sampling_interval: Duration,
    current_queue_size: u32,
    current_monitoring_mode: MonitoringMode,
    last_error: StatusCode,
    last_filter_result: Option<MonitoringFilterResult>,
    /// Configuration as set by the owner
    configuration: Option<Arc<MonitoredItemConfiguration>>,
    /// Configuration of the last queued change, i.e. what the server converges to
    effective: Option<Arc<MonitoredItemConfiguration>>,
    pending: VecDeque<PendingChange>,
    last_change_id: u64,
    /// Publishing interval of the subscription, used for auto queue sizing
    publishing_interval: Option<Duration>,
    delete_requested: bool,
    delete_retries: u32,
    disposed: bool,
}

impl ItemState {
    /// Applies auto queue sizing to the configuration set by the owner.
    fn effective_for(
        &self,
        configuration: &Arc<MonitoredItemConfiguration>,
    ) -> Arc<MonitoredItemConfiguration> {
        let queue_size = self.publishing_interval.and_then(|publishing_interval| {
            configuration.auto_queue_size(publishing_interval, self.current_sampling_interval)
        });
        match queue_size {
            Some(queue_size) if queue_size != configuration.queue_size => {
                Arc::new(MonitoredItemConfiguration {
                    queue_size,
                    ..(**configuration).clone()
                })
            }
            _ => configuration.clone(),
        }
    }

    fn queue(&mut self, configuration: Arc<MonitoredItemConfiguration>) -> &PendingChange {
        let previous = self.effective.take();
        self.last_change_id += 1;
        let change = PendingChange::new(
            self.last_change_id,
            configuration.clone(),
            previous.as_deref(),
        );
        self.effective = Some(configuration);
        self.pending.push_back(change);
        &self.pending[self.pending.len() - 1]
    }
}

pub struct MonitoredItem {
    name: String,
    /// Assigned once by the manager, only changed when the server reports another one
    client_handle: AtomicU32,
    /// 0 until created on the server
    server_handle: AtomicU32,
    context: Arc<ItemContext>,
    state: Mutex<ItemState>,
}

impl fmt::Display for MonitoredItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}|{} ({})",
            self.context,
            self.client_handle(),
            self.server_handle(),
            self.name
        )
    }
}

impl fmt::Debug for MonitoredItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MonitoredItem({})", self)
    }
}

impl MonitoredItem {
    /// Creates an item with no configuration. The manager sets the configuration right after.
    pub fn new(name: &str, client_handle: u32, context: Arc<ItemContext>) -> MonitoredItem {
        let item = MonitoredItem {
            name: name.to_string(),
            client_handle: AtomicU32::new(client_handle),
            server_handle: AtomicU32::new(0),
            context,
            state: Mutex::new(ItemState {
                current_sampling_interval: Duration::ZERO,
                current_queue_size: 0,
                current_monitoring_mode: MonitoringMode::Reporting,
                last_error: StatusCode::Good,
                last_filter_result: None,
                configuration: None,
                effective: None,
                pending: VecDeque::new(),
                last_change_id: 0,
                publishing_interval: None,
                delete_requested: false,
                delete_retries: 0,
                disposed: false,
            }),
        };
        item_debug!(item, "constructed");
        item
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client_handle(&self) -> u32 {
        self.client_handle.load(Ordering::Acquire)
    }

    pub fn server_handle(&self) -> u32 {
        self.server_handle.load(Ordering::Acquire)
    }

    /// Tests if the item exists on the server
    pub fn created(&self) -> bool {
        self.server_handle() != 0
    }

    pub fn context(&self) -> &Arc<ItemContext> {
        &self.context
    }

    /// Display order from the configuration
    pub fn order(&self) -> u32 {
        trace_lock!(self.state)
            .configuration
            .as_ref()
            .map(|c| c.order)
            .unwrap_or_default()
    }

    pub fn current_sampling_interval(&self) -> Duration {
        trace_lock!(self.state).current_sampling_interval
    }

    pub fn current_queue_size(&self) -> u32 {
        trace_lock!(self.state).current_queue_size
    }

    pub fn current_monitoring_mode(&self) -> MonitoringMode {
        trace_lock!(self.state).current_monitoring_mode
    }

    /// Status of the most recent outcome of a change
    pub fn last_error(&self) -> StatusCode {
        trace_lock!(self.state).last_error
    }

    pub fn last_filter_result(&self) -> Option<MonitoringFilterResult> {
        trace_lock!(self.state).last_filter_result.clone()
    }

    /// The configuration as it was last set by the owner
    pub fn configuration(&self) -> Option<Arc<MonitoredItemConfiguration>> {
        trace_lock!(self.state).configuration.clone()
    }

    /// The configuration the item converges to, including any auto sized queue
    pub fn effective_configuration(&self) -> Option<Arc<MonitoredItemConfiguration>> {
        trace_lock!(self.state).effective.clone()
    }

    /// The change that is applied next
    pub fn pending_change(&self) -> Option<PendingChange> {
        trace_lock!(self.state).pending.front().cloned()
    }

    pub fn pending_changes(&self) -> usize {
        trace_lock!(self.state).pending.len()
    }

    pub fn is_disposed(&self) -> bool {
        trace_lock!(self.state).disposed
    }

    pub fn state(&self) -> MonitoredItemState {
        let state = trace_lock!(self.state);
        if state.disposed {
            MonitoredItemState::Disposed
        } else if state.delete_requested {
            MonitoredItemState::PendingDelete
        } else {
            match state.pending.front() {
                None if self.created() => MonitoredItemState::Created,
                None => MonitoredItemState::NotCreated,
                Some(change) if !self.created() || change.force_recreate() => {
                    MonitoredItemState::PendingCreate
                }
                Some(change) if change.modify_needed() => MonitoredItemState::PendingModify,
                Some(_) => MonitoredItemState::PendingModeChange,
            }
        }
    }

    /// Sets the desired configuration. If it differs from the configuration the item is
    /// converging to, a change is queued and the subscription is told that work is pending.
    /// Returns `true` if a change was queued.
    pub fn set_configuration(&self, configuration: MonitoredItemConfiguration) -> bool {
        let queued = self.queue_configuration(configuration);
        if queued {
            self.context.notify_work_pending();
        }
        queued
    }

    /// Queues a change for the configuration without notifying the subscription.
    pub(crate) fn queue_configuration(&self, configuration: MonitoredItemConfiguration) -> bool {
        let configuration = Arc::new(configuration);
        let rejected = {
            let mut state = trace_lock!(self.state);
            if state.disposed {
                item_warn!(self, "is disposed, configuration is ignored");
                return false;
            }
            if configuration.node_id.is_null() {
                Some(StatusCode::BadNodeIdInvalid)
            } else {
                state.configuration = Some(configuration.clone());
                let effective = state.effective_for(&configuration);
                if state.effective.as_deref() == Some(&*effective) {
                    Some(StatusCode::BadNothingToDo)
                } else {
                    let change = state.queue(effective);
                    item_trace!(self, "queued change {} {:?}", change.id(), change.operation());
                    None
                }
            }
        };
        if let Some(status) = rejected {
            if status == StatusCode::BadNodeIdInvalid {
                item_warn!(self, "configuration has no node id to monitor");
            }
            self.context.report(
                self,
                &ItemChangeResult {
                    change_id: 0,
                    retry_count: 0,
                    configuration,
                    status,
                    is_final: true,
                    filter_result: None,
                },
            );
            false
        } else {
            true
        }
    }

    /// Called when the state of the subscription changed. Once the subscription is created
    /// or modified with a publishing interval, items that auto size their queue recompute it
    /// and queue a change if it differs.
    pub fn on_subscription_state_change(
        &self,
        subscription_state: SubscriptionState,
        publishing_interval: Duration,
    ) {
        let queued = {
            let mut state = trace_lock!(self.state);
            if state.disposed {
                return;
            }
            let publishing_interval =
                match remembered_interval(subscription_state, publishing_interval) {
                    Some(publishing_interval) => publishing_interval,
                    None => return,
                };
            state.publishing_interval = Some(publishing_interval);
            let configuration = match state.configuration.clone() {
                Some(configuration) => configuration,
                None => return,
            };
            if configuration
                .auto_queue_size(publishing_interval, state.current_sampling_interval)
                .is_none()
            {
                return;
            }
            let effective = state.effective_for(&configuration);
            if state.effective.as_deref() == Some(&*effective) {
                false
            } else {
                item_debug!(
                    self,
                    "queue size set to {} for publishing interval {:?}",
                    effective.queue_size,
                    publishing_interval
                );
                state.queue(effective);
                true
            }
        };
        if queued {
            self.context.notify_work_pending();
        }
    }

    /// Updates the item with the outcome of a create request.
    pub(crate) fn set_create_result(
        &self,
        change: &mut PendingChange,
        request: &MonitoredItemCreateRequest,
        result: &MonitoredItemCreateResult,
    ) -> bool {
        let mut state = trace_lock!(self.state);
        state.current_monitoring_mode = request.monitoring_mode;
        state.current_sampling_interval =
            duration_millis::from_millis(request.requested_parameters.sampling_interval);
        state.current_queue_size = request.requested_parameters.queue_size;

        if !result.status_code.is_bad() {
            self.server_handle
                .store(result.monitored_item_id, Ordering::Release);
            state.current_sampling_interval =
                duration_millis::from_millis(result.revised_sampling_interval);
            state.current_queue_size = result.revised_queue_size;
            self.log_revisions(&state, change.configuration(), true);
            self.finish(
                state,
                change,
                result.status_code,
                true,
                result.filter_result.clone(),
            )
        } else {
            change.increment_retry();
            item_debug!(
                self,
                "create failed with {}, attempt {}",
                result.status_code,
                change.retry_count()
            );
            self.finish(
                state,
                change,
                result.status_code,
                false,
                result.filter_result.clone(),
            )
        }
    }

    /// Updates the item with the outcome of a modify request. A failure that is not caused by
    /// the connection turns the change into a recreate. After a successful modify only the
    /// monitoring mode of the change remains.
    pub(crate) fn set_modify_result(
        &self,
        change: &mut PendingChange,
        result: &MonitoredItemModifyResult,
    ) -> bool {
        let mut state = trace_lock!(self.state);
        if !result.status_code.is_bad() {
            state.current_sampling_interval =
                duration_millis::from_millis(result.revised_sampling_interval);
            state.current_queue_size = result.revised_queue_size;
            let is_final = change.mode_change().is_none();
            if is_final {
                self.log_revisions(&state, change.configuration(), false);
            } else {
                change.modify_applied();
            }
            self.finish(
                state,
                change,
                result.status_code,
                is_final,
                result.filter_result.clone(),
            )
        } else {
            if !is_communication_error(result.status_code) {
                item_info!(
                    self,
                    "modify failed with {}, item will be recreated",
                    result.status_code
                );
                change.promote_to_recreate();
            }
            change.increment_retry();
            self.finish(
                state,
                change,
                result.status_code,
                false,
                result.filter_result.clone(),
            )
        }
    }

    /// Updates the item with the outcome of a set monitoring mode request.
    pub(crate) fn set_monitoring_mode_result(
        &self,
        change: &mut PendingChange,
        monitoring_mode: MonitoringMode,
        status_code: StatusCode,
    ) -> bool {
        let mut state = trace_lock!(self.state);
        if !status_code.is_bad() {
            state.current_monitoring_mode = monitoring_mode;
            self.log_revisions(&state, change.configuration(), false);
            self.finish(state, change, status_code, true, None)
        } else {
            if !is_communication_error(status_code) {
                item_info!(
                    self,
                    "set monitoring mode {} failed with {}, item will be recreated",
                    monitoring_mode,
                    status_code
                );
                change.promote_to_recreate();
            }
            change.increment_retry();
            self.finish(state, change, status_code, false, None)
        }
    }

    /// Updates the item with the outcome of the delete that precedes a recreate. On success
    /// the item is no longer created and the same change creates it again.
    pub(crate) fn set_delete_result(
        &self,
        change: &mut PendingChange,
        status_code: StatusCode,
    ) -> bool {
        let state = trace_lock!(self.state);
        if !status_code.is_bad() || status_code.status() == StatusCode::BadMonitoredItemIdInvalid
        {
            item_debug!(self, "deleted for recreation");
            self.server_handle.store(0, Ordering::Release);
        } else {
            change.increment_retry();
        }
        self.finish(state, change, status_code, false, None)
    }

    /// Forgets the server side state and queues a create from the configuration the item was
    /// converging to. The client handle is retained.
    pub(crate) fn reset(&self) {
        let abandoned = {
            let mut state = trace_lock!(self.state);
            if state.disposed {
                return;
            }
            item_debug!(self, "reset");
            self.server_handle.store(0, Ordering::Release);

            let mut configuration = state.effective.take();
            let abandoned = state.pending.drain(..).collect::<Vec<_>>();
            if let Some(change) = abandoned.last() {
                configuration = Some(change.configuration().clone());
            }
            if !abandoned.is_empty() {
                state.last_error = StatusCode::BadOperationAbandoned;
            }
            if let Some(configuration) = configuration {
                state.queue(configuration);
            }
            abandoned
        };
        self.report_abandoned(abandoned);
    }

    /// Abandons all pending changes and forgets the server handle. Subsequent calls do
    /// nothing.
    pub(crate) fn dispose(&self) {
        let abandoned = {
            let mut state = trace_lock!(self.state);
            if state.disposed {
                return;
            }
            let abandoned = state.pending.drain(..).collect::<Vec<_>>();
            if !abandoned.is_empty() {
                state.last_error = StatusCode::BadOperationAbandoned;
            }
            state.disposed = true;
            state.delete_requested = false;
            abandoned
        };
        self.report_abandoned(abandoned);
        item_debug!(self, "removed");
        self.server_handle.store(0, Ordering::Release);
    }

    /// Adopts the handles the server reports for the item. An item the server has although
    /// its create was never confirmed completes the pending create.
    pub(crate) fn set_transfer_result(&self, client_handle: u32, server_handle: u32) {
        let unconfirmed = {
            let state = trace_lock!(self.state);
            let old_client_handle = self.client_handle();
            if client_handle != old_client_handle {
                item_info!(
                    self,
                    "client handle changed from {} to {}",
                    old_client_handle,
                    client_handle
                );
                self.client_handle.store(client_handle, Ordering::Release);
                // Future handles must not collide with the adopted one
                self.context.handles().raise_to(client_handle);
            }
            let old_server_handle = self.server_handle();
            if server_handle != old_server_handle {
                item_info!(
                    self,
                    "server handle changed from {} to {}",
                    old_server_handle,
                    server_handle
                );
                self.server_handle.store(server_handle, Ordering::Release);
            }
            if old_server_handle == 0 && server_handle != 0 {
                state
                    .pending
                    .front()
                    .filter(|change| change.force_recreate())
                    .cloned()
            } else {
                None
            }
        };
        if let Some(mut change) = unconfirmed {
            item_info!(self, "create of change {} confirmed by the server", change.id());
            let request = change.create_request(client_handle);
            let result = MonitoredItemCreateResult {
                status_code: StatusCode::Good,
                monitored_item_id: server_handle,
                revised_sampling_interval: request.requested_parameters.sampling_interval,
                revised_queue_size: request.requested_parameters.queue_size,
                filter_result: None,
            };
            let _ = self.set_create_result(&mut change, &request, &result);
        }
    }

    pub(crate) fn mark_delete_requested(&self) {
        trace_lock!(self.state).delete_requested = true;
    }

    /// Counts a failed attempt to delete the item and returns the number of attempts so far.
    pub(crate) fn increment_delete_retries(&self) -> u32 {
        let mut state = trace_lock!(self.state);
        state.delete_retries += 1;
        state.delete_retries
    }

    /// Records the outcome of a change, completes it if final or retried too often and tells
    /// the context. Returns `true` if the change completed.
    fn finish(
        &self,
        mut state: MutexGuard<'_, ItemState>,
        change: &mut PendingChange,
        status: StatusCode,
        is_final: bool,
        filter_result: Option<MonitoringFilterResult>,
    ) -> bool {
        let stop = self.context.should_stop(change.retry_count(), is_final);
        if state.pending.front().map(|c| c.id()) == Some(change.id()) {
            if stop {
                let _ = state.pending.pop_front();
            } else if let Some(head) = state.pending.front_mut() {
                *head = change.clone();
            }
        } else {
            item_debug!(
                self,
                "change {} is no longer pending, result {} is not recorded against it",
                change.id(),
                status
            );
        }
        state.last_error = status;
        if filter_result.is_some() {
            state.last_filter_result = filter_result.clone();
        }
        drop(state);

        if stop && !is_final {
            item_warn!(
                self,
                "giving up on change {} after {} attempts, last error {}",
                change.id(),
                change.retry_count(),
                status
            );
        }
        self.context.report(
            self,
            &ItemChangeResult {
                change_id: change.id(),
                retry_count: change.retry_count(),
                configuration: change.configuration().clone(),
                status,
                is_final,
                filter_result,
            },
        );
        stop
    }

    fn report_abandoned(&self, abandoned: Vec<PendingChange>) {
        for change in abandoned {
            item_debug!(self, "change {} abandoned", change.id());
            self.context.report(
                self,
                &ItemChangeResult {
                    change_id: change.id(),
                    retry_count: change.retry_count(),
                    configuration: change.configuration().clone(),
                    status: StatusCode::BadOperationAbandoned,
                    is_final: true,
                    filter_result: None,
                },
            );
        }
    }

    fn log_revisions(
        &self,
        state: &ItemState,
        requested: &MonitoredItemConfiguration,
        created: bool,
    ) {
        let action = if created { "created" } else { "updated" };
        let sampling_revised = requested.sampling_interval != state.current_sampling_interval;
        let queue_revised =
            requested.queue_size != state.current_queue_size && state.current_queue_size != 0;
        match (sampling_revised, queue_revised) {
            (true, true) => item_info!(
                self,
                "{}, sampling interval was revised from {:?} to {:?} and queue size from {} to {}",
                action,
                requested.sampling_interval,
                state.current_sampling_interval,
                requested.queue_size,
                state.current_queue_size
            ),
            (true, false) => item_info!(
                self,
                "{}, sampling interval was revised from {:?} to {:?}",
                action,
                requested.sampling_interval,
                state.current_sampling_interval
            ),
            (false, true) => item_info!(
                self,
                "{}, queue size was revised from {} to {}",
                action,
                requested.queue_size,
                state.current_queue_size
            ),
            (false, false) => item_debug!(self, "{} with desired configuration", action),
        }
    }
}
