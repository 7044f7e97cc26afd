// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! The monitored item manager of a subscription.
//!
//! The manager indexes the items by client handle and by name. Changes queued on the items are
//! applied in passes. Each pass takes a snapshot of the pending deletions and of the head change
//! of every item under the collection lock, then issues batched wire calls without holding it:
//!
//! 1. Removed items that never made it to the server are disposed without a call.
//! 2. Removed items that exist on the server are deleted.
//! 3. Items that must be recreated and exist on the server are deleted.
//! 4. Created items are modified, one call per timestamps to return.
//! 5. Monitoring modes are set, one call per mode.
//! 6. Items not on the server are created, one call per timestamps to return.
//!
//! Results are positionally correlated with the requests and reported back to each item, which
//! decides if its change completed or stays pending for the next pass.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    core::handle::AtomicHandle,
    types::{
        CallMethodRequest, DataChangeNotification, DiagnosticInfo, EventNotificationList,
        MethodId, ObjectId, StatusCode, Variant,
    },
};

use super::{
    change::PendingChange,
    configuration::{MonitoredItemConfiguration, MonitoredItemManagerConfig},
    context::{ItemContext, SubscriptionContext, SubscriptionState},
    item::MonitoredItem,
    item_debug, item_error, item_info, item_trace, item_warn,
    notification::{DataValueChange, EventNotification},
};

#[derive(Default)]
struct ItemCollections {
    by_handle: HashMap<u32, Arc<MonitoredItem>>,
    by_name: HashMap<String, Arc<MonitoredItem>>,
    /// Items removed from the indices, waiting to be deleted on the server
    deleted: Vec<Arc<MonitoredItem>>,
}

/// A change taken from an item for the current pass, together with the item.
type ItemChange = (Arc<MonitoredItem>, PendingChange);

pub struct MonitoredItemManager {
    context: Arc<dyn SubscriptionContext>,
    item_context: Arc<ItemContext>,
    collections: Mutex<ItemCollections>,
}

impl MonitoredItemManager {
    /// Creates a manager. Client handles are drawn from `handles`, which may be shared by all
    /// the managers of a process.
    pub fn new(
        context: Arc<dyn SubscriptionContext>,
        handles: Arc<AtomicHandle>,
        config: &MonitoredItemManagerConfig,
    ) -> MonitoredItemManager {
        let item_context = Arc::new(ItemContext::new(
            context.clone(),
            handles,
            config.max_change_retries,
        ));
        MonitoredItemManager {
            context,
            item_context,
            collections: Mutex::new(ItemCollections::default()),
        }
    }

    pub fn context(&self) -> &Arc<dyn SubscriptionContext> {
        &self.context
    }

    /// Adds an item unless one with the name exists already. Returns `true` with the new item,
    /// or `false` with the existing item, which is left unchanged.
    pub fn try_add(
        &self,
        name: &str,
        configuration: MonitoredItemConfiguration,
    ) -> (bool, Arc<MonitoredItem>) {
        let item = {
            let mut collections = trace_lock!(self.collections);
            if let Some(item) = collections.by_name.get(name) {
                return (false, item.clone());
            }
            self.insert_item(&mut collections, name, configuration)
        };
        self.context.notify_work_pending();
        (true, item)
    }

    /// Reconciles the items with the desired state. Missing items are created, existing items
    /// get the new configuration and items not in the state are removed. Returns the items in
    /// the order of the desired state.
    pub fn update(
        &self,
        desired_state: &[(String, MonitoredItemConfiguration)],
    ) -> Vec<Arc<MonitoredItem>> {
        let mut items = Vec::with_capacity(desired_state.len());
        let mut work_pending = false;
        {
            let mut collections = trace_lock!(self.collections);
            let mut remove = collections.by_handle.clone();
            for (name, configuration) in desired_state {
                let item = if let Some(item) = collections.by_name.get(name).cloned() {
                    remove.remove(&item.client_handle());
                    work_pending |= item.queue_configuration(configuration.clone());
                    item
                } else {
                    work_pending = true;
                    self.insert_item(&mut collections, name, configuration.clone())
                };
                items.push(item);
            }
            for (client_handle, item) in remove {
                item_debug!(item, "no longer in the desired state, removing");
                collections.by_handle.remove(&client_handle);
                collections.by_name.remove(item.name());
                item.mark_delete_requested();
                collections.deleted.push(item);
                work_pending = true;
            }
        }
        if work_pending {
            self.context.notify_work_pending();
        }
        items
    }

    /// Removes the item with the client handle and queues it for deletion.
    pub fn remove(&self, client_handle: u32) -> bool {
        {
            let mut collections = trace_lock!(self.collections);
            let item = match collections.by_handle.remove(&client_handle) {
                Some(item) => item,
                None => return false,
            };
            collections.by_name.remove(item.name());
            item.mark_delete_requested();
            collections.deleted.push(item);
        }
        self.context.notify_work_pending();
        true
    }

    pub fn by_client_handle(&self, client_handle: u32) -> Option<Arc<MonitoredItem>> {
        trace_lock!(self.collections)
            .by_handle
            .get(&client_handle)
            .cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<MonitoredItem>> {
        trace_lock!(self.collections).by_name.get(name).cloned()
    }

    /// A snapshot of the tracked items, ordered by client handle
    pub fn items(&self) -> Vec<Arc<MonitoredItem>> {
        let mut items = trace_lock!(self.collections)
            .by_handle
            .values()
            .cloned()
            .collect::<Vec<_>>();
        items.sort_by_key(|item| item.client_handle());
        items
    }

    pub fn count(&self) -> usize {
        trace_lock!(self.collections).by_handle.len()
    }

    /// Maps the values of a data change notification to the items they are for. The result
    /// has one entry per value in the same order.
    pub fn map_data_change_notification(
        &self,
        notification: DataChangeNotification,
    ) -> Vec<DataValueChange> {
        let DataChangeNotification {
            monitored_items,
            diagnostic_infos,
        } = notification;
        let monitored_items = monitored_items.unwrap_or_default();
        let mut diagnostic_infos = diagnostic_infos.unwrap_or_default().into_iter();
        let collections = trace_lock!(self.collections);
        monitored_items
            .into_iter()
            .map(|n| DataValueChange {
                item: collections.by_handle.get(&n.client_handle).cloned(),
                client_handle: n.client_handle,
                value: n.value,
                diagnostic_info: diagnostic_infos.next(),
            })
            .collect()
    }

    /// Maps the events of an event notification list to the items they are for. The result
    /// has one entry per event in the same order.
    pub fn map_event_notification(
        &self,
        notification: EventNotificationList,
    ) -> Vec<EventNotification> {
        let events = notification.events.unwrap_or_default();
        let collections = trace_lock!(self.collections);
        events
            .into_iter()
            .map(|e| EventNotification {
                item: collections.by_handle.get(&e.client_handle).cloned(),
                client_handle: e.client_handle,
                event_fields: e.event_fields.unwrap_or_default(),
            })
            .collect()
    }

    /// Tells every item about a state change of the subscription.
    pub fn on_subscription_state_change(
        &self,
        state: SubscriptionState,
        publishing_interval: Duration,
    ) {
        for item in self.items() {
            item.on_subscription_state_change(state, publishing_interval);
        }
    }

    /// Applies pending changes to the server. With `drain_fully` passes are repeated until
    /// nothing is pending, otherwise one pass is made. With `reset_all` every item is reset
    /// before the first pass so that all of them are created again.
    ///
    /// Returns `true` if there was anything to apply. Per item failures are recorded on the
    /// items. An `Err` is returned if a service call failed as a whole or answered with the
    /// wrong number of results. Cancellation stops issuing calls and leaves the remaining
    /// changes pending.
    pub async fn apply_changes(
        &self,
        drain_fully: bool,
        reset_all: bool,
        cancel: &CancellationToken,
    ) -> Result<bool, StatusCode> {
        let mut modified = false;
        let mut reset_all = reset_all;
        while !cancel.is_cancelled() {
            let (deletes, changes) = match self.take_changes(reset_all) {
                Some(pending) => pending,
                None => break,
            };
            reset_all = false;
            modified = true;
            item_trace!(
                self.context,
                "applying {} deletions and {} changes",
                deletes.len(),
                changes.len()
            );
            match self.apply_item_changes(deletes, changes, cancel).await {
                Ok(()) => {}
                Err(status) if is_cancelled(status, cancel) => {
                    item_debug!(self.context, "applying changes was cancelled");
                    break;
                }
                Err(status) => return Err(status),
            }
            if !drain_fully {
                break;
            }
        }
        Ok(modified)
    }

    /// Reconciles the handles of the items with the monitored items the server reports for the
    /// subscription. A create may have succeeded on the server without the response reaching
    /// the client, or the subscription may have been transferred or restored.
    ///
    /// Items the server knows by client handle adopt its server handle. Remaining items the
    /// server knows by server handle adopt its client handle. Created items the server does
    /// not know are reset, and monitored items only the server knows are deleted. If the server
    /// cannot be asked, every item is reset and `false` is returned.
    pub async fn try_synchronize_handles(&self, cancel: &CancellationToken) -> bool {
        let handles = match self.get_monitored_items(cancel).await {
            Ok(handles) => handles,
            Err(status) => {
                item_error!(
                    self.context,
                    "failed to get the monitored items of the subscription, {}",
                    status
                );
                let collections = trace_lock!(self.collections);
                collections.by_handle.values().for_each(|item| item.reset());
                return false;
            }
        };

        let (orphans, discarded) = {
            let mut collections = trace_lock!(self.collections);
            let mut unresolved = std::mem::take(&mut collections.by_handle);
            let mut server_handles = handles
                .iter()
                .map(|(server_handle, client_handle)| (*client_handle, *server_handle))
                .collect::<HashMap<u32, u32>>();

            let mut client_handles = unresolved.keys().copied().collect::<Vec<_>>();
            client_handles.sort_unstable();
            for client_handle in &client_handles {
                if let Some(server_handle) = server_handles.remove(client_handle) {
                    if let Some(item) = unresolved.remove(client_handle) {
                        item.set_transfer_result(*client_handle, server_handle);
                        collections.by_handle.insert(*client_handle, item);
                    }
                }
            }

            let mut client_handles = server_handles
                .into_iter()
                .map(|(client_handle, server_handle)| (server_handle, client_handle))
                .collect::<HashMap<u32, u32>>();
            let mut remaining = unresolved.keys().copied().collect::<Vec<_>>();
            remaining.sort_unstable();
            for old_client_handle in remaining {
                let server_handle = match unresolved.get(&old_client_handle) {
                    Some(item) if item.created() => item.server_handle(),
                    _ => continue,
                };
                if let Some(client_handle) = client_handles.remove(&server_handle) {
                    if let Some(item) = unresolved.remove(&old_client_handle) {
                        item.set_transfer_result(client_handle, server_handle);
                        collections.by_handle.insert(client_handle, item);
                    }
                }
            }

            for (client_handle, item) in unresolved {
                if item.created() {
                    item_debug!(item, "is not known to the server, recreating");
                    item.reset();
                }
                collections.by_handle.insert(client_handle, item);
            }

            let mut orphans = client_handles.into_keys().collect::<Vec<_>>();
            orphans.sort_unstable();
            (orphans, std::mem::take(&mut collections.deleted))
        };

        // Whatever the server still has of these is among the orphans
        for item in discarded {
            item_debug!(item, "pending deletion discarded");
            item.dispose();
        }

        if !orphans.is_empty() {
            item_info!(
                self.context,
                "deleting {} monitored items that have no item on the client",
                orphans.len()
            );
            let services = self.context.monitored_item_service();
            let result = cancellable(
                cancel,
                services.delete_monitored_items(self.context.subscription_id(), orphans.clone()),
            )
            .await;
            match result {
                Ok(response) => {
                    let results = response.results.unwrap_or_default();
                    for (server_handle, status) in orphans.iter().zip(results) {
                        if status.is_bad() {
                            item_warn!(
                                self.context,
                                "failed to delete monitored item {} that has no item on the client, {}",
                                server_handle,
                                status
                            );
                        }
                    }
                }
                Err(status) => item_error!(
                    self.context,
                    "failed to delete monitored items that have no item on the client, {}",
                    status
                ),
            }
        }
        true
    }

    /// Disposes every item, including those waiting to be deleted.
    pub fn dispose(&self) {
        let items = {
            let mut collections = trace_lock!(self.collections);
            collections.by_name.clear();
            let mut items = collections
                .by_handle
                .drain()
                .map(|(_, item)| item)
                .collect::<Vec<_>>();
            items.append(&mut collections.deleted);
            items
        };
        items.iter().for_each(|item| item.dispose());
    }

    fn insert_item(
        &self,
        collections: &mut ItemCollections,
        name: &str,
        configuration: MonitoredItemConfiguration,
    ) -> Arc<MonitoredItem> {
        let client_handle = self.item_context.handles().next();
        let item = Arc::new(self.context.create_monitored_item(
            name,
            client_handle,
            self.item_context.clone(),
        ));
        let _ = item.queue_configuration(configuration);
        collections
            .by_handle
            .insert(item.client_handle(), item.clone());
        collections.by_name.insert(name.to_string(), item.clone());
        item
    }

    /// Takes the pending deletions and the head change of every item. The changes stay queued
    /// on the items until their results complete them.
    fn take_changes(&self, reset_all: bool) -> Option<(Vec<Arc<MonitoredItem>>, Vec<ItemChange>)> {
        let mut collections = trace_lock!(self.collections);
        let deletes = std::mem::take(&mut collections.deleted);
        let mut items = collections.by_handle.values().cloned().collect::<Vec<_>>();
        items.sort_by_key(|item| item.client_handle());
        let mut changes = Vec::with_capacity(items.len());
        for item in items {
            if reset_all {
                item.reset();
            }
            if let Some(change) = item.pending_change() {
                changes.push((item, change));
            }
        }
        if deletes.is_empty() && changes.is_empty() {
            None
        } else {
            Some((deletes, changes))
        }
    }

    async fn apply_item_changes(
        &self,
        deletes: Vec<Arc<MonitoredItem>>,
        mut changes: Vec<ItemChange>,
        cancel: &CancellationToken,
    ) -> Result<(), StatusCode> {
        let subscription_id = self.context.subscription_id();
        let services = self.context.monitored_item_service();

        let (deletes, never_created): (Vec<_>, Vec<_>) =
            deletes.into_iter().partition(|item| item.created());
        never_created.iter().for_each(|item| item.dispose());
        if !deletes.is_empty() {
            self.delete_removed_items(deletes, cancel).await?;
        }

        // Items that must be recreated are deleted first
        let recreate = changes
            .iter()
            .enumerate()
            .filter(|(_, (item, change))| item.created() && change.force_recreate())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        if !recreate.is_empty() {
            let ids = recreate
                .iter()
                .map(|index| changes[*index].0.server_handle())
                .collect::<Vec<_>>();
            let response = cancellable(
                cancel,
                services.delete_monitored_items(subscription_id, ids),
            )
            .await
            .map_err(|status| self.service_error("delete_monitored_items", status, cancel))?;
            let results = validate_results(
                "delete_monitored_items",
                response.results,
                &response.diagnostic_infos,
                recreate.len(),
            )?;
            for (n, (index, status)) in recreate.iter().zip(results).enumerate() {
                let (item, change) = &mut changes[*index];
                log_failure(item, status, diagnostic(&response.diagnostic_infos, n));
                item.set_delete_result(change, status);
            }
        }

        // Created items are modified, grouped by timestamps to return
        let modifications = changes
            .iter()
            .enumerate()
            .filter(|(_, (item, _))| item.created())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let to_modify = modifications
            .iter()
            .filter(|index| changes[**index].1.modify_needed())
            .map(|index| (changes[*index].1.timestamps_to_return(), *index));
        for (timestamps_to_return, group) in group_by_key(to_modify) {
            let requests = group
                .iter()
                .filter_map(|index| {
                    let (item, change) = &changes[*index];
                    change.modify_request(item.client_handle(), item.server_handle())
                })
                .collect::<Vec<_>>();
            if requests.is_empty() {
                continue;
            }
            let response = cancellable(
                cancel,
                services.modify_monitored_items(subscription_id, timestamps_to_return, requests),
            )
            .await
            .map_err(|status| self.service_error("modify_monitored_items", status, cancel))?;
            let results = validate_results(
                "modify_monitored_items",
                response.results,
                &response.diagnostic_infos,
                group.len(),
            )?;
            for (n, (index, result)) in group.iter().zip(results.iter()).enumerate() {
                let (item, change) = &mut changes[*index];
                log_failure(
                    item,
                    result.status_code,
                    diagnostic(&response.diagnostic_infos, n),
                );
                item.set_modify_result(change, result);
            }
        }

        // Monitoring modes are set last, grouped by mode. A change whose modify has not
        // succeeded keeps its mode for the next attempt.
        let mode_changes = modifications
            .iter()
            .filter(|index| !changes[**index].1.modify_needed())
            .filter_map(|index| changes[*index].1.mode_change().map(|mode| (mode, *index)))
            .collect::<Vec<_>>();
        for (monitoring_mode, group) in group_by_key(mode_changes) {
            let mut targets = Vec::with_capacity(group.len());
            for index in group {
                let (item, change) = &mut changes[index];
                if !item.created() {
                    continue;
                }
                if item.current_monitoring_mode() == monitoring_mode {
                    item_trace!(item, "already in monitoring mode {}", monitoring_mode);
                    item.set_monitoring_mode_result(change, monitoring_mode, StatusCode::Good);
                } else {
                    targets.push(index);
                }
            }
            if targets.is_empty() {
                continue;
            }
            let ids = targets
                .iter()
                .map(|index| changes[*index].0.server_handle())
                .collect::<Vec<_>>();
            let response = cancellable(
                cancel,
                services.set_monitoring_mode(subscription_id, monitoring_mode, ids),
            )
            .await
            .map_err(|status| self.service_error("set_monitoring_mode", status, cancel))?;
            let results = validate_results(
                "set_monitoring_mode",
                response.results,
                &response.diagnostic_infos,
                targets.len(),
            )?;
            for (n, (index, status)) in targets.iter().zip(results).enumerate() {
                let (item, change) = &mut changes[*index];
                log_failure(item, status, diagnostic(&response.diagnostic_infos, n));
                item.set_monitoring_mode_result(change, monitoring_mode, status);
            }
        }

        // Everything not on the server is created, grouped by timestamps to return
        let creations = changes
            .iter()
            .enumerate()
            .filter(|(_, (item, _))| !item.created())
            .map(|(index, (_, change))| (change.timestamps_to_return(), index))
            .collect::<Vec<_>>();
        for (timestamps_to_return, group) in group_by_key(creations) {
            let requests = group
                .iter()
                .map(|index| {
                    let (item, change) = &changes[*index];
                    change.create_request(item.client_handle())
                })
                .collect::<Vec<_>>();
            let response = cancellable(
                cancel,
                services.create_monitored_items(
                    subscription_id,
                    timestamps_to_return,
                    requests.clone(),
                ),
            )
            .await
            .map_err(|status| self.service_error("create_monitored_items", status, cancel))?;
            let results = validate_results(
                "create_monitored_items",
                response.results,
                &response.diagnostic_infos,
                group.len(),
            )?;
            for (n, ((index, request), result)) in
                group.iter().zip(requests.iter()).zip(results.iter()).enumerate()
            {
                let (item, change) = &mut changes[*index];
                log_failure(
                    item,
                    result.status_code,
                    diagnostic(&response.diagnostic_infos, n),
                );
                item.set_create_result(change, request, result);
            }
        }
        Ok(())
    }

    /// Deletes items removed by the owner. Items the server no longer has are disposed too,
    /// others are queued for deletion again. Only cancellation is returned as an error, any
    /// other failure leaves the items queued for the next pass.
    async fn delete_removed_items(
        &self,
        deletes: Vec<Arc<MonitoredItem>>,
        cancel: &CancellationToken,
    ) -> Result<(), StatusCode> {
        let ids = deletes
            .iter()
            .map(|item| item.server_handle())
            .collect::<Vec<_>>();
        let services = self.context.monitored_item_service();
        let result = cancellable(
            cancel,
            services.delete_monitored_items(self.context.subscription_id(), ids),
        )
        .await
        .and_then(|response| {
            let results = validate_results(
                "delete_monitored_items",
                response.results,
                &response.diagnostic_infos,
                deletes.len(),
            )?;
            Ok((results, response.diagnostic_infos))
        });
        match result {
            Ok((results, diagnostic_infos)) => {
                for (n, (item, status)) in deletes.into_iter().zip(results).enumerate() {
                    if !status.is_bad()
                        || status.status() == StatusCode::BadMonitoredItemIdInvalid
                        || !item.created()
                    {
                        item.dispose();
                    } else {
                        log_failure(&item, status, diagnostic(&diagnostic_infos, n));
                        self.requeue_deletion(item);
                    }
                }
                Ok(())
            }
            Err(status) if is_cancelled(status, cancel) => {
                trace_lock!(self.collections).deleted.extend(deletes);
                Err(status)
            }
            Err(status) => {
                item_info!(self.context, "failed to delete monitored items, {}", status);
                deletes
                    .into_iter()
                    .for_each(|item| self.requeue_deletion(item));
                Ok(())
            }
        }
    }

    fn requeue_deletion(&self, item: Arc<MonitoredItem>) {
        let attempts = item.increment_delete_retries();
        if attempts > self.item_context.max_change_retries() {
            item_warn!(
                item,
                "giving up deleting the item after {} attempts",
                attempts
            );
            item.dispose();
        } else {
            trace_lock!(self.collections).deleted.push(item);
        }
    }

    fn service_error(
        &self,
        service: &str,
        status: StatusCode,
        cancel: &CancellationToken,
    ) -> StatusCode {
        if is_cancelled(status, cancel) {
            item_debug!(self.context, "{} cancelled", service);
        } else {
            item_error!(self.context, "{} failed {}", service, status);
        }
        status
    }

    /// Calls `Server.GetMonitoredItems` and returns the `(server handle, client handle)` pairs
    /// of the subscription.
    async fn get_monitored_items(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<(u32, u32)>, StatusCode> {
        let request = CallMethodRequest {
            object_id: ObjectId::Server.into(),
            method_id: MethodId::Server_GetMonitoredItems.into(),
            input_arguments: Some(vec![Variant::UInt32(self.context.subscription_id())]),
        };
        let response =
            cancellable(cancel, self.context.method_service().call(vec![request])).await?;
        let result = validate_results("call", response.results, &response.diagnostic_infos, 1)?
            .into_iter()
            .next()
            .ok_or(StatusCode::BadUnexpectedError)?;
        if result.status_code.is_bad() {
            return Err(result.status_code);
        }
        let handles: Option<Vec<(u32, u32)>> = match result.output_arguments.as_deref() {
            Some([server_handles, client_handles]) => {
                match (server_handles.as_u32_array(), client_handles.as_u32_array()) {
                    (Some(server_handles), Some(client_handles))
                        if server_handles.len() == client_handles.len() =>
                    {
                        Some(server_handles.into_iter().zip(client_handles).collect())
                    }
                    _ => None,
                }
            }
            _ => None,
        };
        handles.ok_or_else(|| {
            item_error!(
                self.context,
                "GetMonitoredItems returned unexpected output arguments {:?}",
                result.output_arguments
            );
            StatusCode::BadUnexpectedError
        })
    }
}

/// Runs the service call unless the token is cancelled first.
async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T, StatusCode>
where
    F: Future<Output = Result<T, StatusCode>>,
{
    if cancel.is_cancelled() {
        return Err(StatusCode::BadRequestCancelledByClient);
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(StatusCode::BadRequestCancelledByClient),
        result = call => result,
    }
}

fn is_cancelled(status: StatusCode, cancel: &CancellationToken) -> bool {
    status == StatusCode::BadRequestCancelledByClient && cancel.is_cancelled()
}

/// Checks that a response holds one result per request, and diagnostics are either absent or
/// one per request too.
fn validate_results<T>(
    service: &str,
    results: Option<Vec<T>>,
    diagnostic_infos: &Option<Vec<DiagnosticInfo>>,
    expected: usize,
) -> Result<Vec<T>, StatusCode> {
    let results = results.unwrap_or_default();
    if results.len() != expected {
        error!(
            "{} returned {} results for {} requests",
            service,
            results.len(),
            expected
        );
        return Err(StatusCode::BadUnexpectedError);
    }
    match diagnostic_infos {
        Some(diagnostic_infos)
            if !diagnostic_infos.is_empty() && diagnostic_infos.len() != expected =>
        {
            error!(
                "{} returned {} diagnostic infos for {} requests",
                service,
                diagnostic_infos.len(),
                expected
            );
            Err(StatusCode::BadUnexpectedError)
        }
        _ => Ok(results),
    }
}

fn diagnostic(
    diagnostic_infos: &Option<Vec<DiagnosticInfo>>,
    index: usize,
) -> Option<&DiagnosticInfo> {
    diagnostic_infos.as_ref().and_then(|d| d.get(index))
}

fn log_failure(item: &MonitoredItem, status: StatusCode, diagnostic: Option<&DiagnosticInfo>) {
    if status.is_bad() {
        match diagnostic.and_then(|d| d.additional_info.as_ref()) {
            Some(info) => item_debug!(item, "failed with {}, {}", status, info),
            None => item_debug!(item, "failed with {}", status),
        }
    }
}

/// Groups indices by key, keeping the order in which keys are first seen.
fn group_by_key<K, I>(keyed: I) -> Vec<(K, Vec<usize>)>
where
    K: PartialEq + Copy,
    I: IntoIterator<Item = (K, usize)>,
{
    let mut groups: Vec<(K, Vec<usize>)> = Vec::new();
    for (key, index) in keyed {
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.push(index),
            None => groups.push((key, vec![index])),
        }
    }
    groups
}
