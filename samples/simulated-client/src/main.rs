// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! This sample drives a monitored item manager against a simulated server that lives in the
//! same process.
//!
//! 1. Create the desired items, either from a configuration file or generated
//! 2. Apply them from a background task whenever the manager reports pending work
//! 3. Change the monitoring mode of one item and remove another
//! 4. Make the server forget its items, as if the session was lost, and resynchronize
use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use log::info;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use opcua_monitoring::prelude::*;

struct Args {
    help: bool,
    config: Option<String>,
    items: u32,
    publishing_interval: f64,
    min_sampling_interval: f64,
}

impl Args {
    pub fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
        let mut args = pico_args::Arguments::from_env();
        Ok(Args {
            help: args.contains(["-h", "--help"]),
            config: args.opt_value_from_str("--config")?,
            items: args.opt_value_from_str("--items")?.unwrap_or(DEFAULT_ITEMS),
            publishing_interval: args
                .opt_value_from_str("--publishing-interval")?
                .unwrap_or(DEFAULT_PUBLISHING_INTERVAL),
            min_sampling_interval: args
                .opt_value_from_str("--min-sampling-interval")?
                .unwrap_or(DEFAULT_MIN_SAMPLING_INTERVAL),
        })
    }

    pub fn usage() {
        println!(
            r#"Simulated Client
Usage:
  -h, --help                     Show help
  --config [path]                Monitored item configuration to load (default: generated items)
  --items [count]                Number of generated items (default: {})
  --publishing-interval [ms]     Publishing interval of the subscription (default: {})
  --min-sampling-interval [ms]   Fastest sampling interval the server grants (default: {})"#,
            DEFAULT_ITEMS, DEFAULT_PUBLISHING_INTERVAL, DEFAULT_MIN_SAMPLING_INTERVAL
        );
    }
}

const DEFAULT_ITEMS: u32 = 4;
const DEFAULT_PUBLISHING_INTERVAL: f64 = 1000.0;
const DEFAULT_MIN_SAMPLING_INTERVAL: f64 = 250.0;

/// A monitored item as the simulated server holds it.
#[derive(Debug, Clone)]
struct ServerItem {
    client_handle: u32,
    node_id: NodeId,
    monitoring_mode: MonitoringMode,
    sampling_interval: f64,
    queue_size: u32,
}

/// Server side of one subscription. It grants sampling intervals no faster than its minimum
/// and rejects the null node.
struct SimulatedServer {
    min_sampling_interval: f64,
    next_server_handle: Mutex<u32>,
    items: Mutex<BTreeMap<u32, ServerItem>>,
}

impl SimulatedServer {
    fn new(min_sampling_interval: f64) -> SimulatedServer {
        SimulatedServer {
            min_sampling_interval,
            next_server_handle: Mutex::new(100),
            items: Mutex::new(BTreeMap::new()),
        }
    }

    fn revise_sampling_interval(&self, sampling_interval: f64) -> f64 {
        sampling_interval.max(self.min_sampling_interval)
    }

    /// Forgets every item, the way a server does when the session is lost
    fn lose_items(&self) {
        self.items.lock().clear();
    }

    /// Produces a value change for every reporting item
    fn sample(&self, tick: u32) -> DataChangeNotification {
        let monitored_items = self
            .items
            .lock()
            .values()
            .filter(|item| item.monitoring_mode == MonitoringMode::Reporting)
            .map(|item| MonitoredItemNotification {
                client_handle: item.client_handle,
                value: DataValue::new_now(tick as f64 * 1.5),
            })
            .collect();
        DataChangeNotification {
            monitored_items: Some(monitored_items),
            diagnostic_infos: None,
        }
    }
}

#[async_trait]
impl MonitoredItemServiceSet for SimulatedServer {
    async fn create_monitored_items(
        &self,
        _subscription_id: u32,
        _timestamps_to_return: TimestampsToReturn,
        items_to_create: Vec<MonitoredItemCreateRequest>,
    ) -> Result<CreateMonitoredItemsResponse, StatusCode> {
        let mut items = self.items.lock();
        let mut next_server_handle = self.next_server_handle.lock();
        let results = items_to_create
            .into_iter()
            .map(|request| {
                if request.item_to_monitor.node_id.is_null() {
                    return MonitoredItemCreateResult {
                        status_code: StatusCode::BadNodeIdUnknown,
                        ..Default::default()
                    };
                }
                let server_handle = *next_server_handle;
                *next_server_handle += 1;
                let parameters = request.requested_parameters;
                let item = ServerItem {
                    client_handle: parameters.client_handle,
                    node_id: request.item_to_monitor.node_id,
                    monitoring_mode: request.monitoring_mode,
                    sampling_interval: self.revise_sampling_interval(parameters.sampling_interval),
                    queue_size: parameters.queue_size.max(1),
                };
                let result = MonitoredItemCreateResult {
                    status_code: StatusCode::Good,
                    monitored_item_id: server_handle,
                    revised_sampling_interval: item.sampling_interval,
                    revised_queue_size: item.queue_size,
                    filter_result: None,
                };
                items.insert(server_handle, item);
                result
            })
            .collect();
        Ok(CreateMonitoredItemsResponse {
            results: Some(results),
            diagnostic_infos: None,
        })
    }

    async fn modify_monitored_items(
        &self,
        _subscription_id: u32,
        _timestamps_to_return: TimestampsToReturn,
        items_to_modify: Vec<MonitoredItemModifyRequest>,
    ) -> Result<ModifyMonitoredItemsResponse, StatusCode> {
        let mut items = self.items.lock();
        let results = items_to_modify
            .into_iter()
            .map(|request| match items.get_mut(&request.monitored_item_id) {
                Some(item) => {
                    let parameters = request.requested_parameters;
                    item.sampling_interval =
                        self.revise_sampling_interval(parameters.sampling_interval);
                    item.queue_size = parameters.queue_size.max(1);
                    MonitoredItemModifyResult {
                        status_code: StatusCode::Good,
                        revised_sampling_interval: item.sampling_interval,
                        revised_queue_size: item.queue_size,
                        filter_result: None,
                    }
                }
                None => MonitoredItemModifyResult {
                    status_code: StatusCode::BadMonitoredItemIdInvalid,
                    ..Default::default()
                },
            })
            .collect();
        Ok(ModifyMonitoredItemsResponse {
            results: Some(results),
            diagnostic_infos: None,
        })
    }

    async fn set_monitoring_mode(
        &self,
        _subscription_id: u32,
        monitoring_mode: MonitoringMode,
        monitored_item_ids: Vec<u32>,
    ) -> Result<SetMonitoringModeResponse, StatusCode> {
        let mut items = self.items.lock();
        let results = monitored_item_ids
            .iter()
            .map(|id| match items.get_mut(id) {
                Some(item) => {
                    item.monitoring_mode = monitoring_mode;
                    StatusCode::Good
                }
                None => StatusCode::BadMonitoredItemIdInvalid,
            })
            .collect();
        Ok(SetMonitoringModeResponse {
            results: Some(results),
            diagnostic_infos: None,
        })
    }

    async fn delete_monitored_items(
        &self,
        _subscription_id: u32,
        monitored_item_ids: Vec<u32>,
    ) -> Result<DeleteMonitoredItemsResponse, StatusCode> {
        let mut items = self.items.lock();
        let results = monitored_item_ids
            .iter()
            .map(|id| match items.remove(id) {
                Some(item) => {
                    info!("Server deleted monitored item {} on {}", id, item.node_id);
                    StatusCode::Good
                }
                None => StatusCode::BadMonitoredItemIdInvalid,
            })
            .collect();
        Ok(DeleteMonitoredItemsResponse {
            results: Some(results),
            diagnostic_infos: None,
        })
    }
}

#[async_trait]
impl MethodServiceSet for SimulatedServer {
    async fn call(
        &self,
        methods_to_call: Vec<CallMethodRequest>,
    ) -> Result<CallResponse, StatusCode> {
        let items = self.items.lock();
        let results = methods_to_call
            .into_iter()
            .map(|request| {
                if request.method_id != MethodId::Server_GetMonitoredItems.into() {
                    return CallMethodResult {
                        status_code: StatusCode::BadMethodInvalid,
                        ..Default::default()
                    };
                }
                let server_handles = items.keys().copied().collect::<Vec<u32>>();
                let client_handles = items.values().map(|i| i.client_handle).collect::<Vec<u32>>();
                CallMethodResult {
                    status_code: StatusCode::Good,
                    input_argument_results: None,
                    output_arguments: Some(vec![server_handles.into(), client_handles.into()]),
                }
            })
            .collect();
        Ok(CallResponse {
            results: Some(results),
            diagnostic_infos: None,
        })
    }
}

/// The client subscription, which wakes the apply task when changes are pending.
struct SimulatedSubscription {
    subscription_id: u32,
    server: Arc<SimulatedServer>,
    work_pending: Notify,
}

impl fmt::Display for SimulatedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulated:{}", self.subscription_id)
    }
}

impl SubscriptionContext for SimulatedSubscription {
    fn subscription_id(&self) -> u32 {
        self.subscription_id
    }

    fn monitored_item_service(&self) -> &dyn MonitoredItemServiceSet {
        self.server.as_ref()
    }

    fn method_service(&self) -> &dyn MethodServiceSet {
        self.server.as_ref()
    }

    fn notify_work_pending(&self) {
        self.work_pending.notify_one();
    }

    fn on_item_change_result(&self, item: &MonitoredItem, result: &ItemChangeResult) {
        if result.status.is_bad() {
            println!(
                "  {} change {} failed with {} (final = {}, retries = {})",
                item, result.change_id, result.status, result.is_final, result.retry_count
            );
        } else if result.is_final {
            println!("  {} change {} applied", item, result.change_id);
        }
    }
}

/// Applies changes whenever the subscription is told that work is pending
async fn apply_loop(
    subscription: Arc<SimulatedSubscription>,
    manager: Arc<MonitoredItemManager>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = subscription.work_pending.notified() => {
                if let Err(status) = manager.apply_changes(true, false, &cancel).await {
                    println!("ERROR: Applying changes failed - {}", status);
                }
            }
        }
    }
}

fn desired_state(args: &Args) -> Result<Vec<(String, MonitoredItemConfiguration)>, ()> {
    if let Some(ref config) = args.config {
        let config: MonitoredItemManagerConfig =
            MonitoredItemManagerConfig::load(&PathBuf::from(config))?;
        Ok(config.desired_state())
    } else {
        Ok((1..=args.items)
            .map(|n| {
                let name = format!("v{}", n);
                let configuration = MonitoredItemConfiguration {
                    sampling_interval: Duration::from_millis(100),
                    auto_set_queue_size: true,
                    order: n,
                    ..MonitoredItemConfiguration::new(NodeId::new(2, name.as_str()))
                };
                (name, configuration)
            })
            .collect())
    }
}

fn print_items(manager: &MonitoredItemManager) {
    for item in manager.items() {
        println!(
            "  {} {:?}, sampling {:?}, queue {}, {}",
            item,
            item.state(),
            item.current_sampling_interval(),
            item.current_queue_size(),
            item.current_monitoring_mode()
        );
    }
}

fn print_values(manager: &MonitoredItemManager, notification: DataChangeNotification) {
    for change in manager.map_data_change_notification(notification) {
        match change.item {
            Some(item) => println!(
                "  Item \"{}\", Value = {:?}",
                item.name(),
                change.value.value
            ),
            None => println!(
                "  No item for client handle {}, value dropped",
                change.client_handle
            ),
        }
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    // Read command line arguments
    let args = Args::parse_args().map_err(|_| Args::usage())?;
    if args.help {
        Args::usage();
        return Ok(());
    }

    // Optional - enable OPC UA logging
    opcua_monitoring::console_logging::init();

    let state = desired_state(&args)?;
    let server = Arc::new(SimulatedServer::new(args.min_sampling_interval));
    let subscription = Arc::new(SimulatedSubscription {
        subscription_id: 1,
        server: server.clone(),
        work_pending: Notify::new(),
    });
    let manager = Arc::new(MonitoredItemManager::new(
        subscription.clone(),
        Arc::new(AtomicHandle::new(1)),
        &MonitoredItemManagerConfig::default(),
    ));

    let cancel = CancellationToken::new();
    let apply_task = tokio::spawn(apply_loop(
        subscription.clone(),
        manager.clone(),
        cancel.clone(),
    ));

    println!("Creating {} monitored items", state.len());
    let items = manager.update(&state);
    settle().await;
    manager.on_subscription_state_change(
        SubscriptionState::Created,
        Duration::from_secs_f64(args.publishing_interval / 1000.0),
    );
    settle().await;
    print_items(&manager);
    print_values(&manager, server.sample(1));

    if let Some(first) = items.first() {
        println!("Disabling {}", first.name());
        if let Some(configuration) = first.configuration() {
            first.set_configuration(MonitoredItemConfiguration {
                monitoring_mode: MonitoringMode::Disabled,
                ..(*configuration).clone()
            });
        }
    }
    if items.len() > 1 {
        let last = &items[items.len() - 1];
        println!("Removing {}", last.name());
        manager.remove(last.client_handle());
    }
    settle().await;
    print_items(&manager);
    print_values(&manager, server.sample(2));

    println!("Server lost its monitored items, resynchronizing");
    server.lose_items();
    if !manager.try_synchronize_handles(&cancel).await {
        println!("ERROR: Could not synchronize handles with the server");
    }
    // Reset items are recreated by the apply task
    subscription.notify_work_pending();
    settle().await;
    print_items(&manager);
    print_values(&manager, server.sample(3));

    cancel.cancel();
    let _ = apply_task.await;
    manager.dispose();
    Ok(())
}
