use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{client::subscriptions::*, core::handle::AtomicHandle, types::*};

use super::mock::{desired_state, item_config, new_manager, new_manager_with, ServiceCall};

async fn apply(manager: &MonitoredItemManager) -> Result<bool, StatusCode> {
    manager
        .apply_changes(true, false, &CancellationToken::new())
        .await
}

async fn apply_once(manager: &MonitoredItemManager) -> Result<bool, StatusCode> {
    manager
        .apply_changes(false, false, &CancellationToken::new())
        .await
}

#[tokio::test]
async fn client_handles_are_unique() {
    let (_, manager) = new_manager();
    let items = manager.update(&desired_state(&["a", "b", "c"]));
    assert_eq!(
        items.iter().map(|i| i.client_handle()).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let (added, d) = manager.try_add("d", item_config("d"));
    assert!(added);
    assert_eq!(d.client_handle(), 4);

    assert!(manager.remove(2));
    let items = manager.update(&desired_state(&["a", "b", "c", "d", "e"]));
    let handles = items.iter().map(|i| i.client_handle()).collect::<Vec<_>>();
    // A re-added name gets a new handle
    assert_eq!(handles, vec![1, 5, 3, 4, 6]);
    assert_eq!(handles.iter().collect::<HashSet<_>>().len(), handles.len());
}

#[tokio::test]
async fn client_handles_are_unique_across_managers() {
    let handles = Arc::new(AtomicHandle::new(1));
    let config = MonitoredItemManagerConfig::default();
    let (_, m1) = new_manager_with(handles.clone(), &config);
    let (_, m2) = new_manager_with(handles.clone(), &config);

    let mut seen = HashSet::new();
    for n in 0..10 {
        let name = format!("item{}", n);
        let (_, i1) = m1.try_add(&name, item_config(&name));
        let (_, i2) = m2.try_add(&name, item_config(&name));
        assert!(seen.insert(i1.client_handle()));
        assert!(seen.insert(i2.client_handle()));
    }
    assert_eq!(seen.len(), 20);
}

#[tokio::test]
async fn try_add_keeps_existing_item() {
    let (subscription, manager) = new_manager();
    let (added, item) = manager.try_add("a", item_config("a"));
    assert!(added);
    assert_eq!(subscription.work_pending(), 1);

    let (added, existing) = manager.try_add("a", item_config("other"));
    assert!(!added);
    assert!(Arc::ptr_eq(&item, &existing));
    assert_eq!(
        existing.configuration().unwrap().node_id,
        NodeId::new(2, "a")
    );
    assert_eq!(existing.pending_changes(), 1);
    assert_eq!(subscription.work_pending(), 1);
    assert_eq!(manager.count(), 1);
}

#[tokio::test]
async fn lookup_items() {
    let (_, manager) = new_manager();
    manager.update(&desired_state(&["b", "a"]));
    assert_eq!(manager.count(), 2);
    assert_eq!(manager.by_name("a").unwrap().client_handle(), 2);
    assert_eq!(manager.by_client_handle(1).unwrap().name(), "b");
    assert!(manager.by_name("c").is_none());
    assert!(manager.by_client_handle(3).is_none());
    assert_eq!(
        manager
            .items()
            .iter()
            .map(|i| i.name().to_string())
            .collect::<Vec<_>>(),
        vec!["b", "a"]
    );
}

#[tokio::test]
async fn nothing_to_apply() {
    let (subscription, manager) = new_manager();
    assert_eq!(apply(&manager).await, Ok(false));
    assert!(subscription.server.calls().is_empty());
}

#[tokio::test]
async fn apply_creates_items_in_one_call() {
    let (subscription, manager) = new_manager();
    let items = manager.update(&desired_state(&["a", "b", "c"]));
    assert_eq!(subscription.work_pending(), 1);

    assert_eq!(apply(&manager).await, Ok(true));
    assert_eq!(
        subscription.server.calls(),
        vec![ServiceCall::Create {
            timestamps_to_return: TimestampsToReturn::Both,
            client_handles: vec![1, 2, 3],
        }]
    );
    for (n, item) in items.iter().enumerate() {
        assert_eq!(item.state(), MonitoredItemState::Created);
        assert_eq!(item.server_handle(), 1000 + n as u32);
        assert_eq!(item.last_error(), StatusCode::Good);
    }
    assert_eq!(subscription.server.items().len(), 3);
}

#[tokio::test]
async fn update_is_idempotent() {
    let (subscription, manager) = new_manager();
    let state = desired_state(&["a", "b", "c"]);
    let first = manager.update(&state);
    assert_eq!(apply(&manager).await, Ok(true));
    let work_pending = subscription.work_pending();

    let second = manager.update(&state);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(b.pending_changes(), 0);
    }
    assert_eq!(subscription.work_pending(), work_pending);

    subscription.server.clear_calls();
    assert_eq!(apply(&manager).await, Ok(false));
    assert!(subscription.server.calls().is_empty());
}

#[tokio::test]
async fn revised_sampling_interval_is_current() {
    let (subscription, manager) = new_manager();
    subscription.server.revise_sampling_interval(200.0);
    let items = manager.update(&desired_state(&["a"]));
    assert_eq!(apply(&manager).await, Ok(true));

    let item = &items[0];
    assert_eq!(item.current_sampling_interval(), Duration::from_millis(200));
    assert_eq!(
        item.configuration().unwrap().sampling_interval,
        Duration::from_millis(100)
    );
}

#[tokio::test]
async fn auto_queue_size_is_modified() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add(
        "a",
        MonitoredItemConfiguration {
            auto_set_queue_size: true,
            ..item_config("a")
        },
    );
    assert_eq!(apply(&manager).await, Ok(true));
    assert_eq!(item.current_queue_size(), 1);

    manager.on_subscription_state_change(SubscriptionState::Created, Duration::from_millis(1000));
    let change = item.pending_change().unwrap();
    assert_eq!(change.operation(), ChangeOperation::Modify { mode_change: None });
    assert_eq!(change.configuration().queue_size, 11);

    subscription.server.clear_calls();
    assert_eq!(apply(&manager).await, Ok(true));
    assert_eq!(
        subscription.server.calls(),
        vec![ServiceCall::Modify {
            timestamps_to_return: TimestampsToReturn::Both,
            server_handles: vec![1000],
        }]
    );
    assert_eq!(item.current_queue_size(), 11);
    assert_eq!(subscription.server.item(1000).unwrap().queue_size, 11);
}

#[tokio::test]
async fn mode_change_only_sets_monitoring_mode() {
    let (subscription, manager) = new_manager();
    let items = manager.update(&desired_state(&["a", "b"]));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();

    let disabled = vec![
        (
            "a".to_string(),
            MonitoredItemConfiguration {
                monitoring_mode: MonitoringMode::Disabled,
                ..item_config("a")
            },
        ),
        ("b".to_string(), item_config("b")),
    ];
    manager.update(&disabled);
    assert_eq!(items[0].state(), MonitoredItemState::PendingModeChange);
    assert_eq!(apply(&manager).await, Ok(true));

    let server = &subscription.server;
    assert_eq!(
        server.calls(),
        vec![ServiceCall::SetMonitoringMode {
            monitoring_mode: MonitoringMode::Disabled,
            server_handles: vec![1000],
        }]
    );
    assert_eq!(server.count_calls(ServiceCall::is_modify), 0);
    assert_eq!(items[0].current_monitoring_mode(), MonitoringMode::Disabled);
    assert_eq!(
        server.item(1000).unwrap().monitoring_mode,
        MonitoringMode::Disabled
    );
    assert_eq!(items[0].state(), MonitoredItemState::Created);
}

#[tokio::test]
async fn modify_and_mode_change_in_one_pass() {
    let (subscription, manager) = new_manager();
    let items = manager.update(&desired_state(&["a"]));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();

    manager.update(&[(
        "a".to_string(),
        MonitoredItemConfiguration {
            sampling_interval: Duration::from_millis(250),
            monitoring_mode: MonitoringMode::Sampling,
            ..item_config("a")
        },
    )]);
    assert_eq!(apply_once(&manager).await, Ok(true));

    let calls = subscription.server.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].is_modify());
    assert!(calls[1].is_set_monitoring_mode());
    assert_eq!(items[0].state(), MonitoredItemState::Created);
    assert_eq!(
        items[0].current_sampling_interval(),
        Duration::from_millis(250)
    );
    assert_eq!(items[0].current_monitoring_mode(), MonitoringMode::Sampling);
}

#[tokio::test]
async fn rejected_mode_change_recreates() {
    let (subscription, manager) = new_manager();
    let items = manager.update(&desired_state(&["a"]));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();
    subscription
        .server
        .fail_set_monitoring_mode(1000, StatusCode::BadMonitoringModeInvalid);

    manager.update(&[(
        "a".to_string(),
        MonitoredItemConfiguration {
            monitoring_mode: MonitoringMode::Disabled,
            ..item_config("a")
        },
    )]);
    assert_eq!(apply(&manager).await, Ok(true));

    let calls = subscription.server.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].is_set_monitoring_mode());
    assert!(calls[1].is_delete());
    assert!(calls[2].is_create());
    assert_eq!(items[0].server_handle(), 1001);
    assert_eq!(items[0].state(), MonitoredItemState::Created);
    assert_eq!(items[0].current_monitoring_mode(), MonitoringMode::Disabled);
    assert_eq!(
        subscription.server.item(1001).unwrap().monitoring_mode,
        MonitoringMode::Disabled
    );
    assert!(subscription.server.item(1000).is_none());
}

#[tokio::test]
async fn revised_queue_size_wins() {
    let (subscription, manager) = new_manager();
    subscription.server.revise_queue_size(2);
    let desired = vec![(
        "a".to_string(),
        MonitoredItemConfiguration {
            queue_size: 5,
            ..item_config("a")
        },
    )];
    let items = manager.update(&desired);
    assert_eq!(apply(&manager).await, Ok(true));
    assert_eq!(items[0].current_queue_size(), 2);
    assert_eq!(subscription.server.item(1000).unwrap().queue_size, 2);

    // The requested size is not asked for again
    manager.update(&desired);
    assert_eq!(apply(&manager).await, Ok(false));
    assert_eq!(subscription.server.calls().len(), 1);
}

#[tokio::test]
async fn calls_are_grouped_by_timestamps() {
    let (subscription, manager) = new_manager();
    let source = |name: &str| MonitoredItemConfiguration {
        timestamps_to_return: TimestampsToReturn::Source,
        ..item_config(name)
    };
    manager.update(&[
        ("a".to_string(), item_config("a")),
        ("b".to_string(), source("b")),
        ("c".to_string(), item_config("c")),
    ]);
    assert_eq!(apply(&manager).await, Ok(true));
    assert_eq!(
        subscription.server.calls(),
        vec![
            ServiceCall::Create {
                timestamps_to_return: TimestampsToReturn::Both,
                client_handles: vec![1, 3],
            },
            ServiceCall::Create {
                timestamps_to_return: TimestampsToReturn::Source,
                client_handles: vec![2],
            },
        ]
    );
}

#[tokio::test]
async fn remove_never_created_item_makes_no_call() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    assert!(manager.remove(item.client_handle()));
    assert!(!manager.remove(item.client_handle()));
    assert_eq!(item.state(), MonitoredItemState::PendingDelete);
    assert_eq!(manager.count(), 0);

    assert_eq!(apply(&manager).await, Ok(true));
    assert!(subscription.server.calls().is_empty());
    assert!(item.is_disposed());
}

#[tokio::test]
async fn update_deletes_removed_items() {
    let (subscription, manager) = new_manager();
    let items = manager.update(&desired_state(&["a", "b"]));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();

    let kept = manager.update(&desired_state(&["a"]));
    assert_eq!(kept.len(), 1);
    assert!(manager.by_name("b").is_none());
    assert_eq!(items[1].state(), MonitoredItemState::PendingDelete);

    assert_eq!(apply(&manager).await, Ok(true));
    assert_eq!(
        subscription.server.calls(),
        vec![ServiceCall::Delete {
            server_handles: vec![1001],
        }]
    );
    assert!(items[1].is_disposed());
    assert_eq!(
        subscription.server.items().keys().copied().collect::<Vec<_>>(),
        vec![1000]
    );
}

#[tokio::test]
async fn failed_delete_is_retried() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    assert_eq!(apply(&manager).await, Ok(true));

    subscription
        .server
        .fail_delete(1000, StatusCode::BadTooManyOperations);
    manager.remove(item.client_handle());
    assert_eq!(apply_once(&manager).await, Ok(true));
    assert!(!item.is_disposed());
    assert_eq!(item.state(), MonitoredItemState::PendingDelete);

    subscription.server.clear_failures();
    assert_eq!(apply_once(&manager).await, Ok(true));
    assert!(item.is_disposed());
    assert_eq!(subscription.server.count_calls(ServiceCall::is_delete), 2);
    assert!(subscription.server.items().is_empty());
}

#[tokio::test]
async fn delete_is_given_up_after_max_retries() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    assert_eq!(apply(&manager).await, Ok(true));

    subscription.server.fail_service(StatusCode::BadTooManyOperations);
    manager.remove(item.client_handle());
    assert_eq!(apply(&manager).await, Ok(true));
    assert!(item.is_disposed());
    assert_eq!(
        subscription.server.count_calls(ServiceCall::is_delete) as u32,
        DEFAULT_MAX_CHANGE_RETRIES + 1
    );
}

#[tokio::test]
async fn partial_create_failure() {
    let (subscription, manager) = new_manager();
    subscription
        .server
        .fail_create(2, StatusCode::BadNodeIdUnknown);
    let items = manager.update(&desired_state(&["a", "b", "c"]));
    assert_eq!(apply_once(&manager).await, Ok(true));

    assert!(items[0].created());
    assert!(!items[1].created());
    assert!(items[2].created());
    assert_eq!(items[1].last_error(), StatusCode::BadNodeIdUnknown);
    assert_eq!(items[1].pending_change().unwrap().retry_count(), 1);
    assert_eq!(items[1].state(), MonitoredItemState::PendingCreate);

    let results = subscription.results_for(2);
    assert_eq!(results.len(), 1);
    assert!(!results[0].is_final);

    subscription.server.clear_failures();
    subscription.server.clear_calls();
    assert_eq!(apply_once(&manager).await, Ok(true));
    assert_eq!(
        subscription.server.calls(),
        vec![ServiceCall::Create {
            timestamps_to_return: TimestampsToReturn::Both,
            client_handles: vec![2],
        }]
    );
    assert!(items[1].created());
}

#[tokio::test]
async fn drain_stops_after_max_retries() {
    let (subscription, manager) = new_manager();
    subscription
        .server
        .fail_create(1, StatusCode::BadNodeIdUnknown);
    let (_, item) = manager.try_add("a", item_config("a"));

    assert_eq!(apply(&manager).await, Ok(true));
    assert_eq!(
        subscription.server.count_calls(ServiceCall::is_create) as u32,
        DEFAULT_MAX_CHANGE_RETRIES + 1
    );
    assert_eq!(item.pending_changes(), 0);
    assert_eq!(item.state(), MonitoredItemState::NotCreated);
    assert_eq!(item.last_error(), StatusCode::BadNodeIdUnknown);
}

#[tokio::test]
async fn configured_max_change_retries() {
    let config = MonitoredItemManagerConfig {
        max_change_retries: 1,
        ..Default::default()
    };
    let (subscription, manager) = new_manager_with(Arc::new(AtomicHandle::new(1)), &config);
    subscription
        .server
        .fail_create(1, StatusCode::BadNodeIdUnknown);
    manager.try_add("a", item_config("a"));

    assert_eq!(apply(&manager).await, Ok(true));
    assert_eq!(subscription.server.count_calls(ServiceCall::is_create), 2);
}

#[tokio::test]
async fn target_change_deletes_then_creates() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();

    manager.update(&[("a".to_string(), item_config("other"))]);
    assert_eq!(item.state(), MonitoredItemState::PendingCreate);
    assert_eq!(apply_once(&manager).await, Ok(true));

    assert_eq!(
        subscription.server.calls(),
        vec![
            ServiceCall::Delete {
                server_handles: vec![1000],
            },
            ServiceCall::Create {
                timestamps_to_return: TimestampsToReturn::Both,
                client_handles: vec![1],
            },
        ]
    );
    assert_eq!(item.client_handle(), 1);
    assert_eq!(item.server_handle(), 1001);
    assert_eq!(
        subscription.server.items().keys().copied().collect::<Vec<_>>(),
        vec![1001]
    );
}

#[tokio::test]
async fn rejected_modify_recreates() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();
    subscription
        .server
        .fail_modify(1000, StatusCode::BadMonitoredItemFilterUnsupported);

    manager.update(&[(
        "a".to_string(),
        MonitoredItemConfiguration {
            sampling_interval: Duration::from_millis(500),
            ..item_config("a")
        },
    )]);
    assert_eq!(apply(&manager).await, Ok(true));

    let calls = subscription.server.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].is_modify());
    assert!(calls[1].is_delete());
    assert!(calls[2].is_create());
    assert_eq!(item.server_handle(), 1001);
    assert_eq!(item.current_sampling_interval(), Duration::from_millis(500));
    assert_eq!(item.state(), MonitoredItemState::Created);
}

#[tokio::test]
async fn transient_modify_failure_is_retried() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();
    subscription
        .server
        .fail_modify(1000, StatusCode::BadCommunicationError);

    manager.update(&[(
        "a".to_string(),
        MonitoredItemConfiguration {
            queue_size: 4,
            ..item_config("a")
        },
    )]);
    assert_eq!(apply_once(&manager).await, Ok(true));
    assert_eq!(item.state(), MonitoredItemState::PendingModify);
    assert_eq!(item.server_handle(), 1000);

    subscription.server.clear_failures();
    assert_eq!(apply_once(&manager).await, Ok(true));
    assert_eq!(item.state(), MonitoredItemState::Created);
    assert_eq!(item.current_queue_size(), 4);
    assert_eq!(subscription.server.count_calls(ServiceCall::is_modify), 2);
    assert_eq!(subscription.server.count_calls(ServiceCall::is_delete), 0);
}

#[tokio::test]
async fn mode_waits_for_failed_modify() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();
    subscription
        .server
        .fail_modify(1000, StatusCode::BadCommunicationError);

    manager.update(&[(
        "a".to_string(),
        MonitoredItemConfiguration {
            queue_size: 4,
            monitoring_mode: MonitoringMode::Sampling,
            ..item_config("a")
        },
    )]);
    assert_eq!(apply_once(&manager).await, Ok(true));
    assert_eq!(subscription.server.calls().len(), 1);
    assert_eq!(item.state(), MonitoredItemState::PendingModify);
    assert_eq!(item.current_monitoring_mode(), MonitoringMode::Reporting);
    let change = item.pending_change().unwrap();
    assert_eq!(
        change.operation(),
        ChangeOperation::Modify {
            mode_change: Some(MonitoringMode::Sampling)
        }
    );
    assert_eq!(change.retry_count(), 1);

    subscription.server.clear_failures();
    assert_eq!(apply_once(&manager).await, Ok(true));
    assert_eq!(item.state(), MonitoredItemState::Created);
    assert_eq!(item.current_queue_size(), 4);
    assert_eq!(item.current_monitoring_mode(), MonitoringMode::Sampling);
    let server_item = subscription.server.item(1000).unwrap();
    assert_eq!(server_item.queue_size, 4);
    assert_eq!(server_item.monitoring_mode, MonitoringMode::Sampling);
    assert_eq!(subscription.server.count_calls(ServiceCall::is_modify), 2);
    assert_eq!(
        subscription
            .server
            .count_calls(ServiceCall::is_set_monitoring_mode),
        1
    );
}

#[tokio::test]
async fn modify_retries_count_with_mode_change() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();
    subscription
        .server
        .fail_modify(1000, StatusCode::BadCommunicationError);

    manager.update(&[(
        "a".to_string(),
        MonitoredItemConfiguration {
            queue_size: 4,
            monitoring_mode: MonitoringMode::Disabled,
            ..item_config("a")
        },
    )]);
    assert_eq!(apply(&manager).await, Ok(true));
    assert_eq!(subscription.server.count_calls(ServiceCall::is_modify), 6);
    assert_eq!(
        subscription
            .server
            .count_calls(ServiceCall::is_set_monitoring_mode),
        0
    );
    assert!(item.pending_change().is_none());
    assert_eq!(item.last_error(), StatusCode::BadCommunicationError);
}

#[tokio::test]
async fn service_failure_is_returned() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    subscription.server.fail_service(StatusCode::BadTooManyOperations);

    assert_eq!(apply(&manager).await, Err(StatusCode::BadTooManyOperations));
    let change = item.pending_change().unwrap();
    assert_eq!(change.retry_count(), 0);
    assert!(!item.created());

    subscription.server.clear_failures();
    assert_eq!(apply(&manager).await, Ok(true));
    assert!(item.created());
}

#[tokio::test]
async fn result_count_mismatch_is_an_error() {
    let (subscription, manager) = new_manager();
    manager.update(&desired_state(&["a", "b"]));
    subscription.server.truncate_results();
    assert_eq!(apply(&manager).await, Err(StatusCode::BadUnexpectedError));
}

#[tokio::test]
async fn cancelled_apply_makes_no_calls() {
    let (subscription, manager) = new_manager();
    let (_, item) = manager.try_add("a", item_config("a"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert_eq!(manager.apply_changes(true, false, &cancel).await, Ok(false));
    assert!(subscription.server.calls().is_empty());
    assert_eq!(item.pending_changes(), 1);
}

#[tokio::test]
async fn reset_all_recreates_every_item() {
    let (subscription, manager) = new_manager();
    let items = manager.update(&desired_state(&["a", "b"]));
    assert_eq!(apply(&manager).await, Ok(true));
    subscription.server.clear_calls();

    assert_eq!(
        manager
            .apply_changes(true, true, &CancellationToken::new())
            .await,
        Ok(true)
    );
    assert_eq!(
        subscription.server.calls(),
        vec![ServiceCall::Create {
            timestamps_to_return: TimestampsToReturn::Both,
            client_handles: vec![1, 2],
        }]
    );
    assert_eq!(items[0].server_handle(), 1002);
    assert_eq!(items[1].server_handle(), 1003);
}

#[tokio::test]
async fn data_change_notification_is_mapped() {
    let (_, manager) = new_manager();
    manager.update(&desired_state(&["a", "b"]));

    let notification = DataChangeNotification {
        monitored_items: Some(vec![
            MonitoredItemNotification {
                client_handle: 2,
                value: DataValue::value_only(1.5),
            },
            MonitoredItemNotification {
                client_handle: 99,
                value: DataValue::value_only(2.5),
            },
            MonitoredItemNotification {
                client_handle: 1,
                value: DataValue::value_only(3.5),
            },
        ]),
        diagnostic_infos: Some(vec![
            DiagnosticInfo::null(),
            DiagnosticInfo::with_additional_info("unknown"),
            DiagnosticInfo::null(),
        ]),
    };
    let changes = manager.map_data_change_notification(notification);
    assert_eq!(changes.len(), 3);
    assert_eq!(changes[0].item.as_ref().unwrap().name(), "b");
    assert!(changes[1].item.is_none());
    assert_eq!(changes[1].client_handle, 99);
    assert_eq!(changes[1].value.value, Some(Variant::Double(2.5)));
    assert_eq!(
        changes[1].diagnostic_info.as_ref().unwrap().additional_info,
        Some("unknown".to_string())
    );
    assert_eq!(changes[2].item.as_ref().unwrap().name(), "a");

    let empty = manager.map_data_change_notification(DataChangeNotification::default());
    assert!(empty.is_empty());
}

#[tokio::test]
async fn event_notification_is_mapped() {
    let (_, manager) = new_manager();
    manager.update(&desired_state(&["a"]));

    let notification = EventNotificationList {
        events: Some(vec![
            EventFieldList {
                client_handle: 1,
                event_fields: Some(vec![Variant::from("message"), Variant::from(500u32)]),
            },
            EventFieldList {
                client_handle: 5,
                event_fields: None,
            },
        ]),
    };
    let events = manager.map_event_notification(notification);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].item.as_ref().unwrap().client_handle(), 1);
    assert_eq!(events[0].event_fields.len(), 2);
    assert!(events[1].item.is_none());
    assert!(events[1].event_fields.is_empty());
}

#[tokio::test]
async fn dispose_disposes_every_item() {
    let (_, manager) = new_manager();
    let items = manager.update(&desired_state(&["a", "b"]));
    manager.remove(items[0].client_handle());

    manager.dispose();
    assert_eq!(manager.count(), 0);
    assert!(manager.by_name("b").is_none());
    assert!(items.iter().all(|i| i.is_disposed()));
    assert_eq!(apply(&manager).await, Ok(false));
}
