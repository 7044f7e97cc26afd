// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Desired state of monitored items and configuration of the manager that owns them.

use std::{collections::BTreeMap, time::Duration};

use crate::{
    core::config::Config,
    types::{
        AttributeId, MonitoredItemCreateRequest, MonitoringFilter, MonitoringMode,
        MonitoringParameters, NodeId, ReadValueId, TimestampsToReturn,
    },
};

/// Default number of times a change is retried before it is given up on.
pub const DEFAULT_MAX_CHANGE_RETRIES: u32 = 5;

/// Durations are carried as fractional milliseconds, the unit used on the wire and in
/// configuration files.
pub(crate) mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(to_millis(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = f64::deserialize(deserializer)?;
        Ok(from_millis(ms))
    }

    /// Converts milliseconds to a duration. Negative, NaN and infinite values become zero.
    pub fn from_millis(ms: f64) -> Duration {
        if ms.is_finite() && ms > 0.0 {
            Duration::from_micros((ms * 1000.0).round() as u64)
        } else {
            Duration::ZERO
        }
    }

    pub fn to_millis(value: Duration) -> f64 {
        value.as_secs_f64() * 1000.0
    }
}

/// Describes what a monitored item observes and how. A configuration is replaced wholesale
/// on update and compared structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoredItemConfiguration {
    /// Node to monitor
    pub node_id: NodeId,
    /// Attribute of the node to monitor
    pub attribute_id: AttributeId,
    /// Index range of an array value
    pub index_range: Option<String>,
    /// Data encoding of the value
    pub data_encoding: Option<String>,
    /// Requested sampling interval. Zero asks the server for its fastest rate
    #[serde(with = "duration_millis")]
    pub sampling_interval: Duration,
    /// Requested queue size
    pub queue_size: u32,
    pub discard_oldest: bool,
    pub filter: Option<MonitoringFilter>,
    pub monitoring_mode: MonitoringMode,
    pub timestamps_to_return: TimestampsToReturn,
    /// Grow the queue so that it holds at least a publishing interval worth of samples
    pub auto_set_queue_size: bool,
    /// Display order of the item
    pub order: u32,
}

impl Default for MonitoredItemConfiguration {
    fn default() -> Self {
        Self {
            node_id: NodeId::null(),
            attribute_id: AttributeId::VALUE,
            index_range: None,
            data_encoding: None,
            sampling_interval: Duration::from_secs(1),
            queue_size: 1,
            discard_oldest: true,
            filter: None,
            monitoring_mode: MonitoringMode::Reporting,
            timestamps_to_return: TimestampsToReturn::Both,
            auto_set_queue_size: false,
            order: 0,
        }
    }
}

impl MonitoredItemConfiguration {
    /// Creates a configuration that monitors the value of the supplied node.
    pub fn new<T>(node_id: T) -> Self
    where
        T: Into<NodeId>,
    {
        Self {
            node_id: node_id.into(),
            ..Default::default()
        }
    }

    /// Tests if both configurations address the same thing on the server. Items whose
    /// target differs cannot be modified, they have to be recreated.
    pub fn same_target(&self, other: &MonitoredItemConfiguration) -> bool {
        self.node_id == other.node_id
            && self.attribute_id == other.attribute_id
            && self.index_range == other.index_range
            && self.data_encoding == other.data_encoding
    }

    /// Tests if the configurations only differ in their monitoring mode.
    pub fn differs_only_in_mode(&self, other: &MonitoredItemConfiguration) -> bool {
        self.monitoring_mode != other.monitoring_mode
            && *self
                == MonitoredItemConfiguration {
                    monitoring_mode: self.monitoring_mode,
                    ..other.clone()
                }
    }

    pub fn read_value_id(&self) -> ReadValueId {
        ReadValueId {
            node_id: self.node_id.clone(),
            attribute_id: self.attribute_id,
            index_range: self.index_range.clone(),
            data_encoding: self.data_encoding.clone(),
        }
    }

    pub fn monitoring_parameters(&self, client_handle: u32) -> MonitoringParameters {
        MonitoringParameters {
            client_handle,
            sampling_interval: duration_millis::to_millis(self.sampling_interval),
            filter: self.filter.clone(),
            queue_size: self.queue_size,
            discard_oldest: self.discard_oldest,
        }
    }

    pub fn create_request(&self, client_handle: u32) -> MonitoredItemCreateRequest {
        MonitoredItemCreateRequest {
            item_to_monitor: self.read_value_id(),
            monitoring_mode: self.monitoring_mode,
            requested_parameters: self.monitoring_parameters(client_handle),
        }
    }

    /// Computes the queue size that holds a full publishing interval of samples,
    /// `max(queue_size, ceil(publishing_interval / sampling_interval)) + 1`. The sampling
    /// interval is the one revised by the server when known. Returns `None` when auto sizing
    /// is off or either interval is zero.
    pub fn auto_queue_size(
        &self,
        publishing_interval: Duration,
        current_sampling_interval: Duration,
    ) -> Option<u32> {
        if !self.auto_set_queue_size || publishing_interval.is_zero() {
            return None;
        }
        let sampling_interval = if current_sampling_interval.is_zero() {
            self.sampling_interval
        } else {
            current_sampling_interval
        };
        if sampling_interval.is_zero() {
            return None;
        }
        // Whole microseconds keep the division exact for the usual millisecond intervals
        let publishing_interval = publishing_interval.as_micros().max(1);
        let sampling_interval = sampling_interval.as_micros().max(1);
        let samples = (publishing_interval + sampling_interval - 1) / sampling_interval;
        let samples = u32::try_from(samples).unwrap_or(u32::MAX);
        Some(self.queue_size.max(samples).saturating_add(1))
    }
}

/// Configuration of a monitored item manager, persisted as YAML through [`Config`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoredItemManagerConfig {
    /// A change is given up on once its retry count exceeds this value
    pub max_change_retries: u32,
    /// Named items to monitor
    pub items: BTreeMap<String, MonitoredItemConfiguration>,
}

impl Default for MonitoredItemManagerConfig {
    fn default() -> Self {
        Self {
            max_change_retries: DEFAULT_MAX_CHANGE_RETRIES,
            items: BTreeMap::new(),
        }
    }
}

impl Config for MonitoredItemManagerConfig {
    fn is_valid(&self) -> bool {
        let mut valid = true;
        for (name, item) in &self.items {
            if name.is_empty() {
                error!("Monitored item has an empty name");
                valid = false;
            }
            if item.node_id.is_null() {
                error!("Monitored item {} has a null node id", name);
                valid = false;
            }
        }
        valid
    }
}

impl MonitoredItemManagerConfig {
    pub fn add_item<T>(&mut self, name: T, item: MonitoredItemConfiguration)
    where
        T: Into<String>,
    {
        self.items.insert(name.into(), item);
    }

    /// The configured items as a desired state, in display order, ties broken by name.
    pub fn desired_state(&self) -> Vec<(String, MonitoredItemConfiguration)> {
        let mut state = self
            .items
            .iter()
            .map(|(name, item)| (name.clone(), item.clone()))
            .collect::<Vec<_>>();
        state.sort_by(|a, b| a.1.order.cmp(&b.1.order).then_with(|| a.0.cmp(&b.0)));
        state
    }
}
