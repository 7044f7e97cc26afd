// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Enumerations and filters that parameterize a monitored item.

use std::fmt;

use crate::types::{node_id::NodeId, status_code::StatusCode};

/// Server side enable state of a monitored item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MonitoringMode {
    Disabled = 0,
    Sampling = 1,
    #[default]
    Reporting = 2,
}

impl fmt::Display for MonitoringMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MonitoringMode::Disabled => write!(f, "Disabled"),
            MonitoringMode::Sampling => write!(f, "Sampling"),
            MonitoringMode::Reporting => write!(f, "Reporting"),
        }
    }
}

/// Selects the timestamp attributes a server includes with each notification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimestampsToReturn {
    Source = 0,
    Server = 1,
    #[default]
    Both = 2,
    Neither = 3,
}

/// Node attribute identifiers, as a plain numeric selector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeId(pub u32);

impl AttributeId {
    pub const NODE_ID: AttributeId = AttributeId(1);
    pub const BROWSE_NAME: AttributeId = AttributeId(3);
    pub const DISPLAY_NAME: AttributeId = AttributeId(4);
    pub const EVENT_NOTIFIER: AttributeId = AttributeId(12);
    pub const VALUE: AttributeId = AttributeId(13);
}

impl Default for AttributeId {
    fn default() -> Self {
        AttributeId::VALUE
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Condition that causes a data change notification to be reported.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataChangeTrigger {
    Status = 0,
    #[default]
    StatusValue = 1,
    StatusValueTimestamp = 2,
}

/// Kind of deadband applied by a data change filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeadbandType {
    #[default]
    None = 0,
    Absolute = 1,
    Percent = 2,
}

/// Data change filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataChangeFilter {
    pub trigger: DataChangeTrigger,
    pub deadband_type: DeadbandType,
    pub deadband_value: f64,
}

/// A field selected from an event, given as type definition plus browse path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleAttributeOperand {
    pub type_definition_id: NodeId,
    pub browse_path: Vec<String>,
    pub attribute_id: AttributeId,
    pub index_range: Option<String>,
}

/// Event filter parameters. The where clause is carried through as its element list and is
/// evaluated by the server only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventFilter {
    pub select_clauses: Vec<SimpleAttributeOperand>,
    pub where_clause: Vec<String>,
}

/// Aggregate filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFilter {
    pub aggregate_type: NodeId,
    /// Processing interval in milliseconds
    pub processing_interval: f64,
}

/// Filter applied to a monitored item. On the wire this is an extension object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitoringFilter {
    DataChange(DataChangeFilter),
    Event(EventFilter),
    Aggregate(AggregateFilter),
}

/// Result of an event filter, one status per clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventFilterResult {
    pub select_clause_results: Vec<StatusCode>,
    pub where_clause_results: Vec<StatusCode>,
}

/// Result of an aggregate filter with the server revised values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFilterResult {
    pub revised_processing_interval: f64,
}

/// Filter result returned by create and modify calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitoringFilterResult {
    Event(EventFilterResult),
    Aggregate(AggregateFilterResult),
}
