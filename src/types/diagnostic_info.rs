// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the definition of `DiagnosticInfo`.

use crate::types::status_code::StatusCode;

/// Diagnostic information returned by a server alongside an operation result.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiagnosticInfo {
    /// A symbolic name for the status code.
    pub symbolic_id: Option<i32>,
    /// A namespace that qualifies the symbolic id.
    pub namespace_uri: Option<i32>,
    /// The locale used for the localized text.
    pub locale: Option<i32>,
    /// A human readable summary of the status code.
    pub localized_text: Option<i32>,
    /// Detailed application specific diagnostic information.
    pub additional_info: Option<String>,
    /// A status code provided by an underlying system.
    pub inner_status_code: Option<StatusCode>,
    /// Diagnostic info associated with the inner status code.
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

impl DiagnosticInfo {
    pub fn null() -> DiagnosticInfo {
        DiagnosticInfo::default()
    }

    /// Creates diagnostics that only carry additional info text
    pub fn with_additional_info<T>(info: T) -> DiagnosticInfo
    where
        T: Into<String>,
    {
        DiagnosticInfo {
            additional_info: Some(info.into()),
            ..Default::default()
        }
    }
}
