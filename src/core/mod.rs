// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Functionality shared by the client side modules, the handle factory and configuration
//! persistence.

pub mod config;
pub mod handle;

pub mod prelude {
    pub use super::config::*;
    pub use super::handle::*;
}

#[cfg(test)]
mod tests;
