// SPDX-License-Identifier: Apache-2.0
//! Shared process services for Azrael binaries (config persistence).
//! Keeps the Gateway and websocket bridge's entry points thin.

pub mod config;
