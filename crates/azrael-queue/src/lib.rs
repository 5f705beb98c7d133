// SPDX-License-Identifier: Apache-2.0
//! Command Queue for the Azrael simulation control plane.
//!
//! The Gateway pushes [`QueuedCommand`]s as clients issue them; the Physics
//! Worker drains the whole queue once per tick. A command upserts by
//! `(CommandKind, ObjId)`: a second `Modify` queued for the same object
//! before the worker drains replaces the first, it does not queue twice.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

use std::collections::BTreeMap;

use azrael_types::{CommandKind, ObjId, QueuedCommand};
use parking_lot::Mutex;

/// FIFO-ish command buffer with upsert-by-`(CommandKind, ObjId)` semantics.
///
/// Ordering among distinct keys is preserved (a `BTreeMap` ordered by the
/// key, not insertion time, but within one drain cycle the queue is always
/// emptied completely, so only the per-key overwrite behaviour is load
/// bearing).
#[derive(Default)]
pub struct CommandQueue {
    entries: Mutex<BTreeMap<(CommandKind, ObjId), QueuedCommand>>,
}

impl CommandQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Mutex::new(BTreeMap::new()) }
    }

    /// Enqueue a command, overwriting any pending command of the same kind
    /// for the same object.
    pub fn push(&self, command: QueuedCommand) {
        let key = (command.kind(), command.obj_id());
        self.entries.lock().insert(key, command);
    }

    /// Atomically take every pending command, leaving the queue empty.
    pub fn drain_all(&self) -> Vec<QueuedCommand> {
        std::mem::take(&mut *self.entries.lock()).into_values().collect()
    }

    /// Number of distinct `(kind, obj_id)` entries currently pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the queue currently holds no pending commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
