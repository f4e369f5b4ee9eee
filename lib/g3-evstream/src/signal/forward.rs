/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{ListenerId, SignalBus, SignalKind};

/// Re-emit the given kinds of signals from `source` on `target`.
///
/// Only a weak reference to `target` is kept, so forwarding never keeps
/// the target stream alive.
pub fn forward_signals(
    source: &SignalBus,
    target: &SignalBus,
    kinds: &[SignalKind],
) -> Vec<ListenerId> {
    kinds
        .iter()
        .map(|kind| {
            let target = target.downgrade();
            source.on(*kind, move |signal| {
                if let Some(target) = target.upgrade() {
                    target.emit(signal);
                }
            })
        })
        .collect()
}
