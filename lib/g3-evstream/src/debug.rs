/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub const EVSTREAM_LOG_TARGET: &str = "g3_evstream";

macro_rules! stream_trace {
    ($($arg:tt)+) => (
        log::trace!(target: $crate::debug::EVSTREAM_LOG_TARGET, $($arg)+)
    )
}

macro_rules! stream_debug {
    ($($arg:tt)+) => (
        log::debug!(target: $crate::debug::EVSTREAM_LOG_TARGET, $($arg)+)
    )
}

pub(crate) use stream_debug;
pub(crate) use stream_trace;
