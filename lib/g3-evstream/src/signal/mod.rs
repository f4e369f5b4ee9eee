/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use crate::{ReadableStream, StreamError};

mod bus;
pub use bus::{ListenerId, SignalBus, WeakSignalBus};

mod forward;
pub use forward::forward_signals;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SignalKind {
    /// A chunk of bytes has been read
    Data,
    /// The readable side reached a successful end of stream
    End,
    /// A fatal error occurred, usually followed by `Close`
    Error,
    /// The stream has been closed, emitted at most once
    Close,
    /// A previously full write buffer can accept more data
    Drain,
    /// A readable source has been piped into this stream
    Pipe,
}

impl SignalKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Data => "data",
            SignalKind::End => "end",
            SignalKind::Error => "error",
            SignalKind::Close => "close",
            SignalKind::Drain => "drain",
            SignalKind::Pipe => "pipe",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signal together with its payload.
///
/// Payloads are borrowed for the duration of the emit call, listeners
/// that need to keep them must copy.
#[derive(Clone, Copy)]
pub enum Signal<'a> {
    Data(&'a [u8]),
    End,
    Error(&'a StreamError),
    Close,
    Drain,
    Pipe(&'a dyn ReadableStream),
}

impl Signal<'_> {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Data(_) => SignalKind::Data,
            Signal::End => SignalKind::End,
            Signal::Error(_) => SignalKind::Error,
            Signal::Close => SignalKind::Close,
            Signal::Drain => SignalKind::Drain,
            Signal::Pipe(_) => SignalKind::Pipe,
        }
    }
}

impl fmt::Debug for Signal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Data(data) => f.debug_tuple("Data").field(&data.len()).finish(),
            Signal::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Signal::Pipe(source) => f
                .debug_tuple("Pipe")
                .field(&source.is_readable())
                .finish(),
            other => f.write_str(other.kind().as_str()),
        }
    }
}
