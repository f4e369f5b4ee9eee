/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::{ListenerId, Signal, SignalBus, SignalKind};

/// Common part of every stream: a signal bus and an idempotent close.
pub trait Stream {
    fn signals(&self) -> &SignalBus;

    /// Close the stream, emits `Close` at most once and drops all listeners
    fn close(&self);

    fn on<F>(&self, kind: SignalKind, f: F) -> ListenerId
    where
        F: Fn(&Signal<'_>) + 'static,
        Self: Sized,
    {
        self.signals().on(kind, f)
    }

    fn once<F>(&self, kind: SignalKind, f: F) -> ListenerId
    where
        F: Fn(&Signal<'_>) + 'static,
        Self: Sized,
    {
        self.signals().once(kind, f)
    }

    #[inline]
    fn remove_listener(&self, id: ListenerId) -> bool {
        self.signals().remove_listener(id)
    }

    /// Whether both values are handles of the same stream
    #[inline]
    fn same_stream(&self, other: &dyn Stream) -> bool {
        self.signals().ptr_eq(other.signals())
    }
}

pub trait ReadableStream: Stream {
    fn is_readable(&self) -> bool;

    /// Stop emitting `Data` until `resume` is called
    fn pause(&self);

    fn resume(&self);
}

pub trait WritableStream: Stream {
    fn is_writable(&self) -> bool;

    /// Queue `data` for writing.
    ///
    /// Returns false if the stream is not writable or the caller should
    /// stop writing until a `Drain` signal arrives.
    fn write(&self, data: &[u8]) -> bool;

    /// Write the optional last chunk and then close once everything has
    /// been flushed.
    fn end(&self, data: Option<&[u8]>);
}

pub trait DuplexStream: ReadableStream + WritableStream {}

impl<T: ReadableStream + WritableStream> DuplexStream for T {}
