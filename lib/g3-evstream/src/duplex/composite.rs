/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::{
    ReadableStream, Signal, SignalBus, SignalKind, Stream, WritableStream, forward_signals,
};

struct CompositeInner<R, W> {
    bus: SignalBus,
    readable: R,
    writable: W,
    closed: Cell<bool>,
}

/// A duplex stream made of an independent readable and writable half.
///
/// `Data`, `End` and `Error` of the readable half and `Drain`, `Error` and
/// `Pipe` of the writable half are re-emitted. Closing either half closes
/// the whole stream.
pub struct CompositeStream<R, W> {
    inner: Rc<CompositeInner<R, W>>,
}

impl<R, W> Clone for CompositeStream<R, W> {
    fn clone(&self) -> Self {
        CompositeStream {
            inner: self.inner.clone(),
        }
    }
}

impl<R, W> CompositeStream<R, W>
where
    R: ReadableStream + 'static,
    W: WritableStream + 'static,
{
    pub fn new(readable: R, writable: W) -> Self {
        let stream = CompositeStream {
            inner: Rc::new(CompositeInner {
                bus: SignalBus::new(),
                readable,
                writable,
                closed: Cell::new(false),
            }),
        };

        let inner = &stream.inner;
        if !inner.readable.is_readable() || !inner.writable.is_writable() {
            stream.close();
            return stream;
        }

        forward_signals(
            inner.readable.signals(),
            &inner.bus,
            &[SignalKind::Data, SignalKind::End, SignalKind::Error],
        );
        forward_signals(
            inner.writable.signals(),
            &inner.bus,
            &[SignalKind::Drain, SignalKind::Error, SignalKind::Pipe],
        );

        for bus in [inner.readable.signals(), inner.writable.signals()] {
            let weak = Rc::downgrade(inner);
            bus.on(SignalKind::Close, move |_| {
                if let Some(inner) = weak.upgrade() {
                    CompositeStream { inner }.close();
                }
            });
        }

        stream
    }

    #[inline]
    pub fn readable(&self) -> &R {
        &self.inner.readable
    }

    #[inline]
    pub fn writable(&self) -> &W {
        &self.inner.writable
    }
}

impl<R, W> Stream for CompositeStream<R, W>
where
    R: ReadableStream + 'static,
    W: WritableStream + 'static,
{
    #[inline]
    fn signals(&self) -> &SignalBus {
        &self.inner.bus
    }

    fn close(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        self.inner.readable.close();
        self.inner.writable.close();

        self.inner.bus.emit(&Signal::Close);
        self.inner.bus.remove_all_listeners();
    }
}

impl<R, W> ReadableStream for CompositeStream<R, W>
where
    R: ReadableStream + 'static,
    W: WritableStream + 'static,
{
    fn is_readable(&self) -> bool {
        self.inner.readable.is_readable()
    }

    fn pause(&self) {
        self.inner.readable.pause();
    }

    /// Resuming is refused once the writable half is gone
    fn resume(&self) {
        if !self.inner.writable.is_writable() {
            return;
        }
        self.inner.readable.resume();
    }
}

impl<R, W> WritableStream for CompositeStream<R, W>
where
    R: ReadableStream + 'static,
    W: WritableStream + 'static,
{
    fn is_writable(&self) -> bool {
        self.inner.writable.is_writable()
    }

    fn write(&self, data: &[u8]) -> bool {
        self.inner.writable.write(data)
    }

    fn end(&self, data: Option<&[u8]>) {
        self.inner.readable.pause();
        self.inner.writable.end(data);
    }
}

impl<R, W> fmt::Debug for CompositeStream<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeStream")
            .field("closed", &self.inner.closed.get())
            .finish_non_exhaustive()
    }
}
