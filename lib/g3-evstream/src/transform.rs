/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::{Signal, SignalBus, SignalKind, Stream, WritableStream, forward_signals};

type TransformFn<W> = dyn Fn(&W, &[u8]) -> bool;

struct TransformerInner<W> {
    bus: SignalBus,
    output: W,
    callback: Option<Box<TransformFn<W>>>,
    closed: Cell<bool>,
}

/// Writable stream that hands every chunk to a callback writing into
/// `output`.
///
/// Without a callback chunks are written to `output` as they are. The
/// transformer closes together with its output, and an output error is
/// reported as its own error before closing.
pub struct TransformerStream<W> {
    inner: Rc<TransformerInner<W>>,
}

impl<W> Clone for TransformerStream<W> {
    fn clone(&self) -> Self {
        TransformerStream {
            inner: self.inner.clone(),
        }
    }
}

impl<W> TransformerStream<W>
where
    W: WritableStream + 'static,
{
    pub fn new(output: W) -> Self {
        TransformerStream::build(output, None)
    }

    /// The callback returns the back pressure result of the write
    pub fn with_callback<F>(output: W, callback: F) -> Self
    where
        F: Fn(&W, &[u8]) -> bool + 'static,
    {
        TransformerStream::build(output, Some(Box::new(callback)))
    }

    fn build(output: W, callback: Option<Box<TransformFn<W>>>) -> Self {
        let stream = TransformerStream {
            inner: Rc::new(TransformerInner {
                bus: SignalBus::new(),
                output,
                callback,
                closed: Cell::new(false),
            }),
        };

        let inner = &stream.inner;
        if !inner.output.is_writable() {
            stream.close();
            return stream;
        }

        let output_bus = inner.output.signals();
        forward_signals(output_bus, &inner.bus, &[SignalKind::Drain]);

        let weak = Rc::downgrade(inner);
        output_bus.on(SignalKind::Error, move |signal| {
            if let Signal::Error(e) = signal {
                if let Some(inner) = weak.upgrade() {
                    inner.bus.emit(&Signal::Error(*e));
                    TransformerStream { inner }.close();
                }
            }
        });

        let weak: Weak<TransformerInner<W>> = Rc::downgrade(inner);
        output_bus.on(SignalKind::Close, move |_| {
            if let Some(inner) = weak.upgrade() {
                TransformerStream { inner }.close();
            }
        });

        stream
    }

    #[inline]
    pub fn output(&self) -> &W {
        &self.inner.output
    }
}

impl<W> Stream for TransformerStream<W>
where
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
        self.inner.output.close();

        self.inner.bus.emit(&Signal::Close);
        self.inner.bus.remove_all_listeners();
    }
}

impl<W> WritableStream for TransformerStream<W>
where
    W: WritableStream + 'static,
{
    fn is_writable(&self) -> bool {
        !self.inner.closed.get()
    }

    fn write(&self, data: &[u8]) -> bool {
        if self.inner.closed.get() {
            return false;
        }
        match &self.inner.callback {
            Some(callback) => callback(&self.inner.output, data),
            None => self.inner.output.write(data),
        }
    }

    fn end(&self, data: Option<&[u8]>) {
        if self.inner.closed.get() {
            return;
        }
        if let Some(data) = data {
            self.write(data);
        }
        self.inner.output.end(None);
    }
}

impl<W> fmt::Debug for TransformerStream<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerStream")
            .field("callback", &self.inner.callback.is_some())
            .field("closed", &self.inner.closed.get())
            .finish_non_exhaustive()
    }
}
