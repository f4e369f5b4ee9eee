/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::debug::stream_debug;
use crate::{ReadableStream, Signal, SignalBus, Stream, StreamError, WritableStream};

type FilterFn = dyn Fn(&[u8]) -> anyhow::Result<Vec<u8>>;

struct ThroughInner {
    bus: SignalBus,
    filter: Option<Box<FilterFn>>,
    readable: Cell<bool>,
    writable: Cell<bool>,
    paused: Cell<bool>,
    drain_owed: Cell<bool>,
    closed: Cell<bool>,
}

/// Duplex stream that re-emits everything written to it as `Data`.
///
/// Writes return false while paused, the next `resume` then emits one
/// `Drain`. A failing filter turns into an `Error` signal and closes the
/// stream, the chunk is dropped.
#[derive(Clone)]
pub struct ThroughStream {
    inner: Rc<ThroughInner>,
}

impl Default for ThroughStream {
    fn default() -> Self {
        ThroughStream::build(None)
    }
}

impl ThroughStream {
    pub fn new() -> Self {
        ThroughStream::default()
    }

    pub fn with_filter<F>(filter: F) -> Self
    where
        F: Fn(&[u8]) -> anyhow::Result<Vec<u8>> + 'static,
    {
        ThroughStream::build(Some(Box::new(filter)))
    }

    fn build(filter: Option<Box<FilterFn>>) -> Self {
        ThroughStream {
            inner: Rc::new(ThroughInner {
                bus: SignalBus::new(),
                filter,
                readable: Cell::new(true),
                writable: Cell::new(true),
                paused: Cell::new(false),
                drain_owed: Cell::new(false),
                closed: Cell::new(false),
            }),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.get()
    }

    /// Emit `data` as read data, returns false if the stream got closed
    fn pass(&self, data: &[u8]) -> bool {
        match &self.inner.filter {
            Some(filter) => match filter(data) {
                Ok(filtered) => {
                    self.inner.bus.emit(&Signal::Data(&filtered));
                }
                Err(e) => {
                    stream_debug!("through stream filter failed: {e:?}");
                    let e = StreamError::FilterFailed(e);
                    self.inner.bus.emit(&Signal::Error(&e));
                    self.close();
                    return false;
                }
            },
            None => {
                self.inner.bus.emit(&Signal::Data(data));
            }
        }
        !self.inner.closed.get()
    }
}

impl Stream for ThroughStream {
    #[inline]
    fn signals(&self) -> &SignalBus {
        &self.inner.bus
    }

    fn close(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        self.inner.readable.set(false);
        self.inner.writable.set(false);
        self.inner.drain_owed.set(false);

        self.inner.bus.emit(&Signal::Close);
        self.inner.bus.remove_all_listeners();
    }
}

impl ReadableStream for ThroughStream {
    fn is_readable(&self) -> bool {
        self.inner.readable.get()
    }

    fn pause(&self) {
        self.inner.paused.set(true);
    }

    fn resume(&self) {
        self.inner.paused.set(false);
        if self.inner.drain_owed.replace(false) {
            self.inner.bus.emit(&Signal::Drain);
        }
    }
}

impl WritableStream for ThroughStream {
    fn is_writable(&self) -> bool {
        self.inner.writable.get()
    }

    fn write(&self, data: &[u8]) -> bool {
        if !self.inner.writable.get() {
            return false;
        }
        if !self.pass(data) {
            return false;
        }

        if self.inner.paused.get() {
            self.inner.drain_owed.set(true);
            return false;
        }
        self.inner.writable.get()
    }

    fn end(&self, data: Option<&[u8]>) {
        if !self.inner.writable.get() {
            return;
        }
        if let Some(data) = data {
            if !self.pass(data) {
                return;
            }
        }
        self.inner.writable.set(false);

        self.inner.bus.emit(&Signal::End);
        self.close();
    }
}

impl fmt::Debug for ThroughStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThroughStream")
            .field("filter", &self.inner.filter.is_some())
            .field("readable", &self.inner.readable.get())
            .field("writable", &self.inner.writable.get())
            .field("paused", &self.inner.paused.get())
            .finish()
    }
}
