/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bytes::{Buf, BytesMut};

use crate::debug::{stream_debug, stream_trace};
use crate::error::is_transient;
use crate::{
    ReadinessRegistrar, Resource, Signal, SignalBus, Stream, StreamError, WritableStream,
    WriteBufferConfig,
};

struct WriteState {
    pending: BytesMut,
    writable: bool,
    closed: bool,
    listening: bool,
}

struct WriteBufferInner {
    bus: SignalBus,
    resource: Rc<dyn Resource>,
    registrar: Rc<dyn ReadinessRegistrar>,
    soft_limit: usize,
    state: RefCell<WriteState>,
}

/// Buffered writer over a non-blocking resource.
///
/// Data passed to `write` is queued and flushed whenever the registrar
/// reports the resource writable. Write readiness is only registered
/// while there is pending data.
///
/// Signals: `Drain` when the pending size goes from at or above the soft
/// limit to below it, `Error` on a permanent write failure, `Close` once.
#[derive(Clone)]
pub struct WriteBuffer {
    inner: Rc<WriteBufferInner>,
}

impl WriteBuffer {
    pub fn new(
        resource: Rc<dyn Resource>,
        registrar: Rc<dyn ReadinessRegistrar>,
        config: WriteBufferConfig,
    ) -> Result<Self, StreamError> {
        if !resource.is_open() {
            return Err(StreamError::InvalidResource("resource is not open"));
        }
        if !resource.mode().can_write() {
            return Err(StreamError::InvalidResource(
                "resource is not opened in write mode",
            ));
        }

        Ok(WriteBuffer {
            inner: Rc::new(WriteBufferInner {
                bus: SignalBus::new(),
                resource,
                registrar,
                soft_limit: config.soft_limit(),
                state: RefCell::new(WriteState {
                    pending: BytesMut::new(),
                    writable: true,
                    closed: false,
                    listening: false,
                }),
            }),
        })
    }

    #[inline]
    pub fn resource(&self) -> &Rc<dyn Resource> {
        &self.inner.resource
    }

    #[inline]
    pub fn soft_limit(&self) -> usize {
        self.inner.soft_limit
    }

    pub fn pending_len(&self) -> usize {
        self.inner.state.borrow().pending.len()
    }

    /// Whether write readiness is registered
    pub fn is_listening(&self) -> bool {
        self.inner.state.borrow().listening
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.borrow().closed
    }

    fn register_write(&self) {
        let id = self.inner.resource.id();
        let weak = Rc::downgrade(&self.inner);
        stream_trace!("register write readiness for resource {id}");
        self.inner.registrar.register_write(
            id,
            Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    WriteBuffer { inner }.handle_write();
                }
            }),
        );
    }

    fn unregister_write(&self) {
        let id = self.inner.resource.id();
        stream_trace!("unregister write readiness for resource {id}");
        self.inner.registrar.unregister_write(id);
    }

    /// Flush as much pending data as the resource accepts.
    ///
    /// This is the write readiness callback, owners driving their own
    /// readiness may also call it directly.
    pub fn handle_write(&self) {
        let result = {
            let state = self.inner.state.borrow();
            if state.closed || state.pending.is_empty() {
                return;
            }
            self.inner.resource.write_some(&state.pending)
        };

        match result {
            Ok(0) => self.fail(StreamError::WriteToClosed),
            Ok(nw) => self.advance(nw),
            Err(e) if is_transient(&e) => {
                stream_trace!(
                    "resource {} not writable for now: {e}",
                    self.inner.resource.id()
                );
            }
            Err(e) => self.fail(StreamError::WriteFailed(e)),
        }
    }

    fn fail(&self, e: StreamError) {
        stream_debug!("write to resource {} failed: {e}", self.inner.resource.id());
        self.inner.bus.emit(&Signal::Error(&e));
        self.close();
    }

    fn advance(&self, nw: usize) {
        let soft_limit = self.inner.soft_limit;
        let drained = {
            let mut state = self.inner.state.borrow_mut();
            let exceeded = state.pending.len() >= soft_limit;
            let nw = nw.min(state.pending.len());
            state.pending.advance(nw);
            exceeded && state.pending.len() < soft_limit
        };
        if drained {
            self.inner.bus.emit(&Signal::Drain);
        }

        // the drain listeners may have written more data or closed us
        let (unregister, close) = {
            let mut state = self.inner.state.borrow_mut();
            if state.closed || !state.pending.is_empty() {
                return;
            }
            let unregister = std::mem::replace(&mut state.listening, false);
            (unregister, !state.writable)
        };
        if unregister {
            self.unregister_write();
        }
        if close {
            self.close();
        }
    }
}

impl Stream for WriteBuffer {
    #[inline]
    fn signals(&self) -> &SignalBus {
        &self.inner.bus
    }

    fn close(&self) {
        let unregister = {
            let mut state = self.inner.state.borrow_mut();
            if state.closed {
                return;
            }
            state.closed = true;
            state.writable = false;
            state.pending.clear();
            std::mem::replace(&mut state.listening, false)
        };
        if unregister {
            self.unregister_write();
        }
        self.inner.resource.close();

        self.inner.bus.emit(&Signal::Close);
        self.inner.bus.remove_all_listeners();
    }
}

impl WritableStream for WriteBuffer {
    fn is_writable(&self) -> bool {
        self.inner.state.borrow().writable
    }

    fn write(&self, data: &[u8]) -> bool {
        let (register, below_limit) = {
            let mut state = self.inner.state.borrow_mut();
            if !state.writable {
                return false;
            }
            state.pending.extend_from_slice(data);
            let register = !state.listening && !state.pending.is_empty();
            if register {
                state.listening = true;
            }
            (register, state.pending.len() < self.inner.soft_limit)
        };
        if register {
            self.register_write();
        }
        below_limit
    }

    fn end(&self, data: Option<&[u8]>) {
        if let Some(data) = data {
            self.write(data);
        }

        let empty = {
            let mut state = self.inner.state.borrow_mut();
            state.writable = false;
            state.pending.is_empty()
        };
        // close now if nothing is pending, or wait for the flush
        if empty {
            self.close();
        }
    }
}

impl fmt::Debug for WriteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("WriteBuffer")
            .field("resource", &self.inner.resource.id())
            .field("pending", &state.pending.len())
            .field("soft_limit", &self.inner.soft_limit)
            .field("writable", &state.writable)
            .field("listening", &state.listening)
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use crate::testing::{count_signals, record_errors};
    use crate::{ManualRegistrar, MemoryResource, ResourceMode, SignalKind};

    fn setup(soft_limit: usize) -> (Rc<MemoryResource>, Rc<ManualRegistrar>, WriteBuffer) {
        let resource = Rc::new(MemoryResource::new(ResourceMode::WriteOnly));
        let registrar = ManualRegistrar::new();
        let buffer = WriteBuffer::new(
            resource.clone(),
            registrar.clone(),
            WriteBufferConfig::with_soft_limit(soft_limit),
        )
        .unwrap();
        (resource, registrar, buffer)
    }

    #[test]
    fn reject_read_only() {
        let resource = Rc::new(MemoryResource::new(ResourceMode::ReadOnly));
        let r = WriteBuffer::new(resource, ManualRegistrar::new(), Default::default());
        assert!(matches!(r, Err(StreamError::InvalidResource(_))));
    }

    #[test]
    fn reject_closed() {
        let resource = Rc::new(MemoryResource::new(ResourceMode::ReadWrite));
        resource.close();
        let r = WriteBuffer::new(resource, ManualRegistrar::new(), Default::default());
        assert!(matches!(r, Err(StreamError::InvalidResource(_))));
    }

    #[test]
    fn write() {
        let (resource, registrar, buffer) = setup(1024);
        let id = resource.id();

        assert!(buffer.write(b"foobar\n"));
        assert!(buffer.is_listening());
        assert!(registrar.is_write_registered(id));
        assert!(resource.written().is_empty());

        assert!(registrar.fire_write(id));
        assert_eq!(resource.written().as_ref(), b"foobar\n");
        assert_eq!(buffer.pending_len(), 0);
        assert!(!registrar.is_write_registered(id));
        assert!(buffer.is_writable());
    }

    #[test]
    fn register_once() {
        let (_resource, registrar, buffer) = setup(1024);
        buffer.write(b"foo");
        buffer.write(b"bar");
        assert_eq!(registrar.stats().register_write, 1);
    }

    #[test]
    fn empty_write() {
        let (resource, registrar, buffer) = setup(1024);
        assert!(buffer.write(b""));
        assert!(!buffer.is_listening());
        assert!(!registrar.is_write_registered(resource.id()));
        assert_eq!(registrar.stats().register_write, 0);
    }

    #[test]
    fn write_full() {
        let (_resource, _registrar, buffer) = setup(4);
        assert!(buffer.write(b"foo"));
        assert!(!buffer.write(b"bar\n"));
        assert_eq!(buffer.pending_len(), 7);
    }

    #[test]
    fn write_exactly_full() {
        let (_resource, _registrar, buffer) = setup(3);
        assert!(!buffer.write(b"foo"));
    }

    #[test]
    fn drain_after_full() {
        let (resource, registrar, buffer) = setup(4);
        let drain = count_signals(buffer.signals(), SignalKind::Drain);

        assert!(buffer.write(b"foo"));
        assert!(!buffer.write(b"bar\n"));
        registrar.fire_write(resource.id());

        assert_eq!(drain.get(), 1);
        assert_eq!(resource.written().as_ref(), b"foobar\n");
        assert!(buffer.write(b"x"));
    }

    #[test]
    fn no_drain_if_not_full() {
        let (resource, registrar, buffer) = setup(4);
        let drain = count_signals(buffer.signals(), SignalKind::Drain);

        assert!(buffer.write(b"foo"));
        registrar.fire_write(resource.id());
        assert_eq!(drain.get(), 0);
    }

    #[test]
    fn drain_once_per_crossing() {
        let (resource, registrar, buffer) = setup(4);
        let drain = count_signals(buffer.signals(), SignalKind::Drain);
        resource.set_write_capacity(Some(2));

        assert!(!buffer.write(b"foobar"));
        registrar.fire_write(resource.id());
        // 6 -> 4, still at the limit
        assert_eq!(drain.get(), 0);
        assert!(!buffer.write(b""));
        resource.add_write_capacity(2);
        registrar.fire_write(resource.id());
        // 4 -> 2
        assert_eq!(drain.get(), 1);
        assert!(buffer.write(b""));
        resource.add_write_capacity(2);
        registrar.fire_write(resource.id());
        assert_eq!(drain.get(), 1);
        assert_eq!(resource.written().as_ref(), b"foobar");
    }

    #[test]
    fn write_in_drain() {
        let (resource, registrar, buffer) = setup(2);
        let b = buffer.clone();
        buffer.once(SignalKind::Drain, move |_| {
            b.write(b"bar");
        });

        assert!(!buffer.write(b"foo"));
        registrar.fire_write(resource.id());
        assert_eq!(resource.written().as_ref(), b"foo");
        assert!(registrar.is_write_registered(resource.id()));

        registrar.fire_write(resource.id());
        assert_eq!(resource.written().as_ref(), b"foobar");
        assert!(!registrar.is_write_registered(resource.id()));
    }

    #[test]
    fn partial_write() {
        let (resource, registrar, buffer) = setup(1024);
        let errors = record_errors(buffer.signals());
        resource.set_write_capacity(Some(4));

        buffer.write(b"foobar");
        registrar.fire_write(resource.id());
        assert_eq!(buffer.pending_len(), 2);
        assert!(registrar.is_write_registered(resource.id()));

        // no capacity left, the resource would block
        registrar.fire_write(resource.id());
        assert_eq!(buffer.pending_len(), 2);
        assert!(errors.borrow().is_empty());
        assert!(!buffer.is_closed());

        resource.add_write_capacity(100);
        registrar.fire_write(resource.id());
        assert_eq!(resource.written().as_ref(), b"foobar");
        assert!(!registrar.is_write_registered(resource.id()));
    }

    #[test]
    fn ordered_flush() {
        let (resource, registrar, buffer) = setup(8);
        resource.set_write_capacity(Some(3));

        let chunks: [&[u8]; 4] = [b"hello, ", b"I am ", b"some ", b"random data"];
        for chunk in chunks {
            buffer.write(chunk);
            registrar.fire_write(resource.id());
            resource.add_write_capacity(3);
        }
        assert_eq!(buffer.pending_len(), 16);
        buffer.end(None);
        resource.set_write_capacity(None);
        assert_eq!(registrar.run_until_idle(100), 1);
        assert_eq!(resource.written().as_ref(), b"hello, I am some random data");
        assert!(buffer.is_closed());
    }

    #[test]
    fn permanent_error() {
        let (resource, registrar, buffer) = setup(1024);
        let errors = record_errors(buffer.signals());
        let close = count_signals(buffer.signals(), SignalKind::Close);
        resource.fail_writes(Some(io::ErrorKind::BrokenPipe));

        buffer.write(b"foo");
        registrar.fire_write(resource.id());

        assert_eq!(
            *errors.borrow(),
            vec!["unable to write to stream: broken pipe".to_string()]
        );
        assert_eq!(close.get(), 1);
        assert!(!registrar.is_write_registered(resource.id()));
        assert!(!buffer.is_writable());
    }

    #[test]
    fn peer_closed() {
        let (resource, registrar, buffer) = setup(1024);
        let errors = record_errors(buffer.signals());
        resource.close_peer();

        buffer.write(b"foo");
        registrar.fire_write(resource.id());
        assert_eq!(
            *errors.borrow(),
            vec!["tried to write to closed stream".to_string()]
        );
        assert!(buffer.is_closed());
    }

    #[test]
    fn end_empty_closes_immediately() {
        let (resource, registrar, buffer) = setup(1024);
        let close = count_signals(buffer.signals(), SignalKind::Close);

        buffer.end(None);
        assert_eq!(close.get(), 1);
        assert!(!buffer.is_writable());
        assert!(!resource.is_open());
        assert_eq!(registrar.stats().register_write, 0);
    }

    #[test]
    fn end_with_data_waits_for_flush() {
        let (resource, registrar, buffer) = setup(1024);
        let close = count_signals(buffer.signals(), SignalKind::Close);

        buffer.end(Some(b"foo"));
        assert!(!buffer.is_writable());
        assert_eq!(close.get(), 0);
        assert!(!buffer.write(b"bar"));

        registrar.fire_write(resource.id());
        assert_eq!(resource.written().as_ref(), b"foo");
        assert_eq!(close.get(), 1);
        assert!(!resource.is_open());
    }

    #[test]
    fn end_while_full() {
        let (resource, registrar, buffer) = setup(2);
        let close = count_signals(buffer.signals(), SignalKind::Close);
        resource.set_write_capacity(Some(2));

        buffer.write(b"foo");
        buffer.end(Some(b"bar"));
        registrar.fire_write(resource.id());
        assert_eq!(close.get(), 0);

        resource.add_write_capacity(10);
        registrar.fire_write(resource.id());
        assert_eq!(close.get(), 1);
        assert_eq!(resource.written().as_ref(), b"foobar");
    }

    #[test]
    fn close() {
        let (resource, registrar, buffer) = setup(1024);
        let close = count_signals(buffer.signals(), SignalKind::Close);

        buffer.write(b"foo");
        buffer.close();
        assert_eq!(close.get(), 1);
        assert_eq!(buffer.pending_len(), 0);
        assert!(!registrar.is_write_registered(resource.id()));
        assert_eq!(registrar.stats().unregister_write, 1);
        assert!(!buffer.signals().has_listeners(SignalKind::Close));
    }

    #[test]
    fn close_without_write() {
        let (_resource, registrar, buffer) = setup(1024);
        buffer.close();
        assert_eq!(registrar.stats().unregister_write, 0);
    }

    #[test]
    fn double_close() {
        let (_resource, _registrar, buffer) = setup(1024);
        let close = count_signals(buffer.signals(), SignalKind::Close);
        buffer.close();
        assert_eq!(close.get(), 1);

        let again = count_signals(buffer.signals(), SignalKind::Close);
        buffer.close();
        assert_eq!(again.get(), 0);
    }

    #[test]
    fn write_after_close() {
        let (resource, registrar, buffer) = setup(1024);
        buffer.close();
        assert!(!buffer.write(b"foo"));
        assert!(!registrar.is_write_registered(resource.id()));
        assert!(resource.written().is_empty());
    }
}
