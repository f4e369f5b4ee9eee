/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::debug::{stream_debug, stream_trace};
use crate::error::is_transient;
use crate::{
    ReadSourceConfig, ReadableStream, ReadinessRegistrar, Resource, Signal, SignalBus, Stream,
    StreamError,
};

struct ReadState {
    readable: bool,
    closed: bool,
    listening: bool,
}

struct ReadableSourceInner {
    bus: SignalBus,
    resource: Rc<dyn Resource>,
    registrar: Rc<dyn ReadinessRegistrar>,
    chunk_size: Option<usize>,
    state: RefCell<ReadState>,
}

/// Readable stream over a non-blocking resource.
///
/// The source registers read readiness as soon as it is created. Every
/// readiness callback pulls at most `chunk_size` bytes and emits them as
/// one `Data` signal. An empty read with the end of stream flag set emits
/// `End` and closes the source.
#[derive(Clone)]
pub struct ReadableSource {
    inner: Rc<ReadableSourceInner>,
}

impl ReadableSource {
    pub fn new(
        resource: Rc<dyn Resource>,
        registrar: Rc<dyn ReadinessRegistrar>,
        config: ReadSourceConfig,
    ) -> Result<Self, StreamError> {
        if !resource.is_open() {
            return Err(StreamError::InvalidResource("resource is not open"));
        }
        if !resource.mode().can_read() {
            return Err(StreamError::InvalidResource(
                "resource is not opened in read mode",
            ));
        }

        let source = ReadableSource {
            inner: Rc::new(ReadableSourceInner {
                bus: SignalBus::new(),
                resource,
                registrar,
                chunk_size: config.chunk_size(),
                state: RefCell::new(ReadState {
                    readable: true,
                    closed: false,
                    listening: false,
                }),
            }),
        };
        source.resume();
        Ok(source)
    }

    #[inline]
    pub fn resource(&self) -> &Rc<dyn Resource> {
        &self.inner.resource
    }

    #[inline]
    pub fn chunk_size(&self) -> Option<usize> {
        self.inner.chunk_size
    }

    /// Whether read readiness is registered
    pub fn is_listening(&self) -> bool {
        self.inner.state.borrow().listening
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.borrow().closed
    }

    /// Pull the available data from the resource.
    ///
    /// This is the read readiness callback.
    pub fn handle_data(&self) {
        if self.inner.state.borrow().closed {
            return;
        }

        match self.inner.resource.read_available(self.inner.chunk_size) {
            Ok(chunk) => {
                if !chunk.data.is_empty() {
                    self.inner.bus.emit(&Signal::Data(&chunk.data));
                } else if chunk.eof {
                    stream_trace!("resource {} reached end of stream", self.inner.resource.id());
                    self.inner.bus.emit(&Signal::End);
                    self.close();
                }
            }
            Err(e) if is_transient(&e) => {}
            Err(e) => {
                stream_debug!("read from resource {} failed: {e}", self.inner.resource.id());
                let e = StreamError::ReadFailed(e);
                self.inner.bus.emit(&Signal::Error(&e));
                self.close();
            }
        }
    }
}

impl Stream for ReadableSource {
    #[inline]
    fn signals(&self) -> &SignalBus {
        &self.inner.bus
    }

    fn close(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.closed {
                return;
            }
            state.closed = true;
            state.readable = false;
        }
        self.pause();

        self.inner.bus.emit(&Signal::Close);
        self.inner.bus.remove_all_listeners();
        self.inner.resource.close();
    }
}

impl ReadableStream for ReadableSource {
    fn is_readable(&self) -> bool {
        self.inner.state.borrow().readable
    }

    fn pause(&self) {
        let unregister = std::mem::replace(&mut self.inner.state.borrow_mut().listening, false);
        if unregister {
            let id = self.inner.resource.id();
            stream_trace!("unregister read readiness for resource {id}");
            self.inner.registrar.unregister_read(id);
        }
    }

    fn resume(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.listening || !state.readable {
                return;
            }
            state.listening = true;
        }

        let id = self.inner.resource.id();
        let weak = Rc::downgrade(&self.inner);
        stream_trace!("register read readiness for resource {id}");
        self.inner.registrar.register_read(
            id,
            Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    ReadableSource { inner }.handle_data();
                }
            }),
        );
    }
}

impl fmt::Debug for ReadableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ReadableSource")
            .field("resource", &self.inner.resource.id())
            .field("chunk_size", &self.inner.chunk_size)
            .field("readable", &state.readable)
            .field("listening", &state.listening)
            .field("closed", &state.closed)
            .finish()
    }
}
