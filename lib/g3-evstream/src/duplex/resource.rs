/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::{
    ReadableSource, ReadableStream, ReadinessRegistrar, Resource, ResourceMode, Signal, SignalBus,
    SignalKind, Stream, StreamConfig, StreamError, WritableStream, WriteBuffer, forward_signals,
};

struct DuplexInner<W> {
    bus: SignalBus,
    source: ReadableSource,
    buffer: W,
    readable: Cell<bool>,
    writable: Cell<bool>,
    closed: Cell<bool>,
}

impl<W> DuplexInner<W>
where
    W: WritableStream + 'static,
{
    fn close_on(weak: Weak<Self>) -> impl Fn(&Signal<'_>) + 'static {
        move |_| {
            if let Some(inner) = weak.upgrade() {
                DuplexResourceStream { inner }.close();
            }
        }
    }
}

/// Readable and writable stream over a single resource.
///
/// Reads go through an internal [`ReadableSource`], writes through a
/// [`WriteBuffer`] or any other writable given to
/// [`DuplexResourceStream::with_buffer`]. Ending the stream stops reading
/// at once, and the stream is closed when the buffer closes after the
/// final flush.
pub struct DuplexResourceStream<W = WriteBuffer> {
    inner: Rc<DuplexInner<W>>,
}

impl<W> Clone for DuplexResourceStream<W> {
    fn clone(&self) -> Self {
        DuplexResourceStream {
            inner: self.inner.clone(),
        }
    }
}

fn check_resource(resource: &dyn Resource) -> Result<(), StreamError> {
    if !resource.is_open() {
        return Err(StreamError::InvalidResource("resource is not open"));
    }
    if resource.mode() != ResourceMode::ReadWrite {
        return Err(StreamError::InvalidResource(
            "resource is not opened in read and write mode",
        ));
    }
    Ok(())
}

impl DuplexResourceStream<WriteBuffer> {
    pub fn new(
        resource: Rc<dyn Resource>,
        registrar: Rc<dyn ReadinessRegistrar>,
        config: StreamConfig,
    ) -> Result<Self, StreamError> {
        check_resource(resource.as_ref())?;
        let buffer = WriteBuffer::new(resource.clone(), registrar.clone(), config.write)?;
        DuplexResourceStream::with_buffer(resource, registrar, config, buffer)
    }
}

impl<W> DuplexResourceStream<W>
where
    W: WritableStream + 'static,
{
    /// Use `buffer` for the write side, the write part of `config` is
    /// ignored
    pub fn with_buffer(
        resource: Rc<dyn Resource>,
        registrar: Rc<dyn ReadinessRegistrar>,
        config: StreamConfig,
        buffer: W,
    ) -> Result<Self, StreamError> {
        check_resource(resource.as_ref())?;
        let source = ReadableSource::new(resource, registrar, config.read)?;

        let inner = Rc::new(DuplexInner {
            bus: SignalBus::new(),
            source,
            buffer,
            readable: Cell::new(true),
            writable: Cell::new(true),
            closed: Cell::new(false),
        });

        forward_signals(
            inner.source.signals(),
            &inner.bus,
            &[SignalKind::Data, SignalKind::End, SignalKind::Error],
        );
        forward_signals(
            inner.buffer.signals(),
            &inner.bus,
            &[SignalKind::Drain, SignalKind::Error],
        );
        inner.source.signals().on(
            SignalKind::Close,
            DuplexInner::close_on(Rc::downgrade(&inner)),
        );
        inner.buffer.signals().on(
            SignalKind::Close,
            DuplexInner::close_on(Rc::downgrade(&inner)),
        );

        Ok(DuplexResourceStream { inner })
    }

    #[inline]
    pub fn buffer(&self) -> &W {
        &self.inner.buffer
    }

    #[inline]
    pub fn source(&self) -> &ReadableSource {
        &self.inner.source
    }

    #[inline]
    pub fn resource(&self) -> &Rc<dyn Resource> {
        self.inner.source.resource()
    }
}

impl<W> Stream for DuplexResourceStream<W>
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
        self.inner.readable.set(false);
        self.inner.writable.set(false);

        self.inner.source.close();
        self.inner.buffer.close();

        self.inner.bus.emit(&Signal::Close);
        self.inner.bus.remove_all_listeners();
    }
}

impl<W> ReadableStream for DuplexResourceStream<W>
where
    W: WritableStream + 'static,
{
    fn is_readable(&self) -> bool {
        self.inner.readable.get()
    }

    fn pause(&self) {
        self.inner.source.pause();
    }

    fn resume(&self) {
        if self.inner.readable.get() {
            self.inner.source.resume();
        }
    }
}

impl<W> WritableStream for DuplexResourceStream<W>
where
    W: WritableStream + 'static,
{
    fn is_writable(&self) -> bool {
        self.inner.writable.get()
    }

    fn write(&self, data: &[u8]) -> bool {
        if !self.inner.writable.get() {
            return false;
        }
        self.inner.buffer.write(data)
    }

    fn end(&self, data: Option<&[u8]>) {
        if !self.inner.writable.get() {
            return;
        }
        self.inner.readable.set(false);
        self.inner.writable.set(false);
        self.inner.source.pause();

        self.inner.buffer.end(data);
    }
}

impl<W> fmt::Debug for DuplexResourceStream<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplexResourceStream")
            .field("source", &self.inner.source)
            .field("readable", &self.inner.readable.get())
            .field("writable", &self.inner.writable.get())
            .field("closed", &self.inner.closed.get())
            .finish_non_exhaustive()
    }
}
