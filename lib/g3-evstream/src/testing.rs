/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{ReadableStream, Signal, SignalBus, SignalKind, Stream, StreamError, WritableStream};

pub(crate) fn count_signals(bus: &SignalBus, kind: SignalKind) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    bus.on(kind, move |_| c.set(c.get() + 1));
    count
}

pub(crate) fn record_errors(bus: &SignalBus) -> Rc<RefCell<Vec<String>>> {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let e = errors.clone();
    bus.on(SignalKind::Error, move |s| {
        if let Signal::Error(err) = s {
            e.borrow_mut().push(err.to_string());
        }
    });
    errors
}

pub(crate) fn collect_data(bus: &SignalBus) -> Rc<RefCell<Vec<u8>>> {
    let data = Rc::new(RefCell::new(Vec::new()));
    let d = data.clone();
    bus.on(SignalKind::Data, move |s| {
        if let Signal::Data(b) = s {
            d.borrow_mut().extend_from_slice(b);
        }
    });
    data
}

pub(crate) fn record_kinds(
    bus: &SignalBus,
    kinds: &[SignalKind],
) -> Rc<RefCell<Vec<SignalKind>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in kinds {
        let l = log.clone();
        bus.on(*kind, move |s| l.borrow_mut().push(s.kind()));
    }
    log
}

struct ReadableStubInner {
    bus: SignalBus,
    readable: Cell<bool>,
    paused: Cell<bool>,
    pause_calls: Cell<usize>,
    resume_calls: Cell<usize>,
}

/// A readable stream whose signals are emitted by the test itself
#[derive(Clone)]
pub(crate) struct ReadableStub {
    inner: Rc<ReadableStubInner>,
}

impl ReadableStub {
    pub(crate) fn new() -> Self {
        ReadableStub {
            inner: Rc::new(ReadableStubInner {
                bus: SignalBus::new(),
                readable: Cell::new(true),
                paused: Cell::new(false),
                pause_calls: Cell::new(0),
                resume_calls: Cell::new(0),
            }),
        }
    }

    pub(crate) fn not_readable() -> Self {
        let stub = ReadableStub::new();
        stub.inner.readable.set(false);
        stub
    }

    pub(crate) fn emit_data(&self, data: &[u8]) {
        self.inner.bus.emit(&Signal::Data(data));
    }

    pub(crate) fn emit_end(&self) {
        self.inner.bus.emit(&Signal::End);
    }

    pub(crate) fn emit_error(&self, e: StreamError) {
        self.inner.bus.emit(&Signal::Error(&e));
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.inner.paused.get()
    }

    pub(crate) fn pause_calls(&self) -> usize {
        self.inner.pause_calls.get()
    }

    pub(crate) fn resume_calls(&self) -> usize {
        self.inner.resume_calls.get()
    }
}

impl Stream for ReadableStub {
    fn signals(&self) -> &SignalBus {
        &self.inner.bus
    }

    fn close(&self) {
        if !self.inner.readable.replace(false) {
            return;
        }
        self.inner.bus.emit(&Signal::Close);
        self.inner.bus.remove_all_listeners();
    }
}

impl ReadableStream for ReadableStub {
    fn is_readable(&self) -> bool {
        self.inner.readable.get()
    }

    fn pause(&self) {
        self.inner.paused.set(true);
        self.inner.pause_calls.set(self.inner.pause_calls.get() + 1);
    }

    fn resume(&self) {
        self.inner.paused.set(false);
        self.inner.resume_calls.set(self.inner.resume_calls.get() + 1);
    }
}

struct WritableMockInner {
    bus: SignalBus,
    writable: Cell<bool>,
    accept: Cell<bool>,
    written: RefCell<Vec<u8>>,
    write_calls: Cell<usize>,
    end_calls: Cell<usize>,
    closed: Cell<bool>,
}

/// A writable stream recording everything written to it
#[derive(Clone)]
pub(crate) struct WritableMock {
    inner: Rc<WritableMockInner>,
}

impl WritableMock {
    pub(crate) fn new() -> Self {
        WritableMock {
            inner: Rc::new(WritableMockInner {
                bus: SignalBus::new(),
                writable: Cell::new(true),
                accept: Cell::new(true),
                written: RefCell::new(Vec::new()),
                write_calls: Cell::new(0),
                end_calls: Cell::new(0),
                closed: Cell::new(false),
            }),
        }
    }

    pub(crate) fn not_writable() -> Self {
        let mock = WritableMock::new();
        mock.inner.writable.set(false);
        mock
    }

    /// Set the return value of the following writes
    pub(crate) fn set_accept(&self, accept: bool) {
        self.inner.accept.set(accept);
    }

    pub(crate) fn emit_drain(&self) {
        self.inner.bus.emit(&Signal::Drain);
    }

    pub(crate) fn emit_error(&self, e: StreamError) {
        self.inner.bus.emit(&Signal::Error(&e));
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.inner.written.borrow().clone()
    }

    pub(crate) fn write_calls(&self) -> usize {
        self.inner.write_calls.get()
    }

    pub(crate) fn end_calls(&self) -> usize {
        self.inner.end_calls.get()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}

impl Stream for WritableMock {
    fn signals(&self) -> &SignalBus {
        &self.inner.bus
    }

    fn close(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        self.inner.writable.set(false);
        self.inner.bus.emit(&Signal::Close);
        self.inner.bus.remove_all_listeners();
    }
}

impl WritableStream for WritableMock {
    fn is_writable(&self) -> bool {
        self.inner.writable.get()
    }

    fn write(&self, data: &[u8]) -> bool {
        self.inner.write_calls.set(self.inner.write_calls.get() + 1);
        if !self.inner.writable.get() {
            return false;
        }
        self.inner.written.borrow_mut().extend_from_slice(data);
        self.inner.accept.get()
    }

    fn end(&self, data: Option<&[u8]>) {
        self.inner.end_calls.set(self.inner.end_calls.get() + 1);
        if let Some(data) = data {
            self.write(data);
        }
        self.inner.writable.set(false);
    }
}
