/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::Cell;
use std::rc::Rc;

use crate::debug::stream_trace;
use crate::{ListenerId, ReadableStream, Signal, SignalKind, WeakSignalBus, WritableStream};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PipeOptions {
    /// End the destination when the source ends
    pub end: bool,
}

impl Default for PipeOptions {
    fn default() -> Self {
        PipeOptions { end: true }
    }
}

#[derive(Default)]
struct PipeBindings {
    source_data: Cell<Option<ListenerId>>,
    source_end: Cell<Option<ListenerId>>,
    source_close: Cell<Option<ListenerId>>,
    dest_drain: Cell<Option<ListenerId>>,
    dest_close: Cell<Option<ListenerId>>,
}

impl PipeBindings {
    fn detach(&self, source: &WeakSignalBus, dest: &WeakSignalBus) {
        if let Some(bus) = source.upgrade() {
            for id in [
                self.source_data.take(),
                self.source_end.take(),
                self.source_close.take(),
            ]
            .into_iter()
            .flatten()
            {
                bus.remove_listener(id);
            }
        }
        if let Some(bus) = dest.upgrade() {
            for id in [self.dest_drain.take(), self.dest_close.take()]
                .into_iter()
                .flatten()
            {
                bus.remove_listener(id);
            }
        }
    }
}

/// Forward all data of `source` into `dest` with back pressure.
///
/// The source is paused whenever a write to `dest` returns false and
/// resumed on the next `Drain` of `dest`. Unless disabled in `options`,
/// `dest` is ended when the source ends. All bindings are removed as soon
/// as either side closes.
///
/// Nothing is attached if the source is not readable, and the source is
/// only paused if `dest` is not writable. Returns `dest` for chaining.
pub fn pipe<S, D>(source: &S, dest: &D, options: PipeOptions) -> D
where
    S: ReadableStream + Clone + 'static,
    D: WritableStream + Clone + 'static,
{
    if !source.is_readable() {
        return dest.clone();
    }
    if !dest.is_writable() {
        source.pause();
        return dest.clone();
    }

    dest.signals().emit(&Signal::Pipe(source));

    let bindings = Rc::new(PipeBindings::default());

    let (s, d) = (source.clone(), dest.clone());
    let id = source.signals().on(SignalKind::Data, move |signal| {
        if let Signal::Data(data) = signal {
            if !d.write(data) {
                s.pause();
            }
        }
    });
    bindings.source_data.set(Some(id));

    let s = source.clone();
    let id = dest.signals().on(SignalKind::Drain, move |_| s.resume());
    bindings.dest_drain.set(Some(id));

    if options.end && !source.same_stream(dest) {
        let d = dest.clone();
        let id = source.signals().on(SignalKind::End, move |_| d.end(None));
        bindings.source_end.set(Some(id));
    }

    let source_bus = source.signals().downgrade();
    let dest_bus = dest.signals().downgrade();

    let (b, sb, db) = (bindings.clone(), source_bus.clone(), dest_bus.clone());
    let id = dest.signals().on(SignalKind::Close, move |_| {
        stream_trace!("pipe destination closed, detach from source");
        b.detach(&sb, &db);
    });
    bindings.dest_close.set(Some(id));

    let b = bindings.clone();
    let id = source.signals().on(SignalKind::Close, move |_| {
        b.detach(&source_bus, &dest_bus);
    });
    bindings.source_close.set(Some(id));

    dest.clone()
}

pub trait ReadableStreamExt: ReadableStream + Clone + 'static {
    /// Pipe into `dest` with the default options
    fn pipe<D>(&self, dest: &D) -> D
    where
        D: WritableStream + Clone + 'static,
    {
        pipe(self, dest, PipeOptions::default())
    }

    fn pipe_with<D>(&self, dest: &D, options: PipeOptions) -> D
    where
        D: WritableStream + Clone + 'static,
    {
        pipe(self, dest, options)
    }
}

impl<T> ReadableStreamExt for T where T: ReadableStream + Clone + 'static {}
