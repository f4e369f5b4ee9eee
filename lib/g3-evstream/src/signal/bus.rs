/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::{Signal, SignalKind};

type ListenerFn = dyn Fn(&Signal<'_>);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    kind: SignalKind,
    once: bool,
    func: Rc<ListenerFn>,
}

#[derive(Default)]
struct BusInner {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<Listener>>,
}

/// Per-stream signal dispatcher.
///
/// Listeners run synchronously inside `emit`, in registration order.
/// The bus is a cheap handle, clones share the same listener table.
#[derive(Clone, Default)]
pub struct SignalBus {
    inner: Rc<BusInner>,
}

#[derive(Clone, Default)]
pub struct WeakSignalBus {
    inner: Weak<BusInner>,
}

impl WeakSignalBus {
    pub fn upgrade(&self) -> Option<SignalBus> {
        self.inner.upgrade().map(|inner| SignalBus { inner })
    }
}

impl SignalBus {
    pub fn new() -> Self {
        SignalBus::default()
    }

    pub fn on<F>(&self, kind: SignalKind, f: F) -> ListenerId
    where
        F: Fn(&Signal<'_>) + 'static,
    {
        self.add(kind, false, Rc::new(f))
    }

    /// Add a listener that is removed right before its first call
    pub fn once<F>(&self, kind: SignalKind, f: F) -> ListenerId
    where
        F: Fn(&Signal<'_>) + 'static,
    {
        self.add(kind, true, Rc::new(f))
    }

    fn add(&self, kind: SignalKind, once: bool, func: Rc<ListenerFn>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            kind,
            once,
            func,
        });
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let removed = {
            let mut listeners = self.inner.listeners.borrow_mut();
            listeners
                .iter()
                .position(|l| l.id == id)
                .map(|pos| listeners.remove(pos))
        };
        // drop the closure after the guard is released, dropping it may
        // re-enter this bus and a second borrow_mut would panic
        removed.is_some()
    }

    pub fn remove_all_listeners(&self) {
        let listeners = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        drop(listeners);
    }

    pub fn listener_count(&self, kind: SignalKind) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }

    #[inline]
    pub fn has_listeners(&self, kind: SignalKind) -> bool {
        self.listener_count(kind) > 0
    }

    fn contains(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow().iter().any(|l| l.id == id)
    }

    /// Call every listener registered for the signal's kind.
    ///
    /// Returns false if there was no listener. A listener removed by an
    /// earlier listener of the same emit is skipped, listeners added
    /// during the emit only see later signals.
    pub fn emit(&self, signal: &Signal<'_>) -> bool {
        let kind = signal.kind();
        let matched: Vec<(ListenerId, bool, Rc<ListenerFn>)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| (l.id, l.once, l.func.clone()))
            .collect();
        if matched.is_empty() {
            return false;
        }

        for (id, once, func) in matched {
            let active = if once {
                self.remove_listener(id)
            } else {
                self.contains(id)
            };
            if active {
                func(signal);
            }
        }
        true
    }

    #[inline]
    pub fn ptr_eq(&self, other: &SignalBus) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakSignalBus {
        WeakSignalBus {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}
