/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ResourceId;

pub type ReadyCallback = Rc<dyn Fn()>;

/// The event loop side of a stream.
///
/// Implementations call the registered callback whenever the resource
/// is ready, one call at a time on the loop thread, and never again
/// after the matching unregister.
pub trait ReadinessRegistrar {
    fn register_read(&self, id: ResourceId, callback: ReadyCallback);
    fn unregister_read(&self, id: ResourceId);
    fn register_write(&self, id: ResourceId, callback: ReadyCallback);
    fn unregister_write(&self, id: ResourceId);
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RegistrarStats {
    pub register_read: usize,
    pub unregister_read: usize,
    pub register_write: usize,
    pub unregister_write: usize,
}

/// A registrar that only records interest.
///
/// Nothing is polled: readiness is whatever the owner says it is, by
/// calling [`ManualRegistrar::fire_read`], [`ManualRegistrar::fire_write`]
/// or [`ManualRegistrar::run_once`]. Resources that are always ready, like
/// [`crate::MemoryResource`], can be driven to completion with
/// [`ManualRegistrar::run_until_idle`].
#[derive(Default)]
pub struct ManualRegistrar {
    read: RefCell<IndexMap<ResourceId, ReadyCallback>>,
    write: RefCell<IndexMap<ResourceId, ReadyCallback>>,
    stats: Cell<RegistrarStats>,
}

impl ManualRegistrar {
    pub fn new() -> Rc<Self> {
        Rc::new(ManualRegistrar::default())
    }

    pub fn is_read_registered(&self, id: ResourceId) -> bool {
        self.read.borrow().contains_key(&id)
    }

    pub fn is_write_registered(&self, id: ResourceId) -> bool {
        self.write.borrow().contains_key(&id)
    }

    pub fn registered_count(&self) -> usize {
        self.read.borrow().len() + self.write.borrow().len()
    }

    #[inline]
    pub fn stats(&self) -> RegistrarStats {
        self.stats.get()
    }

    fn update_stats<F>(&self, f: F)
    where
        F: FnOnce(&mut RegistrarStats),
    {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    /// Call the read callback of `id`, returns false if not registered
    pub fn fire_read(&self, id: ResourceId) -> bool {
        let cb = self.read.borrow().get(&id).cloned();
        match cb {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }

    /// Call the write callback of `id`, returns false if not registered
    pub fn fire_write(&self, id: ResourceId) -> bool {
        let cb = self.write.borrow().get(&id).cloned();
        match cb {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }

    /// Treat every registered resource as ready once.
    ///
    /// Write callbacks run before read callbacks, each in registration
    /// order. A callback unregistered by an earlier one in the same round
    /// is skipped. Returns the number of callbacks called.
    pub fn run_once(&self) -> usize {
        let writes: Vec<ResourceId> = self.write.borrow().keys().copied().collect();
        let reads: Vec<ResourceId> = self.read.borrow().keys().copied().collect();

        let mut called = 0;
        for id in writes {
            if self.fire_write(id) {
                called += 1;
            }
        }
        for id in reads {
            if self.fire_read(id) {
                called += 1;
            }
        }
        called
    }

    /// Keep running rounds until nothing is registered or `max_rounds`
    /// is reached, returns the number of rounds run
    pub fn run_until_idle(&self, max_rounds: usize) -> usize {
        let mut rounds = 0;
        while rounds < max_rounds && self.registered_count() > 0 {
            self.run_once();
            rounds += 1;
        }
        rounds
    }
}

impl ReadinessRegistrar for ManualRegistrar {
    fn register_read(&self, id: ResourceId, callback: ReadyCallback) {
        self.update_stats(|s| s.register_read += 1);
        self.read.borrow_mut().insert(id, callback);
    }

    fn unregister_read(&self, id: ResourceId) {
        self.update_stats(|s| s.unregister_read += 1);
        let cb = self.read.borrow_mut().shift_remove(&id);
        drop(cb);
    }

    fn register_write(&self, id: ResourceId, callback: ReadyCallback) {
        self.update_stats(|s| s.register_write += 1);
        self.write.borrow_mut().insert(id, callback);
    }

    fn unregister_write(&self, id: ResourceId) {
        self.update_stats(|s| s.unregister_write += 1);
        let cb = self.write.borrow_mut().shift_remove(&id);
        drop(cb);
    }
}
