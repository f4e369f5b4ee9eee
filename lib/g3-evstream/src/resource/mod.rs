/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

mod memory;
pub use memory::MemoryResource;

mod io_adapter;
pub use io_adapter::IoResource;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Key used to register readiness interest for a resource
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub const fn new(id: u64) -> Self {
        ResourceId(id)
    }

    /// Allocate a process wide unique id
    pub fn next() -> Self {
        ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl ResourceMode {
    #[inline]
    pub fn can_read(&self) -> bool {
        !matches!(self, ResourceMode::WriteOnly)
    }

    #[inline]
    pub fn can_write(&self) -> bool {
        !matches!(self, ResourceMode::ReadOnly)
    }
}

/// Result of a single non-blocking read
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReadChunk {
    pub data: Bytes,
    /// The resource will never return more data
    pub eof: bool,
}

impl ReadChunk {
    pub fn data(data: Bytes) -> Self {
        ReadChunk { data, eof: false }
    }

    pub fn eof() -> Self {
        ReadChunk {
            data: Bytes::new(),
            eof: true,
        }
    }

    /// Nothing available right now
    pub fn empty() -> Self {
        ReadChunk::default()
    }
}

/// The syscall level operations a stream needs from an OS handle.
///
/// All methods take `&self`: a read half and a write half may share one
/// resource, each implementation keeps its own interior mutability.
pub trait Resource {
    fn id(&self) -> ResourceId;

    fn mode(&self) -> ResourceMode;

    fn is_open(&self) -> bool;

    /// Read whatever is available without blocking, at most `max_bytes`
    /// if set
    fn read_available(&self, max_bytes: Option<usize>) -> io::Result<ReadChunk>;

    /// Write as much of `buf` as the resource accepts right now.
    ///
    /// `Ok(0)` for a non empty `buf` means the other side has gone away.
    fn write_some(&self, buf: &[u8]) -> io::Result<usize>;

    /// Release the handle, must be idempotent
    fn close(&self);
}
