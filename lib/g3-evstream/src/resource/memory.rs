/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::RefCell;
use std::io;

use bytes::{Bytes, BytesMut};

use super::{ReadChunk, Resource, ResourceId, ResourceMode};

#[derive(Default)]
struct MemoryState {
    closed: bool,
    input: BytesMut,
    input_finished: bool,
    output: BytesMut,
    write_capacity: Option<usize>,
    peer_closed: bool,
    read_error: Option<io::ErrorKind>,
    write_error: Option<io::ErrorKind>,
}

/// An in-memory resource.
///
/// Bytes fed with [`MemoryResource::feed`] are returned by reads, bytes
/// written are collected and can be inspected with
/// [`MemoryResource::written`]. Write capacity, peer close and I/O errors
/// can be injected to reproduce what a non-blocking socket does.
pub struct MemoryResource {
    id: ResourceId,
    mode: ResourceMode,
    state: RefCell<MemoryState>,
}

impl MemoryResource {
    pub fn new(mode: ResourceMode) -> Self {
        MemoryResource {
            id: ResourceId::next(),
            mode,
            state: RefCell::new(MemoryState::default()),
        }
    }

    /// A resource that returns `contents` and then reports end of stream,
    /// like a regular file
    pub fn with_contents(mode: ResourceMode, contents: &[u8]) -> Self {
        let r = MemoryResource::new(mode);
        r.feed(contents);
        r.finish_input();
        r
    }

    pub fn feed(&self, data: &[u8]) {
        self.state.borrow_mut().input.extend_from_slice(data);
    }

    /// No more input will be fed, reads report end of stream once the
    /// remaining input has been consumed
    pub fn finish_input(&self) {
        self.state.borrow_mut().input_finished = true;
    }

    pub fn pending_input(&self) -> usize {
        self.state.borrow().input.len()
    }

    /// All bytes accepted by `write_some` so far
    pub fn written(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state.borrow().output)
    }

    pub fn take_written(&self) -> Bytes {
        self.state.borrow_mut().output.split().freeze()
    }

    /// Limit how many more bytes `write_some` will accept in total.
    ///
    /// Once exhausted, writes fail with `WouldBlock` until more capacity
    /// is added.
    pub fn set_write_capacity(&self, capacity: Option<usize>) {
        self.state.borrow_mut().write_capacity = capacity;
    }

    pub fn add_write_capacity(&self, size: usize) {
        let mut state = self.state.borrow_mut();
        if let Some(cap) = state.write_capacity.as_mut() {
            *cap += size;
        }
    }

    /// The remote peer closed its read side, writes accept nothing
    pub fn close_peer(&self) {
        self.state.borrow_mut().peer_closed = true;
    }

    /// Make the next read fail with `kind`
    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        self.state.borrow_mut().read_error = Some(kind);
    }

    /// Make every following write fail with `kind`, `None` clears it
    pub fn fail_writes(&self, kind: Option<io::ErrorKind>) {
        self.state.borrow_mut().write_error = kind;
    }
}

impl Resource for MemoryResource {
    #[inline]
    fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    fn mode(&self) -> ResourceMode {
        self.mode
    }

    fn is_open(&self) -> bool {
        !self.state.borrow().closed
    }

    fn read_available(&self, max_bytes: Option<usize>) -> io::Result<ReadChunk> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "memory resource closed",
            ));
        }
        if let Some(kind) = state.read_error.take() {
            return Err(io::Error::from(kind));
        }

        let len = match max_bytes {
            Some(max) => max.min(state.input.len()),
            None => state.input.len(),
        };
        let data = state.input.split_to(len).freeze();
        let eof = state.input.is_empty() && state.input_finished;
        Ok(ReadChunk { data, eof })
    }

    fn write_some(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "memory resource closed",
            ));
        }
        if let Some(kind) = state.write_error {
            return Err(io::Error::from(kind));
        }
        if buf.is_empty() || state.peer_closed {
            return Ok(0);
        }

        let len = match state.write_capacity {
            Some(0) => return Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Some(cap) => cap.min(buf.len()),
            None => buf.len(),
        };
        if let Some(cap) = state.write_capacity.as_mut() {
            *cap -= len;
        }
        state.output.extend_from_slice(&buf[..len]);
        Ok(len)
    }

    fn close(&self) {
        self.state.borrow_mut().closed = true;
    }
}
