/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use bytes::BytesMut;

use super::{ReadChunk, Resource, ResourceId, ResourceMode};

const DEFAULT_READ_SIZE: usize = 16 * 1024; // 16KB

/// Adapter from a non-blocking std I/O object to [`Resource`].
///
/// The object is dropped, and so the handle released, on close.
pub struct IoResource<T> {
    id: ResourceId,
    mode: ResourceMode,
    read_size: usize,
    io: RefCell<Option<T>>,
}

impl<T> IoResource<T>
where
    T: Read + Write,
{
    /// The caller is responsible for putting `io` into non-blocking mode
    pub fn new(io: T, mode: ResourceMode) -> Self {
        IoResource {
            id: ResourceId::next(),
            mode,
            read_size: DEFAULT_READ_SIZE,
            io: RefCell::new(Some(io)),
        }
    }

    /// Set the size of each single read syscall
    pub fn set_read_size(&mut self, size: usize) {
        self.read_size = size.max(1);
    }

    pub fn into_inner(self) -> Option<T> {
        self.io.into_inner()
    }

    fn not_open() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "resource already closed")
    }
}

impl IoResource<TcpStream> {
    pub fn tcp(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(IoResource::new(stream, ResourceMode::ReadWrite))
    }
}

#[cfg(unix)]
impl IoResource<UnixStream> {
    pub fn unix(stream: UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(IoResource::new(stream, ResourceMode::ReadWrite))
    }
}

impl<T> Resource for IoResource<T>
where
    T: Read + Write,
{
    #[inline]
    fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    fn mode(&self) -> ResourceMode {
        self.mode
    }

    fn is_open(&self) -> bool {
        self.io.borrow().is_some()
    }

    fn read_available(&self, max_bytes: Option<usize>) -> io::Result<ReadChunk> {
        let mut guard = self.io.borrow_mut();
        let io = guard.as_mut().ok_or_else(Self::not_open)?;

        let mut buf = BytesMut::new();
        loop {
            let want = match max_bytes {
                Some(max) => (max - buf.len()).min(self.read_size),
                None => self.read_size,
            };
            if want == 0 {
                break;
            }

            let start = buf.len();
            buf.resize(start + want, 0);
            match io.read(&mut buf[start..]) {
                Ok(0) => {
                    buf.truncate(start);
                    return Ok(ReadChunk {
                        data: buf.freeze(),
                        eof: true,
                    });
                }
                Ok(n) => buf.truncate(start + n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => buf.truncate(start),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    buf.truncate(start);
                    break;
                }
                Err(e) => {
                    buf.truncate(start);
                    if buf.is_empty() {
                        return Err(e);
                    }
                    // return what we have, the error will show up again
                    break;
                }
            }
        }

        Ok(ReadChunk::data(buf.freeze()))
    }

    fn write_some(&self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.io.borrow_mut();
        let io = guard.as_mut().ok_or_else(Self::not_open)?;
        io.write(buf)
    }

    fn close(&self) {
        let io = self.io.borrow_mut().take();
        drop(io);
    }
}
