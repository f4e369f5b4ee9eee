/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("invalid resource: {0}")]
    InvalidResource(&'static str),
    #[error("unable to write to stream: {0}")]
    WriteFailed(io::Error),
    #[error("tried to write to closed stream")]
    WriteToClosed,
    #[error("unable to read from stream: {0}")]
    ReadFailed(io::Error),
    #[error("filter failed: {0}")]
    FilterFailed(anyhow::Error),
}

impl StreamError {
    /// Whether the error is the result of a failed I/O operation on the resource
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            StreamError::WriteFailed(_) | StreamError::WriteToClosed | StreamError::ReadFailed(_)
        )
    }
}

/// Errors that should be retried on the next readiness callback.
///
/// A non-blocking resource may accept nothing and report `WouldBlock`,
/// which only means the kernel buffer is full at the moment.
#[inline]
pub(crate) fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
