/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub mod debug;

mod error;
pub use error::StreamError;

mod signal;
pub use signal::{ListenerId, Signal, SignalBus, SignalKind, WeakSignalBus, forward_signals};

mod stream;
pub use stream::{DuplexStream, ReadableStream, Stream, WritableStream};

mod registrar;
pub use registrar::{ManualRegistrar, ReadinessRegistrar, ReadyCallback, RegistrarStats};

mod resource;
pub use resource::{IoResource, MemoryResource, ReadChunk, Resource, ResourceId, ResourceMode};

pub mod config;
pub use config::{ReadSourceConfig, StreamConfig, WriteBufferConfig};

mod write;
pub use write::WriteBuffer;

mod read;
pub use read::ReadableSource;

mod pipe;
pub use pipe::{PipeOptions, ReadableStreamExt, pipe};

mod duplex;
pub use duplex::{CompositeStream, DuplexResourceStream};

mod through;
pub use through::ThroughStream;

mod transform;
pub use transform::TransformerStream;

#[cfg(test)]
mod testing;
