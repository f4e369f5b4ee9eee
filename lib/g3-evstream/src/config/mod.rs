/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_SOFT_LIMIT: usize = 64 * 1024; // 64KB
const MINIMAL_SOFT_LIMIT: usize = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WriteBufferConfig {
    soft_limit: usize,
}

impl Default for WriteBufferConfig {
    fn default() -> Self {
        WriteBufferConfig {
            soft_limit: DEFAULT_SOFT_LIMIT,
        }
    }
}

impl WriteBufferConfig {
    pub fn with_soft_limit(soft_limit: usize) -> Self {
        let mut config = WriteBufferConfig::default();
        config.set_soft_limit(soft_limit);
        config
    }

    /// Set the pending size at which `write` starts returning false.
    ///
    /// This is advisory only, the buffer itself never rejects data.
    pub fn set_soft_limit(&mut self, soft_limit: usize) {
        self.soft_limit = soft_limit.max(MINIMAL_SOFT_LIMIT);
    }

    #[inline]
    pub fn soft_limit(&self) -> usize {
        self.soft_limit
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadSourceConfig {
    chunk_size: Option<usize>,
}

impl ReadSourceConfig {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        let mut config = ReadSourceConfig::default();
        config.set_chunk_size(Some(chunk_size));
        config
    }

    /// Set the max size of each `Data` chunk.
    ///
    /// `None` or zero means read everything available in one go.
    pub fn set_chunk_size(&mut self, chunk_size: Option<usize>) {
        self.chunk_size = chunk_size.filter(|v| *v > 0);
    }

    #[inline]
    pub fn chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StreamConfig {
    pub read: ReadSourceConfig,
    pub write: WriteBufferConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_limit() {
        let config = WriteBufferConfig::default();
        assert_eq!(config.soft_limit(), 65536);

        let config = WriteBufferConfig::with_soft_limit(4);
        assert_eq!(config.soft_limit(), 4);

        let config = WriteBufferConfig::with_soft_limit(0);
        assert_eq!(config.soft_limit(), 1);
    }

    #[test]
    fn chunk_size() {
        let config = ReadSourceConfig::default();
        assert_eq!(config.chunk_size(), None);

        let config = ReadSourceConfig::with_chunk_size(1024);
        assert_eq!(config.chunk_size(), Some(1024));

        let config = ReadSourceConfig::with_chunk_size(0);
        assert_eq!(config.chunk_size(), None);
    }
}
