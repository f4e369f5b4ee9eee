/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use humanize_rs::bytes::Bytes;
use yaml_rust::Yaml;

use super::{ReadSourceConfig, StreamConfig, WriteBufferConfig};

fn normalize_key(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

fn foreach_kv<F>(value: &Yaml, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    let Yaml::Hash(map) = value else {
        return Err(anyhow!("invalid yaml type, it should be a map"));
    };
    for (k, v) in map.iter() {
        let Yaml::String(key) = k else {
            return Err(anyhow!("key in hash should be string"));
        };
        f(key, v).context(format!("failed to parse value of key {key}"))?;
    }
    Ok(())
}

fn as_humanize_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(value) => {
            let v = value.parse::<Bytes>()?;
            Ok(v.size())
        }
        Yaml::Integer(value) => Ok(usize::try_from(*value)?),
        _ => Err(anyhow!(
            "yaml value type for humanize usize should be 'string' or 'integer'"
        )),
    }
}

impl WriteBufferConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Integer(_) | Yaml::String(_) = value {
            let soft_limit = as_humanize_usize(value)
                .context("the simplified form of write buffer config should be a humanize usize")?;
            return Ok(WriteBufferConfig::with_soft_limit(soft_limit));
        }

        let mut config = WriteBufferConfig::default();
        foreach_kv(value, |k, v| match normalize_key(k).as_str() {
            "soft_limit" => {
                let soft_limit = as_humanize_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
                config.set_soft_limit(soft_limit);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;
        Ok(config)
    }
}

impl ReadSourceConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        let mut config = ReadSourceConfig::default();
        foreach_kv(value, |k, v| match normalize_key(k).as_str() {
            "chunk_size" => {
                if let Yaml::Null = v {
                    config.set_chunk_size(None);
                } else {
                    let size = as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    config.set_chunk_size(Some(size));
                }
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;
        Ok(config)
    }
}

impl StreamConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        let mut config = StreamConfig::default();
        foreach_kv(value, |k, v| match normalize_key(k).as_str() {
            "read" => {
                config.read = ReadSourceConfig::parse_yaml(v)
                    .context(format!("invalid read source config value for key {k}"))?;
                Ok(())
            }
            "write" => {
                config.write = WriteBufferConfig::parse_yaml(v)
                    .context(format!("invalid write buffer config value for key {k}"))?;
                Ok(())
            }
            "chunk_size" => {
                let size = as_humanize_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
                config.read.set_chunk_size(Some(size));
                Ok(())
            }
            "soft_limit" => {
                let soft_limit = as_humanize_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
                config.write.set_soft_limit(soft_limit);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;
        Ok(config)
    }
}
