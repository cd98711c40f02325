//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest tuple arity a decoder accepts before treating the stream as corrupt.
    pub max_arity: usize,

    /// Largest length-prefixed payload (strings, binaries) a decoder accepts.
    pub max_payload_len: usize,

    /// Number of hash partitions the local shuffle splits grouping keys into.
    pub num_partitions: usize,

    /// Execution parallelism. The local runner never uses more worker threads.
    pub max_parallel_tasks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_arity: 64 * 1024,
            max_payload_len: 64 * 1024 * 1024, // 64 MiB
            num_partitions: 1,
            max_parallel_tasks: 1,
        }
    }
}

/// Decode-side sanity limits, snapshotted from `EngineConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecLimits {
    pub max_arity: usize,
    pub max_payload_len: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        EngineConfig::default().codec_limits()
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TUPLESTREAM_MAX_ARITY`: max decoded tuple arity
    /// - `TUPLESTREAM_MAX_PAYLOAD_LEN`: max decoded string/binary length in bytes
    /// - `TUPLESTREAM_NUM_PARTITIONS`: shuffle partitions
    /// - `TUPLESTREAM_MAX_PARALLEL_TASKS`: max worker threads
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("TUPLESTREAM_MAX_ARITY") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_arity = v;
            }
        }

        if let Ok(s) = std::env::var("TUPLESTREAM_MAX_PAYLOAD_LEN") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_payload_len = v;
            }
        }

        if let Ok(s) = std::env::var("TUPLESTREAM_NUM_PARTITIONS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.num_partitions = v;
            }
        }

        if let Ok(s) = std::env::var("TUPLESTREAM_MAX_PARALLEL_TASKS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_parallel_tasks = v;
            }
        }

        cfg
    }

    /// Parse a JSON config; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_partitions == 0 {
            return Err(Error::Config("num_partitions must be at least 1".into()));
        }
        if self.max_parallel_tasks == 0 {
            return Err(Error::Config("max_parallel_tasks must be at least 1".into()));
        }
        if self.max_arity == 0 {
            return Err(Error::Config("max_arity must be at least 1".into()));
        }
        Ok(())
    }

    /// Produce the limit snapshot handed to codecs.
    pub fn codec_limits(&self) -> CodecLimits {
        CodecLimits {
            max_arity: self.max_arity,
            max_payload_len: self.max_payload_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_defaults() {
        let cfg = EngineConfig::from_json_str(r#"{"num_partitions": 8}"#).unwrap();
        assert_eq!(cfg.num_partitions, 8);
        assert_eq!(cfg.max_parallel_tasks, 1);
        assert_eq!(cfg.codec_limits(), EngineConfig::default().codec_limits());
    }

    #[test]
    fn rejects_zero_partitions() {
        let err = EngineConfig::from_json_str(r#"{"num_partitions": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
