//! Scrypt 驱动
//!
//! ```text
//! $scrypt$n=16384,r=8,p=1$iILKD1gVSx6bqualYqyLBQ$DNzIISdmTQS6sFdQ1tJ3UCZ7Uun4uGHNjj0x8FHOqB0pf2LYsu9Xaj5MFhHg21qBz8l5q/oxpeV+ZkgTAj+OzQ
//! ```
//!
//! scrypt 的 PHC 字符串不带版本号。

use std::sync::OnceLock;

use scrypt::Params;
use serde::{Deserialize, Serialize};

use super::{HashDriver, required_bytes, required_param};
use crate::error::{Error, Result};
use crate::phc::{self, PhcOptions, PhcParams};
use crate::random::{constant_time_compare, generate_random_bytes};
use crate::validators::{MAX_UINT32, validate_range};

/// PHC id
const ID: &str = "scrypt";

/// 传给 `Params::new` 的长度，实际输出长度由缓冲区决定
const PARAMS_LEN: usize = 32;

/// Scrypt 配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ScryptConfig {
    /// CPU/内存成本 N，必须是 2 的幂，默认 16384
    pub cost: u32,
    /// 块大小 r，默认 8
    pub block_size: u32,
    /// 并行度 p，默认 1
    pub parallelization: u32,
    /// 自动生成的 salt 字节数，默认 16
    pub salt_size: usize,
    /// 派生密钥字节数 (64..=128)，默认 64
    pub key_length: usize,
    /// 允许使用的最大内存（字节），默认 32 MiB
    pub max_memory: u32,
}

impl Default for ScryptConfig {
    fn default() -> Self {
        Self {
            cost: 16384,
            block_size: 8,
            parallelization: 1,
            salt_size: 16,
            key_length: 64,
            max_memory: 32 * 1024 * 1024,
        }
    }
}

impl ScryptConfig {
    fn validate(&self) -> Result<()> {
        validate_range("blockSize", self.block_size.into(), 1, MAX_UINT32)?;
        validate_range("cost", self.cost.into(), 2, MAX_UINT32)?;
        validate_range(
            "parallelization",
            self.parallelization.into(),
            1,
            max_parallelization(self.block_size.into()),
        )?;
        validate_range("saltSize", self.salt_size as u64, 8, 1024)?;
        validate_range("keyLength", self.key_length as u64, 64, 128)?;
        validate_range(
            "maxMemory",
            self.max_memory.into(),
            memory_required(self.cost.into(), self.block_size.into()).saturating_add(1),
            MAX_UINT32,
        )?;
        Ok(())
    }
}

/// `floor((2^32 - 1) * 32 / (128 * r))`
fn max_parallelization(block_size: u64) -> u64 {
    (MAX_UINT32 * 32) / (128 * block_size)
}

/// `128 * N * r`，溢出时取 `u64::MAX`
fn memory_required(cost: u64, block_size: u64) -> u64 {
    128u64.saturating_mul(cost).saturating_mul(block_size)
}

struct ScryptHash {
    cost: u64,
    block_size: u64,
    parallelization: u64,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

/// Scrypt 哈希驱动
#[derive(Debug)]
pub struct Scrypt {
    config: ScryptConfig,
    params: OnceLock<Params>,
}

impl Scrypt {
    /// 创建驱动，配置非法时立即失败
    pub fn new(config: ScryptConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            params: OnceLock::new(),
        })
    }

    /// 当前配置
    pub fn config(&self) -> &ScryptConfig {
        &self.config
    }

    fn params(&self) -> Result<&Params> {
        if let Some(params) = self.params.get() {
            return Ok(params);
        }
        let params = self.build_params(
            self.config.cost.into(),
            self.config.block_size.into(),
            self.config.parallelization.into(),
        )?;
        Ok(self.params.get_or_init(|| params))
    }

    /// 构建原语参数，同时执行内存上限检查
    fn build_params(&self, cost: u64, block_size: u64, parallelization: u64) -> Result<Params> {
        if cost < 2 || !cost.is_power_of_two() {
            return Err(Error::kdf(format!(
                "scrypt cost must be a power of two greater than 1, got {}",
                cost
            )));
        }
        let required = memory_required(cost, block_size);
        if required >= u64::from(self.config.max_memory) {
            return Err(Error::kdf(format!(
                "scrypt memory limit exceeded ({} >= {})",
                required, self.config.max_memory
            )));
        }

        let log_n = cost.trailing_zeros() as u8;
        let r = u32::try_from(block_size).map_err(Error::kdf)?;
        let p = u32::try_from(parallelization).map_err(Error::kdf)?;
        Params::new(log_n, r, p, PARAMS_LEN).map_err(Error::kdf)
    }

    fn validate_phc_string(&self, phc_string: &str) -> Result<ScryptHash> {
        let node = phc::deserialize(phc_string)?;

        if node.id != ID {
            return Err(Error::invalid_hash("Invalid \"id\" found in the phc string"));
        }
        let params = node
            .params
            .ok_or_else(|| Error::invalid_hash("No \"params\" found in the phc string"))?;
        let salt = required_bytes(node.salt, "salt")?;
        let hash = required_bytes(node.hash, "hash")?;
        validate_range("hash.byteLength", hash.len() as u64, 64, 128).map_err(Error::invalid_hash)?;
        validate_range("salt.byteLength", salt.len() as u64, 8, 1024).map_err(Error::invalid_hash)?;

        let block_size = required_param(&params, "r")?;
        validate_range("r", block_size, 1, MAX_UINT32).map_err(Error::invalid_hash)?;
        let cost = required_param(&params, "n")?;
        validate_range("n", cost, 1, MAX_UINT32).map_err(Error::invalid_hash)?;
        let parallelization = required_param(&params, "p")?;
        validate_range("p", parallelization, 1, max_parallelization(block_size))
            .map_err(Error::invalid_hash)?;

        Ok(ScryptHash {
            cost,
            block_size,
            parallelization,
            salt,
            hash,
        })
    }

    fn try_verify(&self, hashed_value: &str, plain_value: &str) -> Result<bool> {
        let parsed = self.validate_phc_string(hashed_value)?;
        let params = self.build_params(parsed.cost, parsed.block_size, parsed.parallelization)?;

        let mut computed = vec![0u8; parsed.hash.len()];
        scrypt::scrypt(plain_value.as_bytes(), &parsed.salt, &params, &mut computed)
            .map_err(Error::kdf)?;

        Ok(constant_time_compare(&computed, &parsed.hash))
    }
}

impl HashDriver for Scrypt {
    fn is_valid_hash(&self, value: &str) -> bool {
        self.validate_phc_string(value).is_ok()
    }

    fn make(&self, value: &str) -> Result<String> {
        let params = self.params()?;
        let salt = generate_random_bytes(self.config.salt_size)?;

        let mut hash = vec![0u8; self.config.key_length];
        scrypt::scrypt(value.as_bytes(), &salt, params, &mut hash).map_err(Error::kdf)?;

        let params = PhcParams::new()
            .with("n", self.config.cost.into())
            .with("r", self.config.block_size.into())
            .with("p", self.config.parallelization.into());
        phc::serialize(&salt, &hash, &PhcOptions::new(ID).with_params(params))
    }

    fn verify(&self, hashed_value: &str, plain_value: &str) -> bool {
        self.try_verify(hashed_value, plain_value).unwrap_or(false)
    }

    /// `n` / `r` / `p` 任一与配置不同（或缺少参数）时需要 rehash
    fn needs_rehash(&self, hashed_value: &str) -> Result<bool> {
        let node = phc::deserialize(hashed_value)?;
        if node.id != ID {
            return Err(Error::algorithm_mismatch(ID, node.id));
        }

        let Some(params) = node.params else {
            return Ok(true);
        };
        Ok(params.get("n") != Some(self.config.cost.into())
            || params.get("r") != Some(self.config.block_size.into())
            || params.get("p") != Some(self.config.parallelization.into()))
    }
}
