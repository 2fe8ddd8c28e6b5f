//! Argon2 驱动
//!
//! 基于 `argon2` crate，哈希以 PHC 格式存储：
//!
//! ```text
//! $argon2id$v=19$t=3,m=4096,p=1$drxJBWzWahR5tMubp+a1Sw$L/Oh2uw6QKW77i/KQ8eGuOt3ui52hEmmKlu1KBVBxiM
//! ```

use std::fmt;
use std::sync::OnceLock;

use argon2::{Algorithm, Argon2, Block, Params, Version};
use serde::{Deserialize, Serialize};

use super::{HashDriver, required_bytes, required_param};
use crate::error::{Error, Result};
use crate::phc::{self, PhcOptions, PhcParams};
use crate::random::{constant_time_compare, generate_random_bytes};
use crate::validators::{MAX_UINT24, MAX_UINT32, validate_enum, validate_range};

/// 支持的 PHC id
const IDS: [&str; 3] = ["argon2d", "argon2i", "argon2id"];

/// 支持的版本
const VERSIONS: [u32; 2] = [0x10, 0x13];

/// 没有版本号的旧哈希按 0x10 处理
const LEGACY_VERSION: u32 = 0x10;

/// Argon2 变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArgonVariant {
    /// Argon2d - 抵抗 GPU 攻击
    #[serde(rename = "d")]
    D,
    /// Argon2i - 抵抗侧信道攻击
    #[serde(rename = "i")]
    I,
    /// Argon2id - 推荐的默认变体
    #[default]
    #[serde(rename = "id")]
    Id,
}

impl ArgonVariant {
    /// PHC id，例如 `argon2id`
    pub fn id(&self) -> &'static str {
        match self {
            ArgonVariant::D => "argon2d",
            ArgonVariant::I => "argon2i",
            ArgonVariant::Id => "argon2id",
        }
    }

    /// 从 PHC id 的后缀中解析变体
    pub fn from_id(id: &str) -> Option<Self> {
        match id.strip_prefix("argon2")? {
            "d" => Some(ArgonVariant::D),
            "i" => Some(ArgonVariant::I),
            "id" => Some(ArgonVariant::Id),
            _ => None,
        }
    }

    fn algorithm(&self) -> Algorithm {
        match self {
            ArgonVariant::D => Algorithm::Argon2d,
            ArgonVariant::I => Algorithm::Argon2i,
            ArgonVariant::Id => Algorithm::Argon2id,
        }
    }
}

impl fmt::Display for ArgonVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgonVariant::D => write!(f, "d"),
            ArgonVariant::I => write!(f, "i"),
            ArgonVariant::Id => write!(f, "id"),
        }
    }
}

/// Argon2 配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ArgonConfig {
    /// 变体，默认 `id`
    pub variant: ArgonVariant,
    /// 版本，`0x10` 或 `0x13`，默认 `0x13`
    pub version: u32,
    /// 迭代次数，默认 3
    pub iterations: u32,
    /// 内存大小 (KiB)，默认 65536
    pub memory: u32,
    /// 并行度，默认 4
    pub parallelism: u32,
    /// 自动生成的 salt 字节数，默认 16
    pub salt_size: usize,
    /// 原始摘要字节数，默认 32
    pub hash_length: u32,
    /// 校验时允许哈希携带的最大 `m` (KiB)，默认 4 GiB
    pub max_memory: u32,
}

impl Default for ArgonConfig {
    fn default() -> Self {
        Self {
            variant: ArgonVariant::Id,
            version: 0x13,
            iterations: 3,
            memory: 65536,
            parallelism: 4,
            salt_size: 16,
            hash_length: 32,
            max_memory: 4 * 1024 * 1024,
        }
    }
}

impl ArgonConfig {
    fn validate(&self) -> Result<()> {
        validate_range("iterations", self.iterations.into(), 2, MAX_UINT32)?;
        validate_range("parallelism", self.parallelism.into(), 1, MAX_UINT24)?;
        validate_range(
            "memory",
            self.memory.into(),
            8 * u64::from(self.parallelism),
            MAX_UINT32,
        )?;
        validate_range("saltSize", self.salt_size as u64, 8, 1024)?;
        validate_range("hashLength", self.hash_length.into(), 4, MAX_UINT32)?;
        validate_enum("version", &self.version, &VERSIONS)?;
        validate_range("maxMemory", self.max_memory.into(), self.memory.into(), MAX_UINT32)?;
        Ok(())
    }
}

/// 通过校验的 argon2 PHC 字符串
struct ArgonHash {
    variant: ArgonVariant,
    version: u32,
    iterations: u32,
    memory: u32,
    parallelism: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

/// Argon2 哈希驱动
///
/// # Example
///
/// ```rust
/// use hashrs::drivers::{Argon, ArgonConfig, HashDriver};
///
/// let argon = Argon::new(ArgonConfig {
///     memory: 4096,
///     parallelism: 1,
///     ..Default::default()
/// })
/// .unwrap();
///
/// let hash = argon.make("secret").unwrap();
/// assert!(hash.starts_with("$argon2id$v=19$t=3,m=4096,p=1$"));
/// assert!(argon.verify(&hash, "secret"));
/// ```
pub struct Argon {
    config: ArgonConfig,
    /// 按配置构建的上下文，首次 `make` 时初始化
    context: OnceLock<Argon2<'static>>,
}

impl Argon {
    /// 创建驱动，配置非法时立即失败
    pub fn new(config: ArgonConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            context: OnceLock::new(),
        })
    }

    /// 当前配置
    pub fn config(&self) -> &ArgonConfig {
        &self.config
    }

    fn context(&self) -> Result<&Argon2<'static>> {
        if let Some(context) = self.context.get() {
            return Ok(context);
        }
        let context = build_context(
            self.config.variant,
            self.config.version,
            self.config.iterations,
            self.config.memory,
            self.config.parallelism,
            self.config.hash_length as usize,
        )?;
        Ok(self.context.get_or_init(|| context))
    }

    fn validate_phc_string(&self, phc_string: &str) -> Result<ArgonHash> {
        let node = phc::deserialize(phc_string)?;

        // 旧版 argon 字符串没有版本号
        let version = node.version.unwrap_or(LEGACY_VERSION);

        let params = node
            .params
            .ok_or_else(|| Error::invalid_hash("No \"params\" found in the phc string"))?;
        let salt = required_bytes(node.salt, "salt")?;
        let hash = required_bytes(node.hash, "hash")?;
        validate_range("salt.byteLength", salt.len() as u64, 8, 1024).map_err(Error::invalid_hash)?;
        validate_range("hash.byteLength", hash.len() as u64, 4, MAX_UINT32)
            .map_err(Error::invalid_hash)?;

        validate_enum("id", &node.id.as_str(), &IDS).map_err(Error::invalid_hash)?;
        let variant = ArgonVariant::from_id(&node.id)
            .ok_or_else(|| Error::invalid_hash(format!("Unknown argon variant in \"{}\"", node.id)))?;

        validate_enum("version", &version, &VERSIONS).map_err(Error::invalid_hash)?;

        let iterations = required_param(&params, "t")?;
        validate_range("t", iterations, 1, MAX_UINT32).map_err(Error::invalid_hash)?;
        let parallelism = required_param(&params, "p")?;
        validate_range("p", parallelism, 1, MAX_UINT24).map_err(Error::invalid_hash)?;
        let memory = required_param(&params, "m")?;
        validate_range("m", memory, 8 * parallelism, MAX_UINT32).map_err(Error::invalid_hash)?;

        Ok(ArgonHash {
            variant,
            version,
            iterations: iterations as u32,
            memory: memory as u32,
            parallelism: parallelism as u32,
            salt,
            hash,
        })
    }

    fn try_verify(&self, hashed_value: &str, plain_value: &str) -> Result<bool> {
        let parsed = self.validate_phc_string(hashed_value)?;
        if parsed.memory > self.config.max_memory {
            return Err(Error::kdf(format!(
                "argon2 memory limit exceeded ({} > {})",
                parsed.memory, self.config.max_memory
            )));
        }

        // 使用哈希自身携带的参数重新计算
        let context = build_context(
            parsed.variant,
            parsed.version,
            parsed.iterations,
            parsed.memory,
            parsed.parallelism,
            parsed.hash.len(),
        )?;
        let mut computed = vec![0u8; parsed.hash.len()];
        hash_into(&context, plain_value.as_bytes(), &parsed.salt, &mut computed)?;

        Ok(constant_time_compare(&computed, &parsed.hash))
    }
}

impl fmt::Debug for Argon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argon")
            .field("config", &self.config)
            .field("bound", &self.context.get().is_some())
            .finish()
    }
}

impl HashDriver for Argon {
    fn is_valid_hash(&self, value: &str) -> bool {
        self.validate_phc_string(value).is_ok()
    }

    fn make(&self, value: &str) -> Result<String> {
        let context = self.context()?;
        let salt = generate_random_bytes(self.config.salt_size)?;

        let mut hash = vec![0u8; self.config.hash_length as usize];
        hash_into(context, value.as_bytes(), &salt, &mut hash)?;

        let params = PhcParams::new()
            .with("t", self.config.iterations.into())
            .with("m", self.config.memory.into())
            .with("p", self.config.parallelism.into());
        let options = PhcOptions::new(self.config.variant.id())
            .with_version(self.config.version)
            .with_params(params);

        phc::serialize(&salt, &hash, &options)
    }

    fn verify(&self, hashed_value: &str, plain_value: &str) -> bool {
        self.try_verify(hashed_value, plain_value).unwrap_or(false)
    }

    /// 以下情况需要 rehash：
    ///
    /// 1. 版本不同（或哈希没有版本）
    /// 2. 变体不同
    /// 3. 缺少参数，或 `m` / `t` / `p` 任一不同
    fn needs_rehash(&self, hashed_value: &str) -> Result<bool> {
        let node = phc::deserialize(hashed_value)?;
        if !IDS.contains(&node.id.as_str()) {
            return Err(Error::algorithm_mismatch("argon2", node.id));
        }

        if node.version != Some(self.config.version) {
            return Ok(true);
        }
        if node.id != self.config.variant.id() {
            return Ok(true);
        }

        let Some(params) = node.params else {
            return Ok(true);
        };
        Ok(params.get("m") != Some(self.config.memory.into())
            || params.get("t") != Some(self.config.iterations.into())
            || params.get("p") != Some(self.config.parallelism.into()))
    }
}

fn build_context(
    variant: ArgonVariant,
    version: u32,
    iterations: u32,
    memory: u32,
    parallelism: u32,
    output_len: usize,
) -> Result<Argon2<'static>> {
    let version = match version {
        0x10 => Version::V0x10,
        0x13 => Version::V0x13,
        other => return Err(Error::kdf(format!("unsupported argon2 version {:#x}", other))),
    };
    let params =
        Params::new(memory, iterations, parallelism, Some(output_len)).map_err(Error::kdf)?;
    Ok(Argon2::new(variant.algorithm(), version, params))
}

/// 计算摘要，内存块分配失败时返回错误而不是中止进程
fn hash_into(context: &Argon2<'_>, password: &[u8], salt: &[u8], out: &mut [u8]) -> Result<()> {
    let count = context.params().block_count();
    let mut blocks: Vec<Block> = Vec::new();
    blocks
        .try_reserve_exact(count)
        .map_err(|e| Error::kdf(format!("cannot allocate {} argon2 blocks: {}", count, e)))?;
    blocks.resize(count, Block::new());

    context
        .hash_password_into_with_memory(password, salt, out, &mut blocks)
        .map_err(Error::kdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn small_config() -> ArgonConfig {
        ArgonConfig {
            iterations: 2,
            memory: 256,
            parallelism: 1,
            ..Default::default()
        }
    }

    fn config_error(config: ArgonConfig) -> String {
        match Argon::new(config) {
            Err(Error::Config(e)) => e.to_string(),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Argon::new(ArgonConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_iterations() {
        assert_eq!(
            config_error(ArgonConfig {
                iterations: 1,
                ..Default::default()
            }),
            "The \"iterations\" option must be in the range (2 <= iterations <= 4294967295)"
        );
    }

    #[test]
    fn test_validate_parallelism() {
        assert_eq!(
            config_error(ArgonConfig {
                parallelism: 0,
                ..Default::default()
            }),
            "The \"parallelism\" option must be in the range (1 <= parallelism <= 16777215)"
        );
        assert!(matches!(
            Argon::new(ArgonConfig {
                parallelism: 1 << 24,
                memory: u32::MAX,
                ..Default::default()
            }),
            Err(Error::Config(ConfigError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_validate_memory_depends_on_parallelism() {
        assert_eq!(
            config_error(ArgonConfig {
                memory: 31,
                parallelism: 4,
                ..Default::default()
            }),
            "The \"memory\" option must be in the range (32 <= memory <= 4294967295)"
        );
    }

    #[test]
    fn test_validate_salt_size_and_hash_length() {
        assert!(Argon::new(ArgonConfig {
            salt_size: 4,
            ..Default::default()
        })
        .is_err());
        assert!(Argon::new(ArgonConfig {
            salt_size: 4096,
            ..Default::default()
        })
        .is_err());
        assert!(Argon::new(ArgonConfig {
            hash_length: 3,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_validate_version() {
        assert_eq!(
            config_error(ArgonConfig {
                version: 0x12,
                ..Default::default()
            }),
            "The \"version\" option must be one of: 16,19"
        );
    }

    #[test]
    fn test_variant_from_id() {
        assert_eq!(ArgonVariant::from_id("argon2id"), Some(ArgonVariant::Id));
        assert_eq!(ArgonVariant::from_id("argon2d"), Some(ArgonVariant::D));
        assert_eq!(ArgonVariant::from_id("argon2x"), None);
        assert_eq!(ArgonVariant::from_id("bcrypt"), None);
    }

    #[test]
    fn test_config_from_json() {
        let config: ArgonConfig =
            serde_json::from_str(r#"{"variant":"i","memory":4096,"saltSize":32}"#).unwrap();
        assert_eq!(config.variant, ArgonVariant::I);
        assert_eq!(config.memory, 4096);
        assert_eq!(config.salt_size, 32);
        assert_eq!(config.iterations, 3);

        assert!(serde_json::from_str::<ArgonConfig>(r#"{"variant":"x"}"#).is_err());
        assert!(serde_json::from_str::<ArgonConfig>(r#"{"rounds":10}"#).is_err());
    }

    #[test]
    fn test_make_serializes_config() {
        let argon = Argon::new(small_config()).unwrap();
        let hash = argon.make("hello-world").unwrap();

        let node = phc::deserialize(&hash).unwrap();
        assert_eq!(node.id, "argon2id");
        assert_eq!(node.version, Some(0x13));
        assert_eq!(
            node.params,
            Some(PhcParams::new().with("t", 2).with("m", 256).with("p", 1))
        );
        assert_eq!(node.salt.map(|s| s.len()), Some(16));
        assert_eq!(node.hash.map(|h| h.len()), Some(32));
    }

    #[test]
    fn test_make_and_verify() {
        let argon = Argon::new(small_config()).unwrap();
        let hash = argon.make("hello-world").unwrap();

        assert!(argon.verify(&hash, "hello-world"));
        assert!(!argon.verify(&hash, "hi-world"));
        assert!(!argon.needs_rehash(&hash).unwrap());
    }

    #[test]
    fn test_validate_max_memory() {
        assert_eq!(
            config_error(ArgonConfig {
                memory: 8192,
                max_memory: 4096,
                parallelism: 1,
                ..Default::default()
            }),
            "The \"maxMemory\" option must be in the range (8192 <= maxMemory <= 4294967295)"
        );
    }

    #[test]
    fn test_huge_embedded_memory_fails_verification() {
        let argon = Argon::new(small_config()).unwrap();
        let hash = argon.make("secret").unwrap();
        let huge = hash.replacen("m=256", "m=4294967295", 1);

        assert!(argon.is_valid_hash(&huge));
        assert!(!argon.verify(&huge, "secret"));
        assert!(matches!(
            argon.try_verify(&huge, "secret"),
            Err(Error::Kdf(_))
        ));
    }

    #[test]
    fn test_embedded_memory_up_to_limit_verifies() {
        let argon = Argon::new(ArgonConfig {
            max_memory: 256,
            ..small_config()
        })
        .unwrap();
        let hash = argon.make("secret").unwrap();
        assert!(argon.verify(&hash, "secret"));

        let larger = Argon::new(ArgonConfig {
            memory: 512,
            ..small_config()
        })
        .unwrap()
        .make("secret")
        .unwrap();
        assert!(!argon.verify(&larger, "secret"));
    }

    #[test]
    fn test_context_is_bound_once() {
        let argon = Argon::new(small_config()).unwrap();
        assert!(argon.context.get().is_none());

        argon.make("a").unwrap();
        let first = argon.context.get().unwrap() as *const _;
        argon.make("b").unwrap();
        assert_eq!(first, argon.context.get().unwrap() as *const _);
    }

    #[test]
    fn test_needs_rehash_rejects_other_algorithms() {
        let argon = Argon::new(small_config()).unwrap();
        let err = argon
            .needs_rehash("$bcrypt$v=98$r=10$Jtxi46WJ26OQ0khsYLLlnw$knXGfuRFsSjXdj88JydPOnUIglvm1S8")
            .unwrap_err();
        assert!(matches!(err, Error::AlgorithmMismatch { .. }));
    }
}
