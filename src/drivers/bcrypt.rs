//! Bcrypt 驱动
//!
//! 新生成的哈希使用 PHC 格式：
//!
//! ```text
//! $bcrypt$v=98$r=10$Jtxi46WJ26OQ0khsYLLlnw$knXGfuRFsSjXdj88JydPOnUIglvm1S8
//! ```
//!
//! 同时兼容传统的 MCF 格式 (`$2a$` / `$2b$`)，这类哈希可以校验，但总是需要 rehash。

use bcrypt::Version;
use serde::{Deserialize, Serialize};

use super::{HashDriver, required_bytes, required_param};
use crate::bcrypt_base64;
use crate::error::{Error, Result};
use crate::phc::{self, PhcOptions, PhcParams};
use crate::random::{constant_time_compare, generate_random_bytes};
use crate::validators::{validate_enum, validate_range};

/// PHC id
const ID: &str = "bcrypt";

/// 支持的版本：`a` (0x61) 与 `b` (0x62)
const VERSIONS: [u32; 2] = [0x61, 0x62];

/// 没有版本号的旧哈希按 `2a` 处理
const LEGACY_VERSION: u32 = 0x61;

/// bcrypt 原语使用的 salt 字节数
const BCRYPT_SALT_LEN: usize = 16;

/// MCF 中 salt 与摘要部分的字符数 (22 + 31)
const MCF_PAYLOAD_LEN: usize = 53;

/// Bcrypt 配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BcryptConfig {
    /// 成本因子 (4..=31)，默认 10
    pub rounds: u32,
    /// 自动生成的 salt 字节数，默认 16
    pub salt_size: usize,
    /// 版本，`0x61` 或 `0x62`，默认 `0x62`
    pub version: u32,
}

impl Default for BcryptConfig {
    fn default() -> Self {
        Self {
            rounds: 10,
            salt_size: 16,
            version: 0x62,
        }
    }
}

impl BcryptConfig {
    fn validate(&self) -> Result<()> {
        validate_range("rounds", self.rounds.into(), 4, 31)?;
        validate_range("saltSize", self.salt_size as u64, 8, 1024)?;
        validate_enum("version", &self.version, &VERSIONS)?;
        Ok(())
    }
}

struct BcryptHash {
    version: u32,
    rounds: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

/// Bcrypt 哈希驱动
#[derive(Debug, Clone)]
pub struct Bcrypt {
    config: BcryptConfig,
}

impl Bcrypt {
    /// 创建驱动，配置非法时立即失败
    pub fn new(config: BcryptConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 当前配置
    pub fn config(&self) -> &BcryptConfig {
        &self.config
    }

    fn validate_phc_string(&self, phc_string: &str) -> Result<BcryptHash> {
        let node = phc::deserialize(phc_string)?;

        // 旧版 bcrypt 字符串没有版本号
        let version = node.version.unwrap_or(LEGACY_VERSION);

        if node.id != ID {
            return Err(Error::invalid_hash("Invalid \"id\" found in the phc string"));
        }
        let params = node
            .params
            .ok_or_else(|| Error::invalid_hash("No \"params\" found in the phc string"))?;
        let salt = required_bytes(node.salt, "salt")?;
        let hash = required_bytes(node.hash, "hash")?;
        validate_range("salt.byteLength", salt.len() as u64, 8, 1024).map_err(Error::invalid_hash)?;

        validate_enum("version", &version, &VERSIONS).map_err(Error::invalid_hash)?;
        let rounds = required_param(&params, "r")?;
        validate_range("r", rounds, 4, 31).map_err(Error::invalid_hash)?;

        Ok(BcryptHash {
            version,
            rounds: rounds as u32,
            salt,
            hash,
        })
    }

    fn try_verify(&self, hashed_value: &str, plain_value: &str) -> Result<bool> {
        let parsed = self.validate_phc_string(hashed_value)?;
        let computed = digest(plain_value, &parsed.salt, parsed.version, parsed.rounds)?;
        Ok(constant_time_compare(&computed, &parsed.hash))
    }
}

impl HashDriver for Bcrypt {
    fn is_valid_hash(&self, value: &str) -> bool {
        is_mcf_hash(value) || self.validate_phc_string(value).is_ok()
    }

    fn make(&self, value: &str) -> Result<String> {
        let salt = generate_random_bytes(self.config.salt_size)?;
        let hash = digest(value, &salt, self.config.version, self.config.rounds)?;

        let options = PhcOptions::new(ID)
            .with_version(self.config.version)
            .with_params(PhcParams::new().with("r", self.config.rounds.into()));
        phc::serialize(&salt, &hash, &options)
    }

    fn verify(&self, hashed_value: &str, plain_value: &str) -> bool {
        if is_mcf_prefixed(hashed_value) {
            return bcrypt::verify(plain_value, hashed_value).unwrap_or(false);
        }
        self.try_verify(hashed_value, plain_value).unwrap_or(false)
    }

    /// 以下情况需要 rehash：
    ///
    /// 1. 哈希使用 MCF 格式
    /// 2. 版本不同
    /// 3. 缺少参数或 `r` 不同
    fn needs_rehash(&self, hashed_value: &str) -> Result<bool> {
        if is_mcf_prefixed(hashed_value) {
            return Ok(true);
        }

        let node = phc::deserialize(hashed_value)?;
        if node.id != ID {
            return Err(Error::algorithm_mismatch(ID, node.id));
        }

        if node.version != Some(self.config.version) {
            return Ok(true);
        }

        let Some(params) = node.params else {
            return Ok(true);
        };
        Ok(params.get("r") != Some(self.config.rounds.into()))
    }
}

/// 计算 bcrypt 摘要（23 字节）
///
/// 原语只使用 salt 的前 16 字节；完整 salt 仍会写入 PHC 字符串。
fn digest(plain_value: &str, salt: &[u8], version: u32, rounds: u32) -> Result<Vec<u8>> {
    let key_salt: [u8; BCRYPT_SALT_LEN] = salt
        .get(..BCRYPT_SALT_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            Error::kdf(format!(
                "bcrypt requires at least {} salt bytes, got {}",
                BCRYPT_SALT_LEN,
                salt.len()
            ))
        })?;

    let bcrypt_version = match version {
        0x61 => Version::TwoA,
        0x62 => Version::TwoB,
        other => return Err(Error::kdf(format!("unsupported bcrypt version {:#x}", other))),
    };
    let bcrypt_salt = mcf_salt(&key_salt, version, rounds);

    let parts = bcrypt::hash_with_salt(plain_value, rounds, key_salt).map_err(Error::kdf)?;
    let formatted = parts.format_for_version(bcrypt_version);
    let encoded = formatted
        .strip_prefix(&bcrypt_salt)
        .ok_or_else(|| Error::kdf("bcrypt output does not start with the generated salt"))?;

    bcrypt_base64::decode(encoded).map_err(Error::kdf)
}

/// `$2b$10$<22 个字符的 salt>`
fn mcf_salt(salt: &[u8], version: u32, rounds: u32) -> String {
    let minor = if version == 0x61 { 'a' } else { 'b' };
    format!("$2{}${:02}${}", minor, rounds, bcrypt_base64::encode(salt))
}

fn is_mcf_prefixed(value: &str) -> bool {
    value.starts_with("$2a") || value.starts_with("$2b")
}

/// 检查 `$2a$NN$<53 个 bcrypt 字符>` 格式
fn is_mcf_hash(value: &str) -> bool {
    let Some(rest) = value
        .strip_prefix("$2a$")
        .or_else(|| value.strip_prefix("$2b$"))
    else {
        return false;
    };
    let Some((rounds, payload)) = rest.split_once('$') else {
        return false;
    };

    let rounds_ok = rounds.len() == 2
        && rounds
            .parse::<u32>()
            .is_ok_and(|r| (4..=31).contains(&r));
    let payload_ok = payload.len() == MCF_PAYLOAD_LEN
        && payload
            .bytes()
            .all(|c| c == b'.' || c == b'/' || c.is_ascii_alphanumeric());

    rounds_ok && payload_ok
}
