//! 统一错误类型模块
//!
//! 提供 hashrs 库中所有操作的错误类型定义。
//!
//! 注意：`verify` / `is_valid_hash` 面向不可信输入，任何错误都会被折叠为
//! `false`，调用方永远不会从这两个方法中拿到错误原因。

use std::fmt;

/// hashrs 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// hashrs 库的错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// 配置错误（驱动配置越界、管理器配置缺失等）
    Config(ConfigError),

    /// PHC 字符串格式错误
    Format(FormatError),

    /// PHC 字符串序列化失败
    Encoding(String),

    /// 哈希的算法标识不属于当前驱动
    AlgorithmMismatch {
        /// 当前驱动的算法族
        expected: String,
        /// 哈希中携带的 id
        found: String,
    },

    /// 底层 KDF 原语失败
    Kdf(String),

    /// PHC 字符串可以解析，但未通过驱动的语义校验
    InvalidHash(String),

    /// 加密相关错误
    Crypto(CryptoError),

    /// 断言失败（`assert_equals` / `assert_not_equals`）
    Assertion(String),
}

impl Error {
    /// 创建一个 KDF 错误
    pub fn kdf(msg: impl fmt::Display) -> Self {
        Error::Kdf(msg.to_string())
    }

    /// 创建一个哈希校验错误
    pub fn invalid_hash(msg: impl fmt::Display) -> Self {
        Error::InvalidHash(msg.to_string())
    }

    /// 创建一个算法不匹配错误
    pub fn algorithm_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::AlgorithmMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 数值不在允许的范围内
    OutOfRange { label: String, min: u64, max: u64 },
    /// 数值不在允许的枚举值中
    NotAllowed { label: String, allowed: Vec<String> },
    /// 没有指定 hasher 且没有配置默认 hasher
    MissingDefault,
    /// 列表非空但缺少 default
    MissingDefaultInList,
    /// default 指向的 hasher 不在列表中
    DefaultNotInList(String),
    /// 列表中没有该 hasher
    UnknownHasher(String),
    /// 驱动没有注册
    UnknownDriver(String),
    /// 驱动选项无法解析
    InvalidOptions { driver: String, message: String },
}

/// PHC 字符串格式错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// 首字符不是 `$`
    MissingLeadingDollar,
    /// 字段数量过多
    TooManyFields { found: usize, max: usize },
    /// 无效的算法 id
    InvalidId(String),
    /// 无效的版本号
    InvalidVersion(String),
    /// 无效的参数段
    InvalidParams(String),
    /// salt / hash 不是合法的 base64
    InvalidBase64(&'static str),
    /// 无法识别的字段
    UnrecognizedFields(String),
}

/// 加密相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// 随机数生成失败
    RngFailed(String),
}

// ============================================================================
// Display 实现
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "{}", e),
            Error::Format(e) => write!(f, "{}", e),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Error::AlgorithmMismatch { expected, found } => {
                write!(f, "Value is not a valid {} hash (found \"{}\")", expected, found)
            }
            Error::Kdf(msg) => write!(f, "Key derivation failed: {}", msg),
            Error::InvalidHash(msg) => write!(f, "Invalid hash: {}", msg),
            Error::Crypto(e) => write!(f, "Crypto error: {}", e),
            Error::Assertion(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::OutOfRange { label, min, max } => write!(
                f,
                "The \"{}\" option must be in the range ({} <= {} <= {})",
                label, min, label, max
            ),
            ConfigError::NotAllowed { label, allowed } => write!(
                f,
                "The \"{}\" option must be one of: {}",
                label,
                allowed.join(",")
            ),
            ConfigError::MissingDefault => write!(
                f,
                "Cannot create hash instance. No default hasher is defined in the config"
            ),
            ConfigError::MissingDefaultInList => write!(
                f,
                "Missing \"default\" property in hash config. Specify a default hasher"
            ),
            ConfigError::DefaultNotInList(name) => write!(
                f,
                "Missing \"list.{}\". It is referenced by the \"default\" property",
                name
            ),
            ConfigError::UnknownHasher(name) => write!(
                f,
                "Unknown hasher \"{}\". Make sure it is defined in the hash config list",
                name
            ),
            ConfigError::UnknownDriver(name) => write!(
                f,
                "Unknown hash driver \"{}\". Make sure the driver is registered with HashManager",
                name
            ),
            ConfigError::InvalidOptions { driver, message } => {
                write!(f, "Invalid options for hash driver \"{}\": {}", driver, message)
            }
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::MissingLeadingDollar => write!(f, "pchstr must contain a $ as first char"),
            FormatError::TooManyFields { found, max } => {
                write!(f, "pchstr contains too many fields: {}/{}", found, max)
            }
            FormatError::InvalidId(id) => {
                write!(f, "id must satisfy ^[a-z0-9-]{{1,32}}$, got \"{}\"", id)
            }
            FormatError::InvalidVersion(v) => write!(f, "invalid version segment: {}", v),
            FormatError::InvalidParams(msg) => write!(f, "invalid params segment: {}", msg),
            FormatError::InvalidBase64(field) => write!(f, "{} is not valid base64", field),
            FormatError::UnrecognizedFields(fields) => {
                write!(f, "pchstr has unrecognized fields: {}", fields)
            }
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::RngFailed(msg) => write!(f, "random number generation failed: {}", msg),
        }
    }
}

// ============================================================================
// std::error::Error 实现
// ============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Format(e) => Some(e),
            Error::Crypto(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for FormatError {}
impl std::error::Error for CryptoError {}

// ============================================================================
// From 实现
// ============================================================================

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Self {
        Error::Format(err)
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        Error::Crypto(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_error_display() {
        let err = ConfigError::OutOfRange {
            label: "rounds".to_string(),
            min: 4,
            max: 31,
        };
        assert_eq!(
            err.to_string(),
            "The \"rounds\" option must be in the range (4 <= rounds <= 31)"
        );
    }

    #[test]
    fn test_enum_error_display() {
        let err = ConfigError::NotAllowed {
            label: "version".to_string(),
            allowed: vec!["97".to_string(), "98".to_string()],
        };
        assert_eq!(err.to_string(), "The \"version\" option must be one of: 97,98");
    }

    #[test]
    fn test_format_error_display() {
        let err: Error = FormatError::MissingLeadingDollar.into();
        assert_eq!(err.to_string(), "pchstr must contain a $ as first char");
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_unknown_driver_display() {
        let err: Error = ConfigError::UnknownDriver("pdkf".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Unknown hash driver \"pdkf\". Make sure the driver is registered with HashManager"
        );
    }

    #[test]
    fn test_algorithm_mismatch_display() {
        let err = Error::algorithm_mismatch("scrypt", "bcrypt");
        assert_eq!(
            err.to_string(),
            "Value is not a valid scrypt hash (found \"bcrypt\")"
        );
    }
}
