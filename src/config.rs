//! 哈希管理器配置
//!
//! 配置由一个默认 hasher 名称和一组命名的 hasher 组成，每个 hasher 指定
//! 驱动名称以及驱动自己的选项：
//!
//! ```json
//! {
//!   "default": "argon",
//!   "list": {
//!     "argon": { "driver": "argon2", "memory": 4096 },
//!     "bcrypt": { "driver": "bcrypt", "rounds": 12 }
//!   }
//! }
//! ```
//!
//! 驱动选项在 hasher 首次使用时由对应的工厂解析并校验。

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// 单个 hasher 的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasherConfig {
    /// 驱动名称，例如 `argon2` / `bcrypt` / `scrypt`
    pub driver: String,
    /// 驱动选项
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl HasherConfig {
    /// 使用默认选项
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            options: Map::new(),
        }
    }

    /// 使用 Argon2 驱动
    #[cfg(feature = "argon2")]
    pub fn argon2(config: crate::drivers::ArgonConfig) -> Self {
        Self::typed("argon2", &config)
    }

    /// 使用 Bcrypt 驱动
    #[cfg(feature = "bcrypt")]
    pub fn bcrypt(config: crate::drivers::BcryptConfig) -> Self {
        Self::typed("bcrypt", &config)
    }

    /// 使用 Scrypt 驱动
    #[cfg(feature = "scrypt")]
    pub fn scrypt(config: crate::drivers::ScryptConfig) -> Self {
        Self::typed("scrypt", &config)
    }

    /// 设置单个选项
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// 将选项解析为驱动的配置类型
    pub fn parse_options<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.options.clone())).map_err(|e| {
            ConfigError::InvalidOptions {
                driver: self.driver.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }

    #[cfg(any(feature = "argon2", feature = "bcrypt", feature = "scrypt"))]
    fn typed<T: Serialize>(driver: &str, config: &T) -> Self {
        // 驱动配置只包含数值与枚举，序列化结果总是对象
        let options = match serde_json::to_value(config) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            driver: driver.to_string(),
            options,
        }
    }
}

/// 哈希管理器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashManagerConfig {
    /// 默认 hasher 名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// 命名的 hasher 列表
    #[serde(default)]
    pub list: BTreeMap<String, HasherConfig>,
}

impl HashManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置默认 hasher
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// 添加 hasher
    pub fn with_hasher(mut self, name: impl Into<String>, config: HasherConfig) -> Self {
        self.list.insert(name.into(), config);
        self
    }
}

/// 校验管理器配置
///
/// - 列表非空时必须指定 `default`
/// - `default` 必须指向列表中的 hasher
///
/// ```rust
/// use hashrs::{define_config, HashManagerConfig, HasherConfig};
///
/// let config = define_config(
///     HashManagerConfig::new()
///         .with_default("bcrypt")
///         .with_hasher("bcrypt", HasherConfig::new("bcrypt")),
/// )
/// .unwrap();
/// assert_eq!(config.default.as_deref(), Some("bcrypt"));
///
/// assert!(define_config(HashManagerConfig::new().with_default("argon")).is_err());
/// ```
pub fn define_config(config: HashManagerConfig) -> Result<HashManagerConfig> {
    match &config.default {
        None if !config.list.is_empty() => Err(ConfigError::MissingDefaultInList.into()),
        Some(name) if !config.list.contains_key(name) => {
            Err(ConfigError::DefaultNotInList(name.clone()).into())
        }
        _ => Ok(config),
    }
}
