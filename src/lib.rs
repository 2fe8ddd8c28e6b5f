//! # HashRS
//!
//! 基于 PHC 字符串格式的密码哈希库。
//!
//! ## 功能特性
//!
//! - **多种算法**: Argon2 (`argon2d` / `argon2i` / `argon2id`)、bcrypt、scrypt
//! - **PHC 格式**: 哈希自带算法、版本与参数，校验时使用哈希中的参数
//! - **Rehash 检测**: 配置变化后识别需要重新生成的旧哈希
//! - **传统 bcrypt**: 兼容 `$2a$` / `$2b$` 格式的旧哈希
//! - **哈希管理器**: 按名称配置多个 hasher，支持 fake 模式与自定义驱动
//!
//! ## Features
//!
//! - `argon2` - 启用 Argon2 驱动（默认启用）
//! - `bcrypt` - 启用 bcrypt 驱动（默认启用）
//! - `scrypt` - 启用 scrypt 驱动（默认启用）
//! - `full` - 启用所有功能
//!
//! 至少需要启用一个算法。
//!
//! ## 直接使用驱动
//!
#![cfg_attr(feature = "argon2", doc = "```rust")]
#![cfg_attr(not(feature = "argon2"), doc = "```rust,ignore")]
//! use hashrs::Hash;
//! use hashrs::drivers::{Argon, ArgonConfig};
//!
//! let hash = Hash::new(Argon::new(ArgonConfig {
//!     memory: 4096,
//!     parallelism: 1,
//!     ..Default::default()
//! }).unwrap());
//!
//! let hashed = hash.make("my_secure_password").unwrap();
//! assert!(hash.verify(&hashed, "my_secure_password"));
//! assert!(!hash.needs_rehash(&hashed).unwrap());
//! ```
//!
//! ## 哈希管理器
//!
#![cfg_attr(feature = "scrypt", doc = "```rust")]
#![cfg_attr(not(feature = "scrypt"), doc = "```rust,ignore")]
//! use hashrs::{define_config, HashManager, HashManagerConfig, HasherConfig};
//!
//! let config: HashManagerConfig = serde_json::from_str(r#"{
//!     "default": "scrypt",
//!     "list": {
//!         "scrypt": { "driver": "scrypt", "cost": 1024 }
//!     }
//! }"#).unwrap();
//!
//! let manager = HashManager::new(define_config(config).unwrap());
//! let hashed = manager.make("secret").unwrap();
//!
//! assert!(hashed.starts_with("$scrypt$n=1024,r=8,p=1$"));
//! assert!(manager.verify(&hashed, "secret").unwrap());
//! ```

pub mod bcrypt_base64;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod hash;
pub mod manager;
pub mod phc;
pub mod random;
pub mod validators;

pub use error::{Error, Result};

// ============================================================================
// 门面与管理器导出
// ============================================================================

pub use config::{HashManagerConfig, HasherConfig, define_config};
pub use hash::Hash;
pub use manager::{DriverFactory, HashManager};

// ============================================================================
// 驱动导出
// ============================================================================

pub use drivers::{Fake, HashDriver};
#[cfg(feature = "argon2")]
pub use drivers::{Argon, ArgonConfig, ArgonVariant};
#[cfg(feature = "bcrypt")]
pub use drivers::{Bcrypt, BcryptConfig};
#[cfg(feature = "scrypt")]
pub use drivers::{Scrypt, ScryptConfig};

// ============================================================================
// 编解码与工具函数导出
// ============================================================================

pub use phc::{PhcNode, PhcOptions, PhcParams};
pub use random::{constant_time_compare, generate_random_bytes};
