//! 哈希管理器
//!
//! [`HashManager`] 根据配置按名称创建并缓存 [`Hash`] 实例，支持：
//!
//! - 按名称或默认 hasher 取用 (`use_hasher`)
//! - 测试用的 fake 模式 (`fake` / `restore`)
//! - 运行时注册自定义驱动 (`extend`)
//!
//! ## 使用示例
//!
#![cfg_attr(feature = "bcrypt", doc = "```rust")]
#![cfg_attr(not(feature = "bcrypt"), doc = "```rust,ignore")]
//! use hashrs::{HashManager, HashManagerConfig, HasherConfig};
//!
//! let manager = HashManager::new(
//!     HashManagerConfig::new()
//!         .with_default("bcrypt")
//!         .with_hasher("bcrypt", HasherConfig::new("bcrypt").with_option("rounds", 4)),
//! );
//!
//! let hashed = manager.make("secret").unwrap();
//! assert!(manager.verify(&hashed, "secret").unwrap());
//!
//! // 测试中关闭哈希
//! manager.fake();
//! assert_eq!(manager.make("secret").unwrap(), "secret");
//! manager.restore();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::config::{HashManagerConfig, HasherConfig};
use crate::drivers::{Fake, HashDriver};
use crate::error::{ConfigError, Result};
use crate::events::{HashEvent, HashEventKind, HashEventSink, NoOpEventSink};
use crate::hash::Hash;

/// 驱动工厂：根据 hasher 配置创建 [`Hash`]
///
/// 工厂可以通过管理器取用其他名称的 hasher，但不能取用正在创建的同一名称。
pub type DriverFactory = Arc<dyn Fn(&HasherConfig) -> Result<Hash> + Send + Sync>;

/// 每个 hasher 名称一个槽位，创建期间只锁住该槽位
type Slot = Arc<Mutex<Option<Hash>>>;

/// 哈希管理器
///
/// 同一个 hasher 名称最多只会创建一个实例，即使多个线程同时首次访问。
pub struct HashManager {
    config: HashManagerConfig,
    drivers: RwLock<HashMap<String, DriverFactory>>,
    cache: RwLock<HashMap<String, Slot>>,
    fake: RwLock<Option<Hash>>,
    sink: Arc<dyn HashEventSink>,
}

impl HashManager {
    /// 创建管理器，注册内置驱动
    pub fn new(config: HashManagerConfig) -> Self {
        log::debug!(
            "creating hash manager. default: {:?}, hashers: {:?}",
            config.default,
            config.list.keys().collect::<Vec<_>>()
        );

        Self {
            config,
            drivers: RwLock::new(builtin_drivers()),
            cache: RwLock::new(HashMap::new()),
            fake: RwLock::new(None),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// 设置事件接收器
    pub fn with_event_sink(mut self, sink: Arc<dyn HashEventSink>) -> Self {
        self.sink = sink;
        self.sink.record(
            HashEvent::new(HashEventKind::ManagerCreated)
                .with_detail("hashers", self.config.list.len().to_string()),
        );
        self
    }

    /// 当前配置
    pub fn config(&self) -> &HashManagerConfig {
        &self.config
    }

    /// 取用指定名称的 hasher，`None` 表示默认 hasher
    ///
    /// fake 模式下总是返回 fake hasher。
    pub fn use_hasher(&self, name: Option<&str>) -> Result<Hash> {
        let name = name
            .or(self.config.default.as_deref())
            .ok_or(ConfigError::MissingDefault)?;

        if let Some(fake) = self.fake.read().unwrap_or_else(PoisonError::into_inner).clone() {
            return Ok(fake);
        }

        if let Some(hash) = self.cached(name) {
            log::debug!("using hasher from cache. name: {:?}", name);
            self.sink
                .record(HashEvent::new(HashEventKind::HasherReused).with_hasher(name));
            return Ok(hash);
        }

        let hasher_config = self
            .config
            .list
            .get(name)
            .ok_or_else(|| ConfigError::UnknownHasher(name.to_string()))?;
        let factory = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&hasher_config.driver)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownDriver(hasher_config.driver.clone()))?;

        let slot = self.slot(name);
        let mut instance = slot.lock().unwrap_or_else(PoisonError::into_inner);
        // 等待槽位期间可能已被其他线程创建
        if let Some(hash) = instance.as_ref() {
            return Ok(hash.clone());
        }

        log::debug!(
            "creating hash driver. name: {:?}, driver: {:?}",
            name,
            hasher_config.driver
        );
        let hash = factory(hasher_config)?;
        *instance = Some(hash.clone());
        drop(instance);

        self.sink.record(
            HashEvent::new(HashEventKind::HasherCreated)
                .with_hasher(name)
                .with_driver(&hasher_config.driver),
        );
        Ok(hash)
    }

    /// 取用默认 hasher
    pub fn default_hasher(&self) -> Result<Hash> {
        self.use_hasher(None)
    }

    /// 启用 fake 模式，重复调用无副作用
    pub fn fake(&self) {
        log::debug!("enabling fakes");

        let mut fake = self.fake.write().unwrap_or_else(PoisonError::into_inner);
        if fake.is_none() {
            *fake = Some(Hash::new(Fake));
        }
        drop(fake);

        self.sink.record(HashEvent::new(HashEventKind::FakeEnabled));
    }

    /// 恢复真实驱动
    pub fn restore(&self) {
        log::debug!("restoring fakes");

        self.fake
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        self.sink.record(HashEvent::new(HashEventKind::FakeRestored));
    }

    /// 是否处于 fake 模式
    pub fn is_faked(&self) -> bool {
        self.fake
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// 注册自定义驱动，同名驱动会被替换
    ///
    /// 已缓存的 hasher 不受影响。
    ///
    /// ```rust
    /// use hashrs::{HashManager, HashManagerConfig, HasherConfig};
    /// use hashrs::drivers::Fake;
    ///
    /// let manager = HashManager::new(
    ///     HashManagerConfig::new()
    ///         .with_default("plain")
    ///         .with_hasher("plain", HasherConfig::new("plain")),
    /// );
    /// manager.extend("plain", |_config| Ok(Fake));
    ///
    /// assert_eq!(manager.make("secret").unwrap(), "secret");
    /// ```
    pub fn extend<F, D>(&self, driver: impl Into<String>, factory: F)
    where
        F: Fn(&HasherConfig) -> Result<D> + Send + Sync + 'static,
        D: HashDriver + 'static,
    {
        let driver = driver.into();
        log::debug!("adding custom driver {}", driver);

        let factory: DriverFactory =
            Arc::new(move |config: &HasherConfig| -> Result<Hash> { factory(config).map(Hash::new) });
        self.drivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(driver.clone(), factory);

        self.sink
            .record(HashEvent::new(HashEventKind::DriverExtended).with_driver(driver));
    }

    /// 使用默认 hasher 检查哈希格式
    pub fn is_valid_hash(&self, value: &str) -> Result<bool> {
        Ok(self.default_hasher()?.is_valid_hash(value))
    }

    /// 使用默认 hasher 哈希明文
    pub fn make(&self, value: &str) -> Result<String> {
        self.default_hasher()?.make(value)
    }

    /// 使用默认 hasher 校验明文
    pub fn verify(&self, hashed_value: &str, plain_value: &str) -> Result<bool> {
        Ok(self.default_hasher()?.verify(hashed_value, plain_value))
    }

    /// 使用默认 hasher 判断是否需要 rehash
    pub fn needs_rehash(&self, hashed_value: &str) -> Result<bool> {
        self.default_hasher()?.needs_rehash(hashed_value)
    }

    fn cached(&self, name: &str) -> Option<Hash> {
        let slot = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;
        let instance = slot.lock().unwrap_or_else(PoisonError::into_inner);
        instance.clone()
    }

    fn slot(&self, name: &str) -> Slot {
        if let Some(slot) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return slot.clone();
        }
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .clone()
    }
}

impl fmt::Debug for HashManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let drivers = self.drivers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&String> = drivers.keys().collect();
        names.sort();

        f.debug_struct("HashManager")
            .field("config", &self.config)
            .field("drivers", &names)
            .field("faked", &self.is_faked())
            .finish_non_exhaustive()
    }
}

fn builtin_drivers() -> HashMap<String, DriverFactory> {
    let mut drivers: HashMap<String, DriverFactory> = HashMap::new();

    #[cfg(feature = "argon2")]
    drivers.insert(
        "argon2".to_string(),
        Arc::new(|config: &HasherConfig| -> Result<Hash> {
            Ok(Hash::new(crate::drivers::Argon::new(config.parse_options()?)?))
        }),
    );
    #[cfg(feature = "bcrypt")]
    drivers.insert(
        "bcrypt".to_string(),
        Arc::new(|config: &HasherConfig| -> Result<Hash> {
            Ok(Hash::new(crate::drivers::Bcrypt::new(config.parse_options()?)?))
        }),
    );
    #[cfg(feature = "scrypt")]
    drivers.insert(
        "scrypt".to_string(),
        Arc::new(|config: &HasherConfig| -> Result<Hash> {
            Ok(Hash::new(crate::drivers::Scrypt::new(config.parse_options()?)?))
        }),
    );

    drivers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::events::InMemoryEventSink;

    fn plain_manager() -> HashManager {
        let manager = HashManager::new(
            HashManagerConfig::new()
                .with_default("plain")
                .with_hasher("plain", HasherConfig::new("plain"))
                .with_hasher("other", HasherConfig::new("plain")),
        );
        manager.extend("plain", |_config| Ok(Fake));
        manager
    }

    #[test]
    fn test_missing_default() {
        let manager = HashManager::new(HashManagerConfig::new());
        let err = manager.use_hasher(None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot create hash instance. No default hasher is defined in the config"
        );
    }

    #[test]
    fn test_unknown_hasher() {
        let manager = plain_manager();
        assert_eq!(
            manager.use_hasher(Some("missing")).unwrap_err(),
            Error::Config(ConfigError::UnknownHasher("missing".to_string()))
        );
    }

    #[test]
    fn test_unknown_driver() {
        let manager = HashManager::new(
            HashManagerConfig::new()
                .with_default("pbkdf")
                .with_hasher("pbkdf", HasherConfig::new("pbkdf2")),
        );
        assert_eq!(
            manager.default_hasher().unwrap_err().to_string(),
            "Unknown hash driver \"pbkdf2\". Make sure the driver is registered with HashManager"
        );
    }

    #[test]
    fn test_cache_per_hasher_name() {
        let manager = plain_manager();

        let first = manager.use_hasher(Some("plain")).unwrap();
        let second = manager.default_hasher().unwrap();
        let other = manager.use_hasher(Some("other")).unwrap();

        assert!(first.ptr_eq(&second));
        assert!(!first.ptr_eq(&other));
    }

    #[test]
    fn test_fake_and_restore() {
        let manager = plain_manager();
        let real = manager.default_hasher().unwrap();

        manager.fake();
        manager.fake();
        assert!(manager.is_faked());
        let fake = manager.default_hasher().unwrap();
        assert!(!fake.ptr_eq(&real));
        assert!(fake.ptr_eq(&manager.use_hasher(Some("other")).unwrap()));

        manager.restore();
        assert!(!manager.is_faked());
        assert!(manager.default_hasher().unwrap().ptr_eq(&real));
    }

    #[test]
    fn test_fake_still_requires_name() {
        let manager = HashManager::new(HashManagerConfig::new());
        manager.fake();
        assert!(matches!(
            manager.make("secret"),
            Err(Error::Config(ConfigError::MissingDefault))
        ));
    }

    #[test]
    fn test_invalid_options_fail_on_use() {
        let manager = HashManager::new(
            HashManagerConfig::new()
                .with_default("bcrypt")
                .with_hasher("bcrypt", HasherConfig::new("bcrypt").with_option("rounds", 2)),
        );
        let err = manager.default_hasher().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::OutOfRange { .. })));
        // 失败的构造不会被缓存
        assert!(manager.cached("bcrypt").is_none());
    }

    /// 给内层 hasher 的结果加前缀
    struct Prefixed(Hash);

    impl HashDriver for Prefixed {
        fn is_valid_hash(&self, value: &str) -> bool {
            value.strip_prefix("p:").is_some_and(|v| self.0.is_valid_hash(v))
        }

        fn make(&self, value: &str) -> Result<String> {
            Ok(format!("p:{}", self.0.make(value)?))
        }

        fn verify(&self, hashed_value: &str, plain_value: &str) -> bool {
            hashed_value
                .strip_prefix("p:")
                .is_some_and(|v| self.0.verify(v, plain_value))
        }

        fn needs_rehash(&self, hashed_value: &str) -> Result<bool> {
            self.0.needs_rehash(hashed_value.trim_start_matches("p:"))
        }
    }

    #[test]
    fn test_factory_can_use_other_hashers() {
        let manager = Arc::new(HashManager::new(
            HashManagerConfig::new()
                .with_default("outer")
                .with_hasher("outer", HasherConfig::new("wrapper"))
                .with_hasher("inner", HasherConfig::new("plain")),
        ));
        manager.extend("plain", |_config| Ok(Fake));

        let weak = Arc::downgrade(&manager);
        manager.extend("wrapper", move |_config| {
            let manager = weak.upgrade().expect("manager is alive");
            Ok(Prefixed(manager.use_hasher(Some("inner"))?))
        });

        let outer = manager.default_hasher().unwrap();
        let inner = manager.use_hasher(Some("inner")).unwrap();
        assert_eq!(outer.make("secret").unwrap(), "p:secret");
        assert!(outer.verify("p:secret", "secret"));
        assert!(manager.cached("inner").is_some_and(|h| h.ptr_eq(&inner)));
    }

    #[test]
    fn test_events_are_recorded() {
        let sink = Arc::new(InMemoryEventSink::new());
        let manager = plain_manager().with_event_sink(sink.clone());

        manager.default_hasher().unwrap();
        manager.default_hasher().unwrap();
        manager.fake();
        manager.restore();

        let kinds: Vec<HashEventKind> = sink.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                HashEventKind::ManagerCreated,
                HashEventKind::HasherCreated,
                HashEventKind::HasherReused,
                HashEventKind::FakeEnabled,
                HashEventKind::FakeRestored,
            ]
        );

        let created = &sink.events_by_kind(HashEventKind::HasherCreated)[0];
        assert_eq!(created.hasher.as_deref(), Some("plain"));
        assert_eq!(created.driver.as_deref(), Some("plain"));
    }

    #[test]
    fn test_debug_lists_drivers() {
        let manager = plain_manager();
        let debug = format!("{:?}", manager);
        assert!(debug.contains("\"plain\""));
        assert!(debug.contains("faked: false"));
    }
}
