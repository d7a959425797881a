//! Namespaced Key/Value Settings and Alert Thresholds
//!
//! Small durable settings live outside the snapshot file, in a namespaced
//! key/value store in the spirit of MCU NVS "preferences": the incubation
//! start epoch under the `timer` namespace, the alert levels under
//! `thresholds`. The [`KvStore`] trait is the seam; firmware backs it with
//! flash preferences, the host build with a tiny JSON file ([`FileKv`]),
//! and tests with [`MemoryKv`].
//!
//! Thresholds are configuration passthrough: they are persisted, exposed,
//! and broadcast to clients, but no alerting logic in this core consumes
//! them. Missing keys fall back to documented defaults and are written back
//! on first boot so the store reflects what clients see.

use crate::constants::{DEFAULT_HUMIDITY_ALERT, DEFAULT_TEMPERATURE_ALERT};

/// Namespace for the incubation timer.
pub const NS_TIMER: &str = "timer";
/// Key for the incubation start epoch (u32, 0 = uninitialized).
pub const KEY_START_TIME: &str = "startTime";

/// Namespace for alert thresholds.
pub const NS_THRESHOLDS: &str = "thresholds";
/// Key for the high-temperature alert level.
pub const KEY_TEMPERATURE_ALERT: &str = "threshold";
/// Key for the low-humidity alert level.
pub const KEY_HUMIDITY_ALERT: &str = "humidity";

/// Namespaced key/value persistence for small settings.
///
/// Reads are infallible by design: an unreadable or absent value is
/// indistinguishable from "never written" and callers fall back to
/// defaults. Writes report their error so callers can log and continue
/// with in-memory state.
pub trait KvStore {
    /// Write-side error; logged, never fatal.
    type Error: core::fmt::Debug;

    /// Read an unsigned value, `None` if absent or unreadable.
    fn get_u32(&self, namespace: &str, key: &str) -> Option<u32>;

    /// Persist an unsigned value.
    fn put_u32(&mut self, namespace: &str, key: &str, value: u32) -> Result<(), Self::Error>;

    /// Read a decimal value, `None` if absent or unreadable.
    fn get_f32(&self, namespace: &str, key: &str) -> Option<f32>;

    /// Persist a decimal value.
    fn put_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), Self::Error>;
}

/// Alert levels shown to clients; passthrough configuration only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// High-temperature alert level (degrees, one decimal).
    pub temperature: f32,
    /// Low-humidity alert level (percent relative humidity).
    pub humidity: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE_ALERT,
            humidity: DEFAULT_HUMIDITY_ALERT,
        }
    }
}

impl Thresholds {
    /// Read both levels, falling back to defaults for missing keys.
    pub fn load<K: KvStore>(kv: &K) -> Self {
        Self {
            temperature: kv
                .get_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT)
                .unwrap_or(DEFAULT_TEMPERATURE_ALERT),
            humidity: kv
                .get_f32(NS_THRESHOLDS, KEY_HUMIDITY_ALERT)
                .unwrap_or(DEFAULT_HUMIDITY_ALERT),
        }
    }

    /// Write back any key the store does not have yet.
    ///
    /// First-boot provisioning: afterwards the store answers reads with the
    /// same values clients were already shown.
    pub fn ensure_persisted<K: KvStore>(&self, kv: &mut K) -> Result<(), K::Error> {
        if kv.get_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT).is_none() {
            kv.put_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT, self.temperature)?;
        }
        if kv.get_f32(NS_THRESHOLDS, KEY_HUMIDITY_ALERT).is_none() {
            kv.put_f32(NS_THRESHOLDS, KEY_HUMIDITY_ALERT, self.humidity)?;
        }
        Ok(())
    }

    /// Persist and adopt a new temperature alert level.
    pub fn set_temperature<K: KvStore>(&mut self, kv: &mut K, value: f32) -> Result<(), K::Error> {
        kv.put_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT, value)?;
        self.temperature = value;
        Ok(())
    }

    /// Persist and adopt a new humidity alert level.
    pub fn set_humidity<K: KvStore>(&mut self, kv: &mut K, value: f32) -> Result<(), K::Error> {
        kv.put_f32(NS_THRESHOLDS, KEY_HUMIDITY_ALERT, value)?;
        self.humidity = value;
        Ok(())
    }
}

#[cfg(feature = "std")]
pub use store_impls::{FileKv, MemoryKv};

#[cfg(feature = "std")]
mod store_impls {
    use super::KvStore;
    use crate::errors::SettingsError;

    use std::collections::HashMap;
    use std::fs;
    use std::io;
    use std::path::PathBuf;

    fn flat_key(namespace: &str, key: &str) -> String {
        format!("{namespace}.{key}")
    }

    /// In-memory store for tests and the simulator's volatile mode.
    ///
    /// Can be told to reject writes, to exercise the "persistence failed,
    /// keep running" paths.
    #[derive(Debug, Default)]
    pub struct MemoryKv {
        values: HashMap<String, f64>,
        fail_writes: bool,
    }

    impl MemoryKv {
        /// Create an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent write fail.
        pub fn fail_writes(&mut self, fail: bool) {
            self.fail_writes = fail;
        }

        fn put(&mut self, namespace: &str, key: &str, value: f64) -> Result<(), SettingsError> {
            if self.fail_writes {
                return Err(SettingsError::Io(io::Error::from(
                    io::ErrorKind::PermissionDenied,
                )));
            }
            self.values.insert(flat_key(namespace, key), value);
            Ok(())
        }
    }

    impl KvStore for MemoryKv {
        type Error = SettingsError;

        fn get_u32(&self, namespace: &str, key: &str) -> Option<u32> {
            let v = *self.values.get(&flat_key(namespace, key))?;
            (v >= 0.0 && v <= f64::from(u32::MAX)).then(|| v as u32)
        }

        fn put_u32(&mut self, namespace: &str, key: &str, value: u32) -> Result<(), SettingsError> {
            self.put(namespace, key, f64::from(value))
        }

        fn get_f32(&self, namespace: &str, key: &str) -> Option<f32> {
            self.values.get(&flat_key(namespace, key)).map(|v| *v as f32)
        }

        fn put_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), SettingsError> {
            self.put(namespace, key, f64::from(value))
        }
    }

    /// JSON-file-backed store for the host build.
    ///
    /// One flat object of `"namespace.key": number` entries, rewritten in
    /// full on every put (the file holds a handful of keys). A missing or
    /// corrupt file opens as empty, matching the snapshot store's
    /// never-fatal posture.
    #[derive(Debug)]
    pub struct FileKv {
        path: PathBuf,
        values: serde_json::Map<String, serde_json::Value>,
    }

    impl FileKv {
        /// Open or create the store at `path`.
        pub fn open(path: impl Into<PathBuf>) -> Self {
            let path = path.into();
            let values = match fs::read(&path) {
                Ok(bytes) if bytes.is_empty() => serde_json::Map::new(),
                Ok(bytes) => match serde_json::from_slice::<serde_json::Value>(&bytes) {
                    Ok(serde_json::Value::Object(map)) => map,
                    Ok(_) | Err(_) => {
                        log::warn!(
                            "settings file {} unreadable, starting empty",
                            path.display()
                        );
                        serde_json::Map::new()
                    }
                },
                Err(_) => serde_json::Map::new(),
            };
            Self { path, values }
        }

        fn flush(&self) -> Result<(), SettingsError> {
            let file = fs::File::create(&self.path)?;
            serde_json::to_writer(file, &serde_json::Value::Object(self.values.clone()))?;
            Ok(())
        }

        fn put_number(
            &mut self,
            namespace: &str,
            key: &str,
            value: serde_json::Number,
        ) -> Result<(), SettingsError> {
            self.values
                .insert(flat_key(namespace, key), serde_json::Value::Number(value));
            self.flush()
        }
    }

    impl KvStore for FileKv {
        type Error = SettingsError;

        fn get_u32(&self, namespace: &str, key: &str) -> Option<u32> {
            let v = self.values.get(&flat_key(namespace, key))?.as_u64()?;
            u32::try_from(v).ok()
        }

        fn put_u32(&mut self, namespace: &str, key: &str, value: u32) -> Result<(), SettingsError> {
            self.put_number(namespace, key, serde_json::Number::from(value))
        }

        fn get_f32(&self, namespace: &str, key: &str) -> Option<f32> {
            self.values
                .get(&flat_key(namespace, key))?
                .as_f64()
                .map(|v| v as f32)
        }

        fn put_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), SettingsError> {
            // Non-finite values cannot be represented in JSON; they collapse
            // to 0, the same junk-in-junk-out the request parser applies.
            let number = serde_json::Number::from_f64(f64::from(value))
                .unwrap_or_else(|| serde_json::Number::from(0));
            self.put_number(namespace, key, number)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "std")]
    mod memory {
        use super::*;

        #[test]
        fn roundtrips_values_per_namespace() {
            let mut kv = MemoryKv::new();
            kv.put_u32(NS_TIMER, KEY_START_TIME, 1_700_000_000).unwrap();
            kv.put_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT, 99.5).unwrap();

            assert_eq!(kv.get_u32(NS_TIMER, KEY_START_TIME), Some(1_700_000_000));
            assert_eq!(kv.get_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT), Some(99.5));
            // Same key name under a different namespace stays distinct
            assert_eq!(kv.get_u32(NS_THRESHOLDS, KEY_START_TIME), None);
        }

        #[test]
        fn write_failure_is_reported() {
            let mut kv = MemoryKv::new();
            kv.fail_writes(true);
            assert!(kv.put_u32(NS_TIMER, KEY_START_TIME, 1).is_err());
            assert_eq!(kv.get_u32(NS_TIMER, KEY_START_TIME), None);
        }
    }

    #[cfg(feature = "std")]
    mod file {
        use super::*;

        #[test]
        fn survives_reopen() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("settings.json");

            {
                let mut kv = FileKv::open(&path);
                kv.put_u32(NS_TIMER, KEY_START_TIME, 1_700_000_000).unwrap();
                kv.put_f32(NS_THRESHOLDS, KEY_HUMIDITY_ALERT, 37.5).unwrap();
            }

            let kv = FileKv::open(&path);
            assert_eq!(kv.get_u32(NS_TIMER, KEY_START_TIME), Some(1_700_000_000));
            assert_eq!(kv.get_f32(NS_THRESHOLDS, KEY_HUMIDITY_ALERT), Some(37.5));
        }

        #[test]
        fn corrupt_file_opens_empty() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("settings.json");
            std::fs::write(&path, b"{ not json").unwrap();

            let kv = FileKv::open(&path);
            assert_eq!(kv.get_u32(NS_TIMER, KEY_START_TIME), None);
        }

        #[test]
        fn missing_file_opens_empty_and_is_created_on_put() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("settings.json");

            let mut kv = FileKv::open(&path);
            assert_eq!(kv.get_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT), None);

            kv.put_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT, 95.0).unwrap();
            assert!(path.exists());
        }
    }

    #[cfg(feature = "std")]
    mod thresholds {
        use super::*;

        #[test]
        fn loads_defaults_when_unset() {
            let kv = MemoryKv::new();
            let t = Thresholds::load(&kv);
            assert_eq!(t.temperature, DEFAULT_TEMPERATURE_ALERT);
            assert_eq!(t.humidity, DEFAULT_HUMIDITY_ALERT);
        }

        #[test]
        fn ensure_persisted_writes_missing_keys_only() {
            let mut kv = MemoryKv::new();
            kv.put_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT, 101.5).unwrap();

            let t = Thresholds::load(&kv);
            assert_eq!(t.temperature, 101.5);
            assert_eq!(t.humidity, DEFAULT_HUMIDITY_ALERT);

            t.ensure_persisted(&mut kv).unwrap();
            assert_eq!(
                kv.get_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT),
                Some(101.5)
            );
            assert_eq!(
                kv.get_f32(NS_THRESHOLDS, KEY_HUMIDITY_ALERT),
                Some(DEFAULT_HUMIDITY_ALERT)
            );
        }

        #[test]
        fn setters_persist_and_adopt() {
            let mut kv = MemoryKv::new();
            let mut t = Thresholds::default();

            t.set_temperature(&mut kv, 100.5).unwrap();
            t.set_humidity(&mut kv, 45.0).unwrap();

            assert_eq!(t.temperature, 100.5);
            assert_eq!(kv.get_f32(NS_THRESHOLDS, KEY_TEMPERATURE_ALERT), Some(100.5));
            assert_eq!(kv.get_f32(NS_THRESHOLDS, KEY_HUMIDITY_ALERT), Some(45.0));
        }

        #[test]
        fn failed_set_leaves_value_unchanged() {
            let mut kv = MemoryKv::new();
            let mut t = Thresholds::default();
            kv.fail_writes(true);

            assert!(t.set_temperature(&mut kv, 100.5).is_err());
            assert_eq!(t.temperature, DEFAULT_TEMPERATURE_ALERT);
        }
    }
}
