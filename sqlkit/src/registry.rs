//! Driver registry: scheme name to handle factory

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, Once, PoisonError};

use crate::error::{Error, Result};
use crate::handle::Handle;
use tracing::{debug, info};

/// Separator between the scheme and the driver-specific rest of a
/// connection string.
pub const SCHEME_SEPARATOR: &str = "://";

/// A factory that opens handles for one scheme.
///
/// `create` receives the connection string with the `scheme://` prefix
/// removed. Closures of the right shape are drivers too:
///
/// ```ignore
/// registry.register("fake", |rest: &str| Ok(Handle::new(FakeBackend::new(rest))));
/// ```
pub trait Driver: Send + Sync + 'static {
    /// Open a handle from the driver-specific part of a connection string.
    fn create(&self, rest: &str) -> Result<Handle>;
}

impl<F> Driver for F
where
    F: Fn(&str) -> Result<Handle> + Send + Sync + 'static,
{
    fn create(&self, rest: &str) -> Result<Handle> {
        self(rest)
    }
}

/// Scheme-to-driver table.
///
/// Entries are write-once: a scheme can be registered a single time and is
/// never removed.
#[derive(Default)]
pub struct Registry {
    drivers: Mutex<HashMap<String, Arc<dyn Driver>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn drivers(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn Driver>>> {
        // The map is only ever inserted into, so a panicked writer cannot
        // leave it half-updated.
        self.drivers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `driver` under `scheme`, failing with
    /// [`Error::DuplicateDriver`] if the scheme is taken.
    pub fn try_register(&self, scheme: &str, driver: impl Driver) -> Result<()> {
        let mut drivers = self.drivers();
        if drivers.contains_key(scheme) {
            return Err(Error::DuplicateDriver(scheme.to_string()));
        }
        drivers.insert(scheme.to_string(), Arc::new(driver));
        info!(scheme, "registered database driver");
        Ok(())
    }

    /// Register `driver` under `scheme`.
    ///
    /// # Panics
    ///
    /// Panics if the scheme is already registered. Registration happens at
    /// startup and a collision is a configuration bug.
    pub fn register(&self, scheme: &str, driver: impl Driver) {
        if let Err(e) = self.try_register(scheme, driver) {
            panic!("{}", e);
        }
    }

    /// Whether a driver is registered under `scheme`.
    pub fn contains(&self, scheme: &str) -> bool {
        self.drivers().contains_key(scheme)
    }

    /// Registered scheme names, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.drivers().keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Open a handle from a `scheme://rest` connection string.
    ///
    /// The string is split once, on the first `://`. Whatever the driver
    /// returns is passed through.
    pub fn open(&self, connection_string: &str) -> Result<Handle> {
        let (scheme, rest) = connection_string
            .split_once(SCHEME_SEPARATOR)
            .ok_or_else(|| Error::InvalidConnectionString(redact(connection_string)))?;

        // Release the lock before the driver runs; drivers may be slow.
        let driver = self
            .drivers()
            .get(scheme)
            .cloned()
            .ok_or_else(|| Error::UnknownDriver(scheme.to_string()))?;

        debug!(scheme, "opening handle");
        driver.create(rest)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

/// Connection strings routinely carry passwords; drop everything before the
/// last `@` when echoing one back in an error.
fn redact(connection_string: &str) -> String {
    match connection_string.rsplit_once('@') {
        Some((_, host)) => format!("***@{}", host),
        None => connection_string.to_string(),
    }
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// The process-wide registry used by [`register`] and [`open`].
pub fn global() -> &'static Registry {
    &GLOBAL
}

/// Register a driver in the process-wide registry.
///
/// # Panics
///
/// Panics if the scheme is already registered.
pub fn register(scheme: &str, driver: impl Driver) {
    GLOBAL.register(scheme, driver);
}

/// Open a handle through the process-wide registry.
pub fn open(connection_string: &str) -> Result<Handle> {
    GLOBAL.open(connection_string)
}

/// Register every compiled-in driver in the process-wide registry.
///
/// Safe to call any number of times; only the first call registers.
pub fn register_default_drivers() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        #[cfg(feature = "mysql")]
        register(crate::backend::mysql::SCHEME, crate::backend::mysql::MySqlDriver);
        #[cfg(feature = "sqlite")]
        register(crate::backend::sqlite::SCHEME, crate::backend::sqlite::SqliteDriver);
    });
}
