//! Default configuration values

/// Default driver scheme
pub const DRIVER: &str = "mysql";

/// Default server host
pub const HOST: &str = "127.0.0.1";

/// Default server port (MySQL)
pub const PORT: u16 = 3306;

/// Prefix for environment variable overrides (`SQLKIT_HOST`, ...)
pub const ENV_PREFIX: &str = "SQLKIT";

/// Config file looked up when no path is given (`sqlkit.toml`, ...)
pub const FILE_NAME: &str = "sqlkit";
