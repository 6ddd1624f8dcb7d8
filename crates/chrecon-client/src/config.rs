//! Connection parameters for the database collaborator.

use std::fmt;
use std::time::Duration;

/// Default server address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Default native-protocol port.
pub const DEFAULT_PORT: u16 = 9000;

/// Default login user.
pub const DEFAULT_LOGIN_USER: &str = "default";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection parameters handed to the caller's driver.
///
/// The engine itself never opens a connection; these parameters exist so
/// orchestration code has one canonical place to carry address, TLS mode,
/// and login credentials.
#[derive(Clone)]
pub struct ClientConfig {
    /// Server address (hostname or IP).
    pub address: String,

    /// Server port.
    pub port: u16,

    /// Whether to connect over TLS.
    pub secure: bool,

    /// Login user for the connection.
    pub login_user: String,

    /// Login password for the connection.
    pub login_password: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given address with defaults elsewhere.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_PORT,
            secure: false,
            login_user: DEFAULT_LOGIN_USER.to_string(),
            login_password: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a configuration for localhost on the default port.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }

    /// Set the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable TLS.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the login user.
    pub fn with_login_user(mut self, user: impl Into<String>) -> Self {
        self.login_user = user.into();
        self
    }

    /// Set the login password.
    pub fn with_login_password(mut self, password: impl Into<String>) -> Self {
        self.login_password = password.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

// Manual Debug so the login password never reaches logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("login_user", &self.login_user)
            .field("login_password", &"********")
            .field("timeout", &self.timeout)
            .finish()
    }
}
