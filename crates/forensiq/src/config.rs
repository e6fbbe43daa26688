use crate::client::ApiError;

pub const HOST_ENV: &str = "FORENSIQ_HOST";
pub const CLIENT_KEY_ENV: &str = "FORENSIQ_CLIENT_KEY";

/// Settings for talking to the Forensiq API.
///
/// The host is only parsed when a request is made, so building a `Config`
/// never fails.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Root URL of the API, e.g. `https://api.forensiq.com`.
    pub host: String,
    /// Authentication key for the client's account. Sent as `ck` on every
    /// check.
    pub client_key: String,
}

impl Config {
    pub fn new(host: impl Into<String>, client_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            client_key: client_key.into(),
        }
    }

    /// Read `FORENSIQ_HOST` and `FORENSIQ_CLIENT_KEY` from the environment.
    pub fn from_env() -> Result<Self, ApiError> {
        let host = std::env::var(HOST_ENV).map_err(|_| ApiError::MissingConfig(HOST_ENV))?;
        let client_key =
            std::env::var(CLIENT_KEY_ENV).map_err(|_| ApiError::MissingConfig(CLIENT_KEY_ENV))?;
        Ok(Self { host, client_key })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("client_key", &"<redacted>")
            .finish()
    }
}
