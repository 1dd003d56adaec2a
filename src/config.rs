//! Connection configuration for backend adapters

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Everything needed to connect one adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig
{   /// Which backend to talk to
    pub backend: crate::Backend
  , /// Explicit credential; falls back to the backend's env variable
    #[serde(default)]
    pub connection: Option<String>
  , /// API base URL (if custom)
    #[serde(default)]
    pub api_base: Option<String>
  , /// Pre-call pacing delay in milliseconds, for backends that pace
    #[serde(default)]
    pub pacing_delay_ms: Option<u64>
  , /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>
  , /// Overrides for canonical generation parameters
    #[serde(default)]
    pub client_args: Map<String, Value>
}

impl ConnectionConfig
{   /// Config for a backend with every other setting defaulted
    pub fn new(backend: crate::Backend) -> Self
    {   ConnectionConfig
        {   backend
          , connection: None
          , api_base: None
          , pacing_delay_ms: None
          , timeout_secs: None
          , client_args: Map::new()
        }
    }

    /// Parse a config from its JSON form
    pub fn from_json(raw: &str)
      -> Result<Self, crate::error::Error>
    {   serde_json::from_str(raw).map_err(|e| {
          crate::error::Error::InvalidConfiguration(e.to_string())
        })
    }

    /// Set one canonical parameter override
    pub fn with_arg(
      mut self
    , key: &str
    , value: impl Into<Value>
    ) -> Self
    {   self.client_args.insert(key.to_string(), value.into());
        self
    }
}

impl Default for ConnectionConfig
{   fn default() -> Self
    {   ConnectionConfig::new(crate::Backend::OpenRouter)
    }
}
