pub mod error;
pub mod config;
pub mod params;
pub mod providers;
pub mod request;
pub mod stream;
pub mod client;
use serde::{Deserialize, Serialize};

/*

shapeshift maps one canonical LLM request onto the wire shape of a
concrete inference backend, and maps whatever that backend answers
back onto one canonical response (a list of text choices).

shapeshift/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Backend selector, capabilities, model identity
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # Connection configuration
│   ├── params.rs       # Canonical -> wire parameter tables
│   ├── request.rs      # Canonical and wire request/response types
│   ├── providers/      # One adapter per backend
│   │   ├── mod.rs      # Adapter trait
│   │   ├── openrouter.rs
│   │   └── azure_endpoint.rs
│   ├── stream.rs       # SSE decoding and delta collection
│   └── client.rs       # Variant dispatch and optional executor
└── tests/

The caller owns the transport: take the WireRequest produced by
Client::prepare_request, send it however you like, and hand the decoded
body to Client::postprocess_response. Client::execute does both with
reqwest for callers that have no transport of their own.

*/

pub use client::Client;
pub use config::ConnectionConfig;
pub use error::Error;
pub use providers::Adapter;
pub use request::
{   CanonicalRequest
  , CanonicalResponse
  , Prompt
  , TextChoice
  , TransportOptions
  , WireRequest
};

/// Supported inference backends.
/// Selecting a backend in configuration selects its adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Backend
{   /// OpenRouter (public aggregator over many model hosts)
    OpenRouter
  , /// Privately hosted Azure ML scoring endpoint
    AzureEndpoint
}

impl Backend
{   /// Stable name used in model identities
    pub fn name(&self) -> &'static str
    {   match self
        {   Backend::OpenRouter => "openrouter"
          , Backend::AzureEndpoint => "azureendpoint"
        }
    }
}

impl std::fmt::Display for Backend
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str(self.name())
    }
}

/// Calling modes an adapter supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities
{   /// Several prompts answered by one backend call
    pub batch_inference: bool
  , /// Incremental delta chunks
    pub streaming_inference: bool
}

/// Identifies which backend and which configured model served a
/// request. Upstream caches fold this into their keys, so two adapters
/// with different engines must never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelIdentity
{   pub model_name: String
  , pub engine: String
}
