//! Backend adapter implementations

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::params::ParamEntry;
use crate::request::
{   CanonicalRequest
  , CanonicalResponse
  , TransportOptions
  , WireRequest
};

pub mod openrouter;
pub mod azure_endpoint;

// Re-export for convenience
pub use azure_endpoint::AzureEndpointAdapter;
pub use openrouter::OpenRouterAdapter;

/// Capability set every backend adapter provides.
///
/// Shaping methods work on a clone of their input and never mutate
/// what the caller holds. `postprocess_response` is total: a reply
/// with missing or unexpected fields still yields a `choices` list.
#[async_trait]
pub trait Adapter: Sized + Send + Sync
{   /// Resolve credentials and host, then fill every parameter of
    /// `param_spec` from `client_args` or its default. Consumed
    /// entries are removed from `client_args`.
    ///
    /// `connection` is an explicit credential and `api_base` an
    /// explicit host; each falls back to the backend's environment.
    fn connect(
      connection: Option<&str>
    , api_base: Option<&str>
    , client_args: &mut Map<String, Value>
    ) -> Result<Self, crate::error::Error>;

    /// Stable backend name, used in the model identity
    fn name(&self) -> &'static str;

    /// Canonical -> wire parameter table
    fn param_spec(&self) -> &'static [ParamEntry];

    /// Parameter values resolved at connect time, keyed canonically
    fn params(&self) -> &Map<String, Value>;

    fn generation_url(&self) -> String;

    fn generation_headers(&self) -> BTreeMap<String, String>;

    fn capabilities(&self) -> crate::Capabilities;

    /// Cache-partitioning identity of this adapter and its engine
    fn model_params(&self) -> crate::ModelIdentity
    {   crate::ModelIdentity
        {   model_name: self.name().to_string()
          , engine: self.params()
              .get("engine")
              .and_then(Value::as_str)
              .unwrap_or_default()
              .to_string()
        }
    }

    /// Transport settings handed down with each wire request
    fn transport_options(&self) -> TransportOptions
    {   TransportOptions::default()
    }

    /// Fixed pause `preprocess_request` takes before shaping
    fn pacing_delay(&self) -> Option<Duration>
    {   None
    }

    /// Canonical request -> backend request body. Backends that pace
    /// hold the calling task for `pacing_delay` first, on every call.
    async fn preprocess_request(
      &self
    , request: &CanonicalRequest
    ) -> Result<Value, crate::error::Error>;

    /// Raw decoded backend reply -> canonical response
    fn postprocess_response(&self, response: &Value)
      -> CanonicalResponse;

    /// Body, URL, headers and transport settings for one call
    async fn wire_request(
      &self
    , request: &CanonicalRequest
    ) -> Result<WireRequest, crate::error::Error>
    {   let body = self.preprocess_request(request).await?;
        Ok(WireRequest
        {   url: self.generation_url()
          , headers: self.generation_headers()
          , body
          , transport: self.transport_options()
        })
    }
}

/// Hold the calling task for an adapter's pacing delay, if it has one
pub(crate) async fn pace(delay: Option<Duration>, backend: &str)
{   if let Some(delay) = delay
    {   log::debug!("Pacing {} request for {:?}", backend, delay);
        tokio::time::sleep(delay).await;
    }
}

/// The resolved `engine` parameter must be a model id
pub(crate) fn require_engine(
  params: &Map<String, Value>
, backend: &str
) -> Result<(), crate::error::Error>
{   match params.get("engine")
    {   Some(Value::String(engine)) if !engine.is_empty() => Ok(())
      , other => Err(crate::error::Error::InvalidConfiguration(
          format!(
            "{}: engine must be a non-empty model id, got {}",
            backend,
            other.cloned().unwrap_or(Value::Null)
          )
        ))
    }
}
