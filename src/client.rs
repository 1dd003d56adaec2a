use std::time::Duration;

use log::{debug, error, info, trace, warn};
use serde_json::Value;

use crate::config::ConnectionConfig;
use crate::providers::
{   Adapter
  , AzureEndpointAdapter
  , OpenRouterAdapter
};
use crate::request::
{   CanonicalRequest
  , CanonicalResponse
  , TransportOptions
  , WireRequest
};

/// One connected adapter per backend variant
pub enum Client
{   OpenRouter(OpenRouterAdapter)
  , AzureEndpoint(AzureEndpointAdapter)
}

impl Client
{   /// Connect the adapter selected by `config.backend`.
    /// Any `client_args` entry the adapter does not recognize is an
    /// error, so typos in parameter names surface immediately.
    pub fn connect(config: &ConnectionConfig)
      -> Result<Self, crate::error::Error>
    {   debug!("Connecting client for backend: {}", config.backend);
        let mut args = config.client_args.clone();
        let connection = config.connection.as_deref();
        let api_base = config.api_base.as_deref();
        let timeout = config.timeout_secs.map(Duration::from_secs);

        let client = match config.backend
        {   crate::Backend::OpenRouter => {
              let mut adapter = OpenRouterAdapter::connect(
                connection, api_base, &mut args
              )?;
              if let Some(ms) = config.pacing_delay_ms
              {   adapter = adapter
                    .with_pacing_delay(Duration::from_millis(ms));
              }
              if let Some(timeout) = timeout
              {   adapter = adapter.with_timeout(timeout);
              }
              Client::OpenRouter(adapter)
            }
          , crate::Backend::AzureEndpoint => {
              let mut adapter = AzureEndpointAdapter::connect(
                connection, api_base, &mut args
              )?;
              if config.pacing_delay_ms.is_some()
              {   warn!("Azure endpoint does not pace requests");
              }
              if let Some(timeout) = timeout
              {   adapter = adapter.with_timeout(timeout);
              }
              Client::AzureEndpoint(adapter)
            }
        };

        if !args.is_empty()
        {   let unknown: Vec<&String> = args.keys().collect();
            error!("Unrecognized client arguments: {:?}", unknown);
            return Err(crate::error::Error::InvalidConfiguration(
              format!("{:?} arguments are not recognized", unknown)
            ));
        }

        info!(
          "Connected {} client for engine {}",
          client.name(),
          client.model_params().engine
        );
        Ok(client)
    }

    pub fn backend(&self) -> crate::Backend
    {   match self
        {   Client::OpenRouter(_) => crate::Backend::OpenRouter
          , Client::AzureEndpoint(_) => crate::Backend::AzureEndpoint
        }
    }

    pub fn name(&self) -> &'static str
    {   match self
        {   Client::OpenRouter(a) => a.name()
          , Client::AzureEndpoint(a) => a.name()
        }
    }

    pub fn capabilities(&self) -> crate::Capabilities
    {   match self
        {   Client::OpenRouter(a) => a.capabilities()
          , Client::AzureEndpoint(a) => a.capabilities()
        }
    }

    /// Model identity for cache keys
    pub fn model_params(&self) -> crate::ModelIdentity
    {   match self
        {   Client::OpenRouter(a) => a.model_params()
          , Client::AzureEndpoint(a) => a.model_params()
        }
    }

    pub fn transport_options(&self) -> TransportOptions
    {   match self
        {   Client::OpenRouter(a) => a.transport_options()
          , Client::AzureEndpoint(a) => a.transport_options()
        }
    }

    pub fn pacing_delay(&self) -> Option<Duration>
    {   match self
        {   Client::OpenRouter(a) => a.pacing_delay()
          , Client::AzureEndpoint(a) => a.pacing_delay()
        }
    }

    /// Shape a canonical request for this backend. Backends that pace
    /// requests hold the calling task for their delay first, on every
    /// call.
    pub async fn prepare_request(
      &self
    , request: &CanonicalRequest
    ) -> Result<WireRequest, crate::error::Error>
    {   let wire = match self
        {   Client::OpenRouter(a) => a.wire_request(request).await
          , Client::AzureEndpoint(a) => a.wire_request(request).await
        }?;
        debug!("Prepared {} request for {}", self.name(), wire.url);
        Ok(wire)
    }

    /// Normalize a raw decoded reply. Never fails.
    pub fn postprocess_response(&self, response: &Value)
      -> CanonicalResponse
    {   match self
        {   Client::OpenRouter(a) => a.postprocess_response(response)
          , Client::AzureEndpoint(a) => a.postprocess_response(response)
        }
    }

    /// Prepare, send and normalize one non-streaming call with
    /// reqwest. No retries: failures surface as errors.
    pub async fn execute(
      &self
    , request: &CanonicalRequest
    ) -> Result<CanonicalResponse, crate::error::Error>
    {   let wire = self.prepare_request(request).await?;
        let http = http_client(&wire.transport)?;

        let mut builder = http.post(&wire.url);
        for (name, value) in &wire.headers
        {   builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
          .json(&wire.body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            if e.is_timeout()
            {   crate::error::Error::Timeout
            } else
            {   crate::error::Error::HttpError(e.to_string())
            }
          })?;

        let status = response.status();
        trace!("{} response status: {}", self.name(), status);

        if !status.is_success()
        {   let body = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("{} API error: {}", self.name(), body);
            return Err(crate::error::Error::ApiError
            {   status: status.as_u16()
              , body
            });
        }

        let raw: Value = response.json().await.map_err(|e| {
          error!("Parse error: {}", e);
          crate::error::Error::ParseError(e.to_string())
        })?;

        Ok(self.postprocess_response(&raw))
    }

    /// Release the adapter
    pub fn close(self)
    {   debug!("Closing {} client", self.name());
    }
}

/// HTTP client honouring one request's transport options
fn http_client(options: &TransportOptions)
  -> Result<reqwest::Client, crate::error::Error>
{   let mut builder = reqwest::Client::builder()
      .danger_accept_invalid_certs(options.accept_invalid_certs);
    if let Some(timeout) = options.timeout
    {   builder = builder.timeout(timeout);
    }
    builder.build().map_err(|e| {
      error!("Failed to build HTTP client: {}", e);
      crate::error::Error::HttpError(e.to_string())
    })
}
