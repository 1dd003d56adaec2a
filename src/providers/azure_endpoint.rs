use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, trace, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::params::{self, ParamDefault, ParamEntry};
use crate::request::
{   CanonicalRequest
  , CanonicalResponse
  , Prompt
  , TextChoice
  , TransportOptions
};

/// Env variable holding the endpoint base URL
pub const HOST_ENV: &str = "AZURE_HOST";

/// Env variable read when no explicit credential is given
pub const API_KEY_ENV: &str = "AZURE_API_KEY";

/// Set to any non-empty value to keep TLS certificate checks on
pub const HTTPS_VERIFY_ENV: &str = "AZURE_HTTPS_VERIFY";

/// Deployment every request is routed to
pub const MODEL_DEPLOYMENT: &str = "duckdb-nsql-v2-phi-medium-1";

pub const FIXED_STOP: &str = "\n```";
pub const FIXED_MAX_TOKENS: u32 = 500;

/// Canonical parameters this endpoint accepts at connect time but never
/// sends. The scoring envelope always carries `FIXED_STOP` and
/// `FIXED_MAX_TOKENS` instead, and callers rely on that.
pub const IGNORED_PARAMS: &[&str] = &[
  "engine",
  "max_tokens",
  "temperature",
  "top_k",
  "frequency_penalty",
  "presence_penalty",
  "stop_sequences",
];

pub const PARAMS: &[ParamEntry] = &[
  ParamEntry::new(
    "engine", "model",
    ParamDefault::Str("meta-llama/codellama-70b-instruct")
  ),
  ParamEntry::new("max_tokens", "max_tokens", ParamDefault::Int(1000)),
  ParamEntry::new("temperature", "temperature", ParamDefault::Float(0.1)),
  ParamEntry::new("top_k", "k", ParamDefault::Int(0)),
  ParamEntry::new(
    "frequency_penalty", "frequency_penalty", ParamDefault::Float(0.0)
  ),
  ParamEntry::new(
    "presence_penalty", "presence_penalty", ParamDefault::Float(0.0)
  ),
  ParamEntry::new("stop_sequences", "stop", ParamDefault::Null),
];

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreParameters
{   pub stop: &'static str
  , pub max_tokens: u32
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreInput
{   pub input_string: Vec<ChatMessage>
  , pub parameters: ScoreParameters
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest
{   pub input_data: ScoreInput
}

// ===== Adapter =====

/// Adapter for a privately hosted Azure ML scoring endpoint
pub struct AzureEndpointAdapter
{   api_key: String
  , host: String
  , params: Map<String, Value>
  , accept_invalid_certs: bool
  , timeout: Option<Duration>
}

impl AzureEndpointAdapter
{   /// Turn TLS certificate validation on or off for this adapter.
    /// Only this adapter's requests are affected.
    pub fn with_tls_verification(mut self, verify: bool) -> Self
    {   debug!("Azure endpoint TLS verification: {}", verify);
        self.accept_invalid_certs = !verify;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self
    {   self.timeout = Some(timeout);
        self
    }

    pub fn host(&self) -> &str
    {   &self.host
    }
}

fn non_empty_env(name: &str) -> Option<String>
{   std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[async_trait]
impl super::Adapter for AzureEndpointAdapter
{   fn connect(
      connection: Option<&str>
    , api_base: Option<&str>
    , client_args: &mut Map<String, Value>
    ) -> Result<Self, crate::error::Error>
    {   debug!("Connecting Azure endpoint adapter");

        let api_key = connection
          .filter(|c| !c.is_empty())
          .map(str::to_string)
          .or_else(|| non_empty_env(API_KEY_ENV))
          .ok_or_else(|| {
            error!("No Azure endpoint key");
            crate::error::Error::MissingApiKey(format!(
              "A key should be provided to invoke the endpoint. Set {}",
              API_KEY_ENV
            ))
          })?;

        let host = api_base
          .map(str::to_string)
          .or_else(|| non_empty_env(HOST_ENV))
          .ok_or_else(|| {
            error!("No Azure endpoint host");
            crate::error::Error::InvalidConfiguration(format!(
              "Azure endpoint host not set. Set {}",
              HOST_ENV
            ))
          })?
          .trim_end_matches('/')
          .to_string();

        // Certificate checks stay off unless HTTPS_VERIFY_ENV is set
        let accept_invalid_certs = non_empty_env(HTTPS_VERIFY_ENV).is_none();
        if accept_invalid_certs
        {   warn!(
              "Azure endpoint {} accepts unverified TLS certificates; \
               set {} to keep verification on",
              host, HTTPS_VERIFY_ENV
            );
        }

        let params = params::resolve(PARAMS, client_args);
        super::require_engine(&params, "azureendpoint")?;

        Ok(AzureEndpointAdapter
        {   api_key
          , host
          , params
          , accept_invalid_certs
          , timeout: None
        })
    }

    fn name(&self) -> &'static str
    {   crate::Backend::AzureEndpoint.name()
    }

    fn param_spec(&self) -> &'static [ParamEntry]
    {   PARAMS
    }

    fn params(&self) -> &Map<String, Value>
    {   &self.params
    }

    fn generation_url(&self) -> String
    {   format!("{}/score", self.host)
    }

    fn generation_headers(&self) -> BTreeMap<String, String>
    {   let mut headers = BTreeMap::new();
        headers.insert(
          "Content-Type".to_string(),
          "application/json".to_string(),
        );
        headers.insert(
          "Authorization".to_string(),
          format!("Bearer {}", self.api_key),
        );
        headers.insert(
          "azureml-model-deployment".to_string(),
          MODEL_DEPLOYMENT.to_string(),
        );
        headers
    }

    fn capabilities(&self) -> crate::Capabilities
    {   crate::Capabilities
        {   batch_inference: false
          , streaming_inference: true
        }
    }

    fn transport_options(&self) -> TransportOptions
    {   TransportOptions
        {   accept_invalid_certs: self.accept_invalid_certs
          , timeout: self.timeout
        }
    }

    async fn preprocess_request(
      &self
    , request: &CanonicalRequest
    ) -> Result<Value, crate::error::Error>
    {   let request = request.clone();
        let prompt = match request.prompt()?
        {   Prompt::Text(text) => text
          , _ => {
              return Err(crate::error::Error::Validation(format!(
                "Azure endpoint takes a single string prompt. Got {}",
                request.prompt
              )));
            }
        };

        let ignored: Vec<&str> = request.params.keys()
          .map(String::as_str)
          .filter(|k| IGNORED_PARAMS.contains(k))
          .collect();
        if !ignored.is_empty()
        {   debug!(
              "Azure endpoint ignores generation parameters: {:?}",
              ignored
            );
        }
        if request.stream
        {   debug!("Azure endpoint request sent without a stream flag");
        }

        let body = ScoreRequest
        {   input_data: ScoreInput
            {   input_string: vec![
                  ChatMessage
                  {   role: "user".to_string()
                    , content: prompt
                  }
                ]
              , parameters: ScoreParameters
                {   stop: FIXED_STOP
                  , max_tokens: FIXED_MAX_TOKENS
                }
            }
        };

        trace!("Azure endpoint request: {:?}", body);
        Ok(serde_json::to_value(body)?)
    }

    fn postprocess_response(&self, response: &Value)
      -> CanonicalResponse
    {   let text = match response.get("output")
        {   Some(Value::String(output)) => output.clone()
          , Some(Value::Null) | None => {
              debug!("No output in Azure endpoint reply");
              String::new()
            }
          , Some(other) => other.to_string()
        };

        CanonicalResponse::from_raw(response, vec![TextChoice::new(text)])
    }
}
