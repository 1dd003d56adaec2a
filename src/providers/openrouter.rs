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
  , TextChoice
  , TransportOptions
};

pub const OPENROUTER_API_BASE: &str
  = "https://openrouter.ai/api/v1";

/// Env variable read when no explicit credential is given
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Pause taken before every request to stay under the rate limit
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_secs(10);

/// Parameters as documented at https://openrouter.ai/docs/parameters
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
pub struct OpenRouterChatRequest
{   #[serde(flatten)]
    pub params: Map<String, Value>
  , pub messages: Vec<Value>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>
}

// ===== Adapter =====

/// Chat-completions adapter for the OpenRouter aggregator
pub struct OpenRouterAdapter
{   api_key: String
  , host: String
  , params: Map<String, Value>
  , pacing_delay: Duration
  , timeout: Option<Duration>
}

impl OpenRouterAdapter
{   /// Override the pre-call pacing delay
    pub fn with_pacing_delay(mut self, delay: Duration) -> Self
    {   debug!("OpenRouter pacing delay set to {:?}", delay);
        self.pacing_delay = delay;
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

#[async_trait]
impl super::Adapter for OpenRouterAdapter
{   fn connect(
      connection: Option<&str>
    , api_base: Option<&str>
    , client_args: &mut Map<String, Value>
    ) -> Result<Self, crate::error::Error>
    {   debug!("Connecting OpenRouter adapter");

        let api_key = match connection.filter(|c| !c.is_empty())
        {   Some(key) => {
              debug!("Using explicit OpenRouter key");
              key.to_string()
            }
          , None => std::env::var(API_KEY_ENV)
              .ok()
              .filter(|k| !k.is_empty())
              .ok_or_else(|| {
                error!("No OpenRouter API key");
                crate::error::Error::MissingApiKey(format!(
                  "OpenRouter API key not set. Set {} or pass a \
                   connection string",
                  API_KEY_ENV
                ))
              })?
        };

        let host = api_base
          .unwrap_or(OPENROUTER_API_BASE)
          .trim_end_matches('/')
          .to_string();

        let params = params::resolve(PARAMS, client_args);
        super::require_engine(&params, "openrouter")?;

        Ok(OpenRouterAdapter
        {   api_key
          , host
          , params
          , pacing_delay: DEFAULT_PACING_DELAY
          , timeout: None
        })
    }

    fn name(&self) -> &'static str
    {   crate::Backend::OpenRouter.name()
    }

    fn param_spec(&self) -> &'static [ParamEntry]
    {   PARAMS
    }

    fn params(&self) -> &Map<String, Value>
    {   &self.params
    }

    fn generation_url(&self) -> String
    {   format!("{}/chat/completions", self.host)
    }

    fn generation_headers(&self) -> BTreeMap<String, String>
    {   let mut headers = BTreeMap::new();
        headers.insert(
          "Authorization".to_string(),
          format!("Bearer {}", self.api_key),
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
        {   accept_invalid_certs: false
          , timeout: self.timeout
        }
    }

    fn pacing_delay(&self) -> Option<Duration>
    {   Some(self.pacing_delay)
    }

    async fn preprocess_request(
      &self
    , request: &CanonicalRequest
    ) -> Result<Value, crate::error::Error>
    {   super::pace(self.pacing_delay(), self.name()).await;
        let request = request.clone();
        let prompt = request.prompt()?;

        for key in request.params.keys()
        {   if !params::CANONICAL_PARAMS.contains(&key.as_str())
            {   debug!("Ignoring unknown parameter: {}", key);
            }
        }

        let body = OpenRouterChatRequest
        {   params: params::to_wire(PARAMS, &self.params, &request.params)
          , messages: prompt.to_messages()
          , stream: request.stream.then_some(true)
        };

        trace!("OpenRouter request: {:?}", body);
        Ok(serde_json::to_value(body)?)
    }

    fn postprocess_response(&self, response: &Value)
      -> CanonicalResponse
    {   if let Some(err) = response.get("error")
        {   warn!("OpenRouter reply carries an error: {}", err);
        }

        let choices = match response.get("choices")
        {   Some(Value::Array(entries)) => entries.iter()
              .filter_map(choice_text)
              .map(TextChoice::new)
              .collect()
          , _ => {
              debug!("No choices in OpenRouter reply");
              vec![TextChoice::empty()]
            }
        };

        CanonicalResponse::from_raw(response, choices)
    }
}

/// Text of one reply entry. Streaming deltas without content
/// contribute nothing; full messages always contribute a string.
fn choice_text(entry: &Value) -> Option<String>
{   if let Some(delta) = entry.get("delta")
    {   return delta.get("content")
          .and_then(Value::as_str)
          .map(str::to_string);
    }
    Some(
      entry.get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
    )
}
