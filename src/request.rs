//! Canonical and wire request/response types

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::Error;

// ===== Canonical request =====

/// Backend-agnostic request as the pipeline builds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRequest
{   /// A string, a list of strings, or a list of role/content records
    #[serde(default)]
    pub prompt: Value
  , /// Generation parameters keyed by canonical name
    #[serde(default)]
    pub params: Map<String, Value>
  , /// Ask the backend for incremental delta chunks
    #[serde(default)]
    pub stream: bool
}

impl CanonicalRequest
{   pub fn new(prompt: impl Into<Value>) -> Self
    {   CanonicalRequest
        {   prompt: prompt.into()
          , params: Map::new()
          , stream: false
        }
    }

    /// Set a per-call generation parameter
    pub fn with_param(
      mut self
    , key: &str
    , value: impl Into<Value>
    ) -> Self
    {   self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn streaming(mut self) -> Self
    {   self.stream = true;
        self
    }

    /// Validated, typed view of the prompt
    pub fn prompt(&self) -> Result<Prompt, Error>
    {   Prompt::try_from(&self.prompt)
    }
}

/// Accepted prompt shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt
{   /// One user turn
    Text(String)
  , /// Independent user turns, one per string
    Texts(Vec<String>)
  , /// Pre-built chat records, each with `role` and `content`
    Messages(Vec<Map<String, Value>>)
}

impl Prompt
{   /// Chat-message form of the prompt, in input order
    pub fn to_messages(&self) -> Vec<Value>
    {   match self
        {   Prompt::Text(text) => vec![user_message(text)]
          , Prompt::Texts(texts) => {
              texts.iter().map(|t| user_message(t)).collect()
            }
          , Prompt::Messages(records) => {
              records.iter().cloned().map(Value::Object).collect()
            }
        }
    }
}

impl TryFrom<&Value> for Prompt
{   type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Error>
    {   match value
        {   Value::String(text) if text.is_empty() => {
              Err(Error::Validation(
                "Prompt must be a non-empty string. Got \"\"".to_string()
              ))
            }
          , Value::String(text) => Ok(Prompt::Text(text.clone()))
          , Value::Array(items)
              if !items.is_empty()
                && items.iter().all(Value::is_string) => {
              if items.iter().any(|v| v.as_str() == Some(""))
              {   return Err(Error::Validation(format!(
                    "Prompt strings must be non-empty. Got {}",
                    value
                  )));
              }
              Ok(Prompt::Texts(
                items.iter()
                  .filter_map(|v| v.as_str().map(str::to_string))
                  .collect()
              ))
            }
          , Value::Array(items)
              if !items.is_empty()
                && items.iter().all(Value::is_object) => {
              let records: Vec<Map<String, Value>> = items.iter()
                .filter_map(|v| v.as_object().cloned())
                .collect();
              if records.iter().any(|r| {
                !r.contains_key("role") || !r.contains_key("content")
              })
              {   return Err(Error::Validation(format!(
                    "Prompt must be list of records with 'role' and \
                     'content' keys. Got {}",
                    value
                  )));
              }
              Ok(Prompt::Messages(records))
            }
          , other => Err(Error::Validation(format!(
              "Prompt must be string, list of strings, or list of \
               role/content records. Got {}",
              other
            )))
        }
    }
}

pub(crate) fn user_message(content: &str) -> Value
{   json!({ "role": "user", "content": content })
}

// ===== Wire request =====

/// Transport settings an adapter hands down with each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportOptions
{   /// Skip TLS certificate validation for this call
    pub accept_invalid_certs: bool
  , pub timeout: Option<Duration>
}

/// Fully shaped call, ready for any HTTP transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireRequest
{   pub url: String
  , pub headers: BTreeMap<String, String>
  , pub body: Value
  , #[serde(skip)]
    pub transport: TransportOptions
}

// ===== Canonical response =====

/// One generated text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChoice
{   pub text: String
}

impl TextChoice
{   pub fn new(text: impl Into<String>) -> Self
    {   TextChoice { text: text.into() }
    }

    /// Placeholder for a backend that returned nothing usable
    pub fn empty() -> Self
    {   TextChoice { text: String::new() }
    }
}

/// Backend reply with its `choices` normalized to plain text records.
/// Every other field of the reply is carried in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResponse
{   pub choices: Vec<TextChoice>
  , #[serde(flatten)]
    pub extra: Map<String, Value>
}

impl CanonicalResponse
{   /// Pair normalized choices with the passthrough fields of `raw`
    pub fn from_raw(raw: &Value, choices: Vec<TextChoice>) -> Self
    {   let mut extra = raw.as_object().cloned().unwrap_or_default();
        extra.remove("choices");
        CanonicalResponse { choices, extra }
    }

    pub fn texts(&self) -> Vec<&str>
    {   self.choices.iter().map(|c| c.text.as_str()).collect()
    }

    /// JSON form: the original reply with `choices` overwritten
    pub fn into_value(self) -> Value
    {   let mut map = self.extra;
        map.insert(
          "choices".to_string(),
          Value::Array(
            self.choices.into_iter()
              .map(|c| json!({ "text": c.text }))
              .collect()
          ),
        );
        Value::Object(map)
    }
}
