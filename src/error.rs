use std::fmt;

/// Custom error type for adapter operations
/// Implements Clone so callers can fan errors out to several consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// No credential could be resolved for a backend
    MissingApiKey(String)
  , /// Invalid or incomplete configuration at connect time
    InvalidConfiguration(String)
  , /// Canonical request has a shape the backend cannot accept
    Validation(String)
  , /// HTTP request error
    HttpError(String)
  , /// Backend answered with a non-success status
    ApiError
    {   status: u16
      , body: String
    }
  , /// Failed to parse a backend reply or stream line
    ParseError(String)
  , /// Timeout error
    Timeout
}

impl Error
{   /// True for errors raised while connecting an adapter
    pub fn is_configuration(&self) -> bool
    {   matches!(
          self,
          Error::MissingApiKey(_) | Error::InvalidConfiguration(_)
        )
    }

    /// True for per-call prompt validation failures
    pub fn is_validation(&self) -> bool
    {   matches!(self, Error::Validation(_))
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(msg) => {
              write!(f, "Missing API key: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Validation(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError { status, body } => {
              write!(f, "API error ({}): {}", status, body)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::ParseError(e.to_string())
    }
}
