//! Canonical generation parameters and their per-backend wire names

use log::{debug, trace};
use serde_json::{Map, Value};

/// Default value of a parameter, kept const so tables can be static
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault
{   Str(&'static str)
  , Int(i64)
  , Float(f64)
  , /// Parameter is left out of the wire body unless overridden
    Null
}

impl ParamDefault
{   pub fn to_value(&self) -> Value
    {   match self
        {   ParamDefault::Str(s) => Value::from(*s)
          , ParamDefault::Int(i) => Value::from(*i)
          , ParamDefault::Float(f) => Value::from(*f)
          , ParamDefault::Null => Value::Null
        }
    }
}

/// One row of a backend's parameter table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamEntry
{   /// Name the pipeline uses
    pub canonical: &'static str
  , /// Field name in the backend's request body
    pub wire: &'static str
  , pub default: ParamDefault
}

impl ParamEntry
{   pub const fn new(
      canonical: &'static str
    , wire: &'static str
    , default: ParamDefault
    ) -> Self
    {   ParamEntry { canonical, wire, default }
    }
}

/// Every canonical parameter the pipeline may send
pub const CANONICAL_PARAMS: &[&str] = &[
  "engine",
  "max_tokens",
  "temperature",
  "top_k",
  "frequency_penalty",
  "presence_penalty",
  "stop_sequences",
];

/// Resolve every entry of `table` from `client_args`, falling back to
/// the default. Consumed overrides are removed from `client_args` so
/// the caller can spot anything left unrecognized.
pub fn resolve(
  table: &[ParamEntry]
, client_args: &mut Map<String, Value>
) -> Map<String, Value>
{   let mut resolved = Map::new();
    for entry in table
    {   let value = match client_args.remove(entry.canonical)
        {   Some(value) => {
              debug!("Override for {}: {}", entry.canonical, value);
              value
            }
          , None => entry.default.to_value()
        };
        resolved.insert(entry.canonical.to_string(), value);
    }
    resolved
}

/// Build the wire-named parameter fields of a request body.
/// Per-call values win over the connected ones.
///
/// A null value is never sent as `null`: its wire field is left out
/// of the body. With the default tables this means no `stop` field
/// unless `stop_sequences` is set, and a per-call null clears a
/// connected value for that call.
pub fn to_wire(
  table: &[ParamEntry]
, connected: &Map<String, Value>
, per_call: &Map<String, Value>
) -> Map<String, Value>
{   let mut body = Map::new();
    for entry in table
    {   let value = per_call.get(entry.canonical)
          .or_else(|| connected.get(entry.canonical))
          .cloned()
          .unwrap_or(Value::Null);
        if value.is_null()
        {   trace!("Skipping null parameter {}", entry.wire);
            continue;
        }
        body.insert(entry.wire.to_string(), value);
    }
    body
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    const TABLE: &[ParamEntry] = &[
      ParamEntry::new("engine", "model", ParamDefault::Str("m-default")),
      ParamEntry::new("top_k", "k", ParamDefault::Int(0)),
      ParamEntry::new("stop_sequences", "stop", ParamDefault::Null),
    ];

    #[test]
    fn resolve_consumes_known_overrides_only()
    {   let mut args = Map::new();
        args.insert("engine".into(), json!("m-custom"));
        args.insert("bogus".into(), json!(1));

        let resolved = resolve(TABLE, &mut args);

        assert_eq!(resolved["engine"], json!("m-custom"));
        assert_eq!(resolved["top_k"], json!(0));
        assert_eq!(resolved["stop_sequences"], Value::Null);
        assert_eq!(args.len(), 1);
        assert!(args.contains_key("bogus"));
    }

    #[test]
    fn to_wire_prefers_per_call_and_drops_nulls()
    {   let connected = resolve(TABLE, &mut Map::new());
        let mut per_call = Map::new();
        per_call.insert("top_k".into(), json!(40));

        let body = to_wire(TABLE, &connected, &per_call);

        assert_eq!(body["model"], json!("m-default"));
        assert_eq!(body["k"], json!(40));
        assert!(!body.contains_key("stop"));
    }

    #[test]
    fn to_wire_omits_fields_cleared_per_call()
    {   let mut args = Map::new();
        args.insert("stop_sequences".into(), json!(["\n"]));
        let connected = resolve(TABLE, &mut args);
        assert_eq!(to_wire(TABLE, &connected, &Map::new())["stop"], json!(["\n"]));

        let mut per_call = Map::new();
        per_call.insert("stop_sequences".into(), Value::Null);
        let body = to_wire(TABLE, &connected, &per_call);

        assert!(!body.contains_key("stop"));
        assert!(!body.values().any(Value::is_null));
    }
}
