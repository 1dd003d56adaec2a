use serde_json::{json, Map};
use shapeshift::providers::azure_endpoint::{self, AzureEndpointAdapter};
use shapeshift::{Adapter, CanonicalRequest, Error};

const HOST: &str = "https://scoring.example.net";

fn init_logging()
{   let _ = env_logger::builder().is_test(true).try_init();
}

fn adapter() -> AzureEndpointAdapter
{   init_logging();
    AzureEndpointAdapter::connect(Some("az-key"), Some(HOST), &mut Map::new())
      .expect("explicit key and host connect")
}

// ===== Connector =====

#[test]
fn test_connect_requires_a_key()
{   init_logging();
    let vars = [
      (azure_endpoint::API_KEY_ENV, None::<&str>),
      (azure_endpoint::HOST_ENV, Some(HOST)),
    ];
    temp_env::with_vars(vars, || {
      let err = AzureEndpointAdapter::connect(None, None, &mut Map::new())
        .err()
        .expect("no key must fail");
      assert!(err.is_configuration());
      assert!(matches!(err, Error::MissingApiKey(_)));
    });
}

#[test]
fn test_connect_rejects_empty_key()
{   init_logging();
    temp_env::with_var(azure_endpoint::API_KEY_ENV, Some(""), || {
      let err = AzureEndpointAdapter::connect(None, Some(HOST), &mut Map::new())
        .err()
        .expect("empty key must fail");
      assert!(err.is_configuration());
    });
}

#[test]
fn test_connect_requires_a_host()
{   init_logging();
    temp_env::with_var_unset(azure_endpoint::HOST_ENV, || {
      let err = AzureEndpointAdapter::connect(
          Some("az-key"), None, &mut Map::new()
        )
        .err()
        .expect("no host must fail");
      assert!(matches!(err, Error::InvalidConfiguration(_)));
      assert!(err.to_string().contains("AZURE_HOST"));
    });
}

#[test]
fn test_connect_reads_environment()
{   init_logging();
    let vars = [
      (azure_endpoint::API_KEY_ENV, Some("az-env")),
      (azure_endpoint::HOST_ENV, Some("https://env.example.net/")),
    ];
    temp_env::with_vars(vars, || {
      let adapter = AzureEndpointAdapter::connect(None, None, &mut Map::new())
        .expect("env connects");
      assert_eq!(adapter.generation_url(), "https://env.example.net/score");
      assert_eq!(
        adapter.generation_headers()["Authorization"],
        "Bearer az-env"
      );
    });
}

#[test]
fn test_tls_verification_is_off_unless_requested()
{   init_logging();
    temp_env::with_var_unset(azure_endpoint::HTTPS_VERIFY_ENV, || {
      let adapter = adapter();
      assert!(adapter.transport_options().accept_invalid_certs);

      let verified = adapter.with_tls_verification(true);
      assert!(!verified.transport_options().accept_invalid_certs);
    });

    temp_env::with_var(azure_endpoint::HTTPS_VERIFY_ENV, Some("1"), || {
      assert!(!adapter().transport_options().accept_invalid_certs);
    });
}

#[test]
fn test_connect_consumes_params_it_ignores()
{   init_logging();
    let mut args = Map::new();
    args.insert("temperature".into(), json!(0.9));
    args.insert("engine".into(), json!("phi-3-medium"));

    let adapter = AzureEndpointAdapter::connect(
        Some("az-key"), Some(HOST), &mut args
      )
      .unwrap();

    assert!(args.is_empty());
    assert_eq!(adapter.params()["temperature"], json!(0.9));
    assert_eq!(adapter.model_params().engine, "phi-3-medium");
}

// ===== RequestShaper =====

#[tokio::test]
async fn test_body_is_fixed_scoring_envelope()
{   let body = adapter()
      .preprocess_request(&CanonicalRequest::new("SELECT 1")).await
      .unwrap();

    assert_eq!(body, json!({
      "input_data": {
        "input_string": [{"role": "user", "content": "SELECT 1"}],
        "parameters": {"stop": "\n```", "max_tokens": 500}
      }
    }));
}

#[tokio::test]
async fn test_generation_params_are_ignored()
{   init_logging();
    let mut args = Map::new();
    args.insert("max_tokens".into(), json!(32));
    let adapter = AzureEndpointAdapter::connect(
        Some("az-key"), Some(HOST), &mut args
      )
      .unwrap();

    let request = CanonicalRequest::new("q")
      .with_param("temperature", 1.5)
      .with_param("max_tokens", 8)
      .with_param("stop_sequences", json!([";"]))
      .streaming();
    let body = adapter.preprocess_request(&request).await.unwrap();
    let parameters = &body["input_data"]["parameters"];

    assert_eq!(parameters["max_tokens"], azure_endpoint::FIXED_MAX_TOKENS);
    assert_eq!(parameters["stop"], azure_endpoint::FIXED_STOP);
    assert!(parameters.get("temperature").is_none());
    assert!(body.get("stream").is_none());
    for name in shapeshift::params::CANONICAL_PARAMS
    {   assert!(azure_endpoint::IGNORED_PARAMS.contains(name));
    }
}

#[tokio::test]
async fn test_only_string_prompts_are_accepted()
{   let adapter = adapter();
    for prompt in [
      json!(["a", "b"]),
      json!([{"role": "user", "content": "a"}]),
      json!(3),
    ]
    {   let err = adapter
          .preprocess_request(&CanonicalRequest::new(prompt.clone())).await
          .unwrap_err();
        assert!(err.is_validation(), "{} should fail", prompt);
    }
}

#[tokio::test]
async fn test_empty_prompt_is_rejected()
{   let err = adapter()
      .preprocess_request(&CanonicalRequest::new("")).await
      .unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains(r#""""#));
}

#[test]
fn test_headers_and_url()
{   let adapter = adapter();
    let headers = adapter.generation_headers();

    assert_eq!(headers.len(), 3);
    assert_eq!(headers["Content-Type"], "application/json");
    assert_eq!(headers["Authorization"], "Bearer az-key");
    assert_eq!(
      headers["azureml-model-deployment"],
      azure_endpoint::MODEL_DEPLOYMENT
    );
    assert_eq!(adapter.generation_url(), "https://scoring.example.net/score");
    assert!(adapter.pacing_delay().is_none());
}

#[tokio::test]
async fn test_wire_request_bundles_everything()
{   let adapter = adapter().with_tls_verification(false);
    let wire = adapter.wire_request(&CanonicalRequest::new("q")).await.unwrap();

    assert_eq!(wire.url, adapter.generation_url());
    assert_eq!(wire.headers, adapter.generation_headers());
    assert_eq!(wire.body["input_data"]["input_string"][0]["content"], "q");
    assert!(wire.transport.accept_invalid_certs);
}

// ===== ResponseShaper =====

#[test]
fn test_output_reply()
{   let response = adapter().postprocess_response(&json!({"output": "answer"}));
    assert_eq!(response.texts(), vec!["answer"]);
}

#[test]
fn test_empty_reply_yields_placeholder()
{   let adapter = adapter();
    assert_eq!(adapter.postprocess_response(&json!({})).texts(), vec![""]);
    assert_eq!(
      adapter.postprocess_response(&json!({"output": null})).texts(),
      vec![""]
    );
}

#[test]
fn test_reply_fields_pass_through_and_choices_are_overwritten()
{   let reply = json!({
      "output": "SELECT count(*) FROM t",
      "choices": "stale",
      "latency_ms": 42
    });
    let response = adapter().postprocess_response(&reply);

    assert_eq!(response.texts(), vec!["SELECT count(*) FROM t"]);
    assert_eq!(response.extra["latency_ms"], 42);
    assert_eq!(response.extra["output"], "SELECT count(*) FROM t");
    assert!(!response.extra.contains_key("choices"));
}

#[test]
fn test_structured_output_is_rendered_as_json()
{   let response = adapter().postprocess_response(&json!({"output": ["x"]}));
    assert_eq!(response.texts(), vec![r#"["x"]"#]);
}

// ===== Capabilities & identity =====

#[test]
fn test_capabilities_and_identity()
{   let adapter = adapter();
    let caps = adapter.capabilities();

    assert!(!caps.batch_inference);
    assert!(caps.streaming_inference);
    assert_eq!(adapter.model_params().model_name, "azureendpoint");
    assert_eq!(
      adapter.model_params().engine,
      "meta-llama/codellama-70b-instruct"
    );
}
