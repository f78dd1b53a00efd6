use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use toolloop::config::Config;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config pointing the provider and both tools at one mock server
#[allow(dead_code)]
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.provider.openai.api_base = server.uri();
    config.provider.openai.api_key = Some("sk-test".to_string());
    config.tools.location.api_base = server.uri();
    config.tools.weather.api_base = server.uri();
    config
}

#[allow(dead_code)]
pub fn tool_call_body(id: &str, name: &str, arguments: &str) -> Value {
    json!({
        "choices": [{
            "finish_reason": "tool_calls",
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments}
                }]
            }
        }],
        "usage": {"prompt_tokens": 40, "completion_tokens": 10, "total_tokens": 50}
    })
}

#[allow(dead_code)]
pub fn stop_body(text: &str) -> Value {
    json!({
        "choices": [{
            "finish_reason": "stop",
            "message": {"role": "assistant", "content": text}
        }]
    })
}

/// Mount a completion that answers exactly once, in mount order
#[allow(dead_code)]
pub async fn mount_completion_once(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

/// Bodies of every chat completion request the server received
#[allow(dead_code)]
pub async fn completion_requests(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/chat/completions")
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}
