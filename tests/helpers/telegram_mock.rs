//! Mock Telegram API Server for testing
//!
//! This module provides a mock HTTP server that simulates the sendMessage
//! endpoint of the Telegram Bot API. It uses wiremock to create configurable
//! mock responses.

use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path_regex},
    Mock, MockServer, ResponseTemplate,
};
use PadelTower::config::TelegramConfig;

pub const TEST_BOT_TOKEN: &str = "12345:test_token";

/// Mock Telegram API server for testing
pub struct TelegramMockServer {
    pub server: MockServer,
}

/// Configuration for mock responses
#[derive(Debug, Clone)]
pub struct MockResponseConfig {
    pub success: bool,
    pub delay_ms: Option<u64>,
    pub custom_response: Option<Value>,
}

impl Default for MockResponseConfig {
    fn default() -> Self {
        Self {
            success: true,
            delay_ms: None,
            custom_response: None,
        }
    }
}

impl TelegramMockServer {
    /// Create a new mock Telegram API server
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Telegram configuration pointing at this server
    pub fn telegram_config(&self, admin_chat_ids: Vec<i64>, language: &str) -> TelegramConfig {
        TelegramConfig {
            token: Some(TEST_BOT_TOKEN.to_string()),
            api_url: Some(self.server.uri()),
            admin_chat_ids,
            language: language.to_string(),
        }
    }

    /// Setup mock for sendMessage endpoint
    pub async fn mock_send_message(&self, config: MockResponseConfig) {
        let response_body = config.custom_response.unwrap_or_else(|| {
            if config.success {
                json!({
                    "ok": true,
                    "result": {
                        "message_id": 123,
                        "from": {
                            "id": 12345,
                            "is_bot": true,
                            "first_name": "PadelTowerBot",
                            "username": "padel_tower_bot"
                        },
                        "chat": {
                            "id": -1001234567890_i64,
                            "title": "Club Staff",
                            "type": "supergroup"
                        },
                        "date": 1640995200,
                        "text": "Test message"
                    }
                })
            } else {
                json!({
                    "ok": false,
                    "error_code": 400,
                    "description": "Bad Request: chat not found"
                })
            }
        });

        let mut response = ResponseTemplate::new(if config.success { 200 } else { 400 })
            .set_body_json(response_body);

        if let Some(delay) = config.delay_ms {
            response = response.set_delay(std::time::Duration::from_millis(delay));
        }

        Mock::given(method("POST"))
            // Bot API method names are case-insensitive; teloxide sends `SendMessage`
            .and(path_regex(format!("^/bot{}/(?i:sendMessage)$", regex::escape(TEST_BOT_TOKEN))))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Bodies of every sendMessage request received so far
    pub async fn sent_messages(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path().to_ascii_lowercase().ends_with("/sendmessage"))
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
