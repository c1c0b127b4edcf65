//! Notification delivery
//!
//! Lifecycle side effects are announced through a [`NotificationSink`].
//! [`NotificationService`] formats multi-language templates and delivers them
//! to the operator chats through teloxide; [`LogNotifier`] only records them.
//! Delivery is fire-and-forget: callers log failures and move on.

use std::collections::HashMap;
use std::fmt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teloxide::{Bot, types::{ChatId, ParseMode}, requests::Requester, prelude::Request, payloads::SendMessageSetters, utils::html};
use tokio::sync::Mutex;
use tracing::{info, warn, error, debug};
use crate::config::TelegramConfig;
use crate::models::Event;
use crate::utils::errors::{PadelTowerError, Result};
use crate::utils::helpers::truncate_text;

const DEFAULT_LANGUAGE: &str = "es";
const MAX_EVENT_NAME: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EventPairing,
    EventLive,
    EventFinished,
    PostEventAnalysis,
    RoundGenerated,
    WaitlistPromoted,
    PlayerWithdrawn,
    EventCancelled,
}

impl NotificationKind {
    pub fn template_key(&self) -> &'static str {
        match self {
            NotificationKind::EventPairing => "event_pairing",
            NotificationKind::EventLive => "event_live",
            NotificationKind::EventFinished => "event_finished",
            NotificationKind::PostEventAnalysis => "post_event_analysis",
            NotificationKind::RoundGenerated => "round_generated",
            NotificationKind::WaitlistPromoted => "waitlist_promoted",
            NotificationKind::PlayerWithdrawn => "player_withdrawn",
            NotificationKind::EventCancelled => "event_cancelled",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template_key())
    }
}

/// One user-facing message about an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub event_id: String,
    pub event_name: String,
    /// Participant identities the message concerns
    pub recipients: Vec<String>,
    pub parameters: HashMap<String, String>,
}

impl Notification {
    pub fn for_event(kind: NotificationKind, event: &Event) -> Self {
        Self {
            kind,
            event_id: event.id.clone(),
            event_name: event.name.clone(),
            recipients: Vec::new(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<String>) -> Self {
        self.recipients = recipients;
        self
    }
}

/// Destination for lifecycle notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Sink that writes notifications to the log only
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        info!(
            kind = %notification.kind,
            event_id = %notification.event_id,
            recipients = notification.recipients.len(),
            parameters = ?notification.parameters,
            "Notification"
        );
        Ok(())
    }
}

/// Message template structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub key: String,
    pub content: HashMap<String, String>, // language -> content mapping
}

/// Notification statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_by_template: HashMap<String, u64>,
}

/// Telegram delivery to the configured operator chats
pub struct NotificationService {
    bot: Bot,
    language: String,
    admin_chat_ids: Vec<ChatId>,
    templates: HashMap<String, MessageTemplate>,
    stats: Mutex<NotificationStats>,
}

impl NotificationService {
    pub fn new(bot: Bot, config: &TelegramConfig) -> Self {
        Self {
            bot,
            language: config.language.clone(),
            admin_chat_ids: config.admin_chat_ids.iter().map(|&id| ChatId(id)).collect(),
            templates: Self::load_default_templates(),
            stats: Mutex::new(NotificationStats::default()),
        }
    }

    /// Build the bot from configuration, honouring an API endpoint override
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PadelTowerError::Config("Telegram token is not configured".to_string()))?;

        let mut bot = Bot::new(token);
        if let Some(api_url) = &config.api_url {
            let url = url::Url::parse(api_url)
                .map_err(|e| PadelTowerError::Config(format!("Invalid Telegram API URL {}: {}", api_url, e)))?;
            bot = bot.set_api_url(url);
        }

        Ok(Self::new(bot, config))
    }

    /// Format message using template and parameters
    pub fn format_message(&self, notification: &Notification) -> Result<String> {
        let template_key = notification.kind.template_key();
        let template = self.templates.get(template_key)
            .ok_or_else(|| PadelTowerError::InvalidInput(format!("Template not found: {}", template_key)))?;

        let content = template.content.get(&self.language)
            .or_else(|| template.content.get(DEFAULT_LANGUAGE))
            .ok_or_else(|| PadelTowerError::InvalidInput(format!("Template content not found for language: {}", self.language)))?;

        let event_name = html::escape(&truncate_text(&notification.event_name, MAX_EVENT_NAME));
        let mut formatted = content.replace("{event_name}", &event_name);
        for (key, value) in &notification.parameters {
            let placeholder = format!("{{{}}}", key);
            formatted = formatted.replace(&placeholder, &html::escape(value));
        }

        Ok(formatted)
    }

    /// Snapshot of delivery statistics
    pub async fn get_stats(&self) -> NotificationStats {
        self.stats.lock().await.clone()
    }

    /// Add or update a message template
    pub fn add_template(&mut self, template: MessageTemplate) {
        self.templates.insert(template.key.clone(), template);
    }

    pub fn get_template_keys(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    async fn record(&self, template_key: &str, success: bool) {
        let mut stats = self.stats.lock().await;
        if success {
            stats.total_sent += 1;
            *stats.sent_by_template.entry(template_key.to_string()).or_insert(0) += 1;
        } else {
            stats.total_failed += 1;
        }
    }

    /// Load default message templates
    fn load_default_templates() -> HashMap<String, MessageTemplate> {
        let entries: [(&str, &str, &str); 8] = [
            (
                "event_pairing",
                "🎾 <b>{event_name}</b>\nEmpieza el emparejamiento. Comienza el {start}.",
                "🎾 <b>{event_name}</b>\nPairing has started. Starts {start}.",
            ),
            (
                "event_live",
                "🟢 <b>{event_name}</b> está en juego.",
                "🟢 <b>{event_name}</b> is live.",
            ),
            (
                "event_finished",
                "🏁 <b>{event_name}</b> ha finalizado.",
                "🏁 <b>{event_name}</b> has finished.",
            ),
            (
                "post_event_analysis",
                "📊 <b>{event_name}</b>\nEl análisis del entreno está disponible.",
                "📊 <b>{event_name}</b>\nThe training analysis is available.",
            ),
            (
                "round_generated",
                "🔄 <b>{event_name}</b>\nRonda {round} generada ({matches} partidos).",
                "🔄 <b>{event_name}</b>\nRound {round} generated ({matches} matches).",
            ),
            (
                "waitlist_promoted",
                "✅ <b>{event_name}</b>\n{player_name} entra desde la lista de espera.",
                "✅ <b>{event_name}</b>\n{player_name} joins from the waitlist.",
            ),
            (
                "player_withdrawn",
                "👋 <b>{event_name}</b>\n{player_name} se ha retirado.",
                "👋 <b>{event_name}</b>\n{player_name} has withdrawn.",
            ),
            (
                "event_cancelled",
                "❌ <b>{event_name}</b> ha sido cancelado.",
                "❌ <b>{event_name}</b> has been cancelled.",
            ),
        ];

        entries
            .into_iter()
            .map(|(key, es, en)| {
                let mut content = HashMap::new();
                content.insert("es".to_string(), es.to_string());
                content.insert("en".to_string(), en.to_string());
                (key.to_string(), MessageTemplate { key: key.to_string(), content })
            })
            .collect()
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn notify(&self, notification: Notification) -> Result<()> {
        let template_key = notification.kind.template_key();
        let text = self.format_message(&notification)?;

        if self.admin_chat_ids.is_empty() {
            warn!(template_key = template_key, "No admin chats configured for notifications");
            return Ok(());
        }

        let mut last_error = None;
        for &chat_id in &self.admin_chat_ids {
            debug!(chat_id = ?chat_id, template_key = template_key, "Sending notification");
            match self.bot.send_message(chat_id, text.clone()).parse_mode(ParseMode::Html).send().await {
                Ok(_) => {
                    self.record(template_key, true).await;
                    info!(chat_id = ?chat_id, template_key = template_key, event_id = %notification.event_id, "Notification sent successfully");
                }
                Err(e) => {
                    self.record(template_key, false).await;
                    error!(chat_id = ?chat_id, template_key = template_key, error = %e, "Failed to send notification");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(PadelTowerError::Telegram(e)),
            None => Ok(()),
        }
    }
}
