use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    configuration::BotSettings,
    domain::{
        history::{SearchHistory, SearchOrigin},
        profile::SourceBackend,
        search_filters::SearchFilters,
    },
    services::{
        conversation::{Effect, Reply, SessionStore},
        exporter,
        search_pipeline::{SearchOutcome, SearchPipeline},
    },
};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);
const HISTORY_LIMIT: usize = 5;
const KEYBOARD_COLUMNS: usize = 2;

#[derive(Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Serialize)]
struct GetUpdatesQuery {
    offset: i64,
    timeout: u64,
}

#[derive(Serialize)]
struct KeyboardButton {
    text: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ReplyMarkup {
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        one_time_keyboard: bool,
        resize_keyboard: bool,
    },
    Remove {
        remove_keyboard: bool,
    },
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
    reply_markup: ReplyMarkup,
}

impl From<&[String]> for ReplyMarkup {
    fn from(options: &[String]) -> Self {
        match options.is_empty() {
            true => ReplyMarkup::Remove {
                remove_keyboard: true,
            },
            false => ReplyMarkup::Keyboard {
                keyboard: options
                    .chunks(KEYBOARD_COLUMNS)
                    .map(|row| {
                        row.iter()
                            .map(|text| KeyboardButton { text: text.clone() })
                            .collect()
                    })
                    .collect(),
                one_time_keyboard: true,
                resize_keyboard: true,
            },
        }
    }
}

/// Where the effects of one chat message are carried out.
#[async_trait]
trait EffectSink: Sync {
    async fn send(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()>;
    async fn export(&self, chat_id: i64, outcome: &SearchOutcome) -> anyhow::Result<()>;
    fn start_search(&self, chat_id: i64, filters: SearchFilters, backend: SourceBackend);
    fn history(&self, chat_id: i64) -> Reply;
}

/// Runs effects in order. A failing effect is logged and the remaining ones
/// still run, so a lost reply never strands a session in `Searching`.
/// Returns the number of failed effects.
async fn apply_effects(sink: &dyn EffectSink, chat_id: i64, effects: Vec<Effect>) -> usize {
    let mut failures = 0;

    for effect in effects {
        let result = match effect {
            Effect::Send(reply) => sink.send(chat_id, &reply).await,
            Effect::RunSearch { filters, backend } => {
                sink.start_search(chat_id, filters, backend);
                Ok(())
            }
            Effect::ExportResults(outcome) => sink.export(chat_id, &outcome).await,
            Effect::ShowHistory => {
                let reply = sink.history(chat_id);
                sink.send(chat_id, &reply).await
            }
        };

        if let Err(e) = result {
            log::error!("Failed to deliver reply to chat {}: {:#}", chat_id, e);
            failures += 1;
        }
    }
    failures
}

/// Long-polling Telegram front end driving the [`SessionStore`] state machine.
pub struct TelegramBot {
    client: Client,
    api_base: String,
    poll_timeout_secs: u64,
    sessions: SessionStore,
    pipeline: Arc<SearchPipeline>,
    history: Arc<SearchHistory>,
}

impl TelegramBot {
    pub fn new(
        settings: &BotSettings,
        token: &str,
        pipeline: Arc<SearchPipeline>,
        history: Arc<SearchHistory>,
    ) -> Result<Self, reqwest::Error> {
        // long polls hold the connection open for up to poll_timeout_secs
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.poll_timeout_secs + 10))
            .build()?;

        Ok(TelegramBot {
            client,
            api_base: format!("{}/bot{}", settings.api_url.trim_end_matches('/'), token),
            poll_timeout_secs: settings.poll_timeout_secs,
            sessions: SessionStore::new(settings.session_ttl()),
            pipeline,
            history,
        })
    }

    pub async fn run(self: Arc<Self>) {
        log::info!("Started telegram bot");
        let mut offset = 0;

        loop {
            let purged = self.sessions.purge_expired(std::time::Instant::now());
            if purged > 0 {
                log::info!("Expired {} idle bot sessions", purged);
            }

            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    log::error!("Failed to poll telegram updates: {:#}", e);
                    tokio::time::sleep(ERROR_BACKOFF).await;
                    continue;
                }
            };

            for update in updates {
                offset = update.update_id + 1;
                let Some(Message {
                    chat,
                    text: Some(text),
                }) = update.message
                else {
                    continue;
                };

                let effects = self
                    .sessions
                    .handle(chat.id, &text, std::time::Instant::now());
                apply_effects(&self, chat.id, effects).await;
            }
        }
    }

    async fn run_search(self: Arc<Self>, chat_id: i64, filters: SearchFilters, backend: SourceBackend) {
        let result = self.pipeline.search(&filters, backend).await;
        if let Ok(outcome) = &result {
            self.history
                .append(outcome.to_history_record(SearchOrigin::Bot { chat_id }));
        }

        let reply = self
            .sessions
            .complete_search(chat_id, &result, std::time::Instant::now());
        if let Err(e) = self.send_message(chat_id, &reply).await {
            log::error!("Failed to send search results to chat {}: {:#}", chat_id, e);
        }
    }

    fn history_reply(&self, chat_id: i64) -> Reply {
        let records = self.history.recent_for_chat(chat_id, HISTORY_LIMIT);
        if records.is_empty() {
            return Reply::text("No searches yet. Send /start to run one.");
        }

        let lines: Vec<String> = records
            .iter()
            .map(|record| {
                format!(
                    "{} via {}: {} profiles in {}ms",
                    record.searched_at.format("%Y-%m-%d %H:%M"),
                    record.backend,
                    record.result_count,
                    record.elapsed_ms
                )
            })
            .collect();
        Reply::text(lines.join("\n"))
    }

    async fn get_updates(&self, offset: i64) -> anyhow::Result<Vec<Update>> {
        let response = self
            .client
            .get(format!("{}/getUpdates", self.api_base))
            .query(&GetUpdatesQuery {
                offset,
                timeout: self.poll_timeout_secs,
            })
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("getUpdates request failed")?;

        Self::unwrap_response(response).await
    }

    async fn send_message(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()> {
        let response = self
            .client
            .post(format!("{}/sendMessage", self.api_base))
            .json(&SendMessageBody {
                chat_id,
                text: &reply.text,
                reply_markup: reply.options.as_slice().into(),
            })
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("sendMessage request failed")?;

        Self::unwrap_response::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn send_export(&self, chat_id: i64, outcome: &SearchOutcome) -> anyhow::Result<()> {
        let bytes = exporter::to_csv_bytes(&outcome.profiles)?;
        let document = Part::bytes(bytes)
            .file_name(exporter::export_file_name(chrono::Utc::now()))
            .mime_str("text/csv")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", format!("{} profiles", outcome.result_count))
            .part("document", document);

        let response = self
            .client
            .post(format!("{}/sendDocument", self.api_base))
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("sendDocument request failed")?;

        Self::unwrap_response::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn unwrap_response<T: DeserializeOwned>(response: reqwest::Response) -> anyhow::Result<T> {
        let status = response.status();
        let body: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("unreadable telegram response with status {}", status))?;

        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(anyhow!(
                "telegram api error {}: {}",
                status,
                body.description.unwrap_or_default()
            )),
        }
    }
}

#[async_trait]
impl EffectSink for Arc<TelegramBot> {
    async fn send(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()> {
        self.send_message(chat_id, reply).await
    }

    async fn export(&self, chat_id: i64, outcome: &SearchOutcome) -> anyhow::Result<()> {
        self.send_export(chat_id, outcome).await
    }

    fn start_search(&self, chat_id: i64, filters: SearchFilters, backend: SourceBackend) {
        tokio::spawn(self.clone().run_search(chat_id, filters, backend));
    }

    fn history(&self, chat_id: i64) -> Reply {
        self.history_reply(chat_id)
    }
}
