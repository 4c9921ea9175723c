//! Slack implementation of the chat client, using socket mode.

use crate::{
    base::{
        config::Config,
        types::{InboundMessage, Res, Void},
    },
    interaction::{self, scheduler::Scheduler},
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tracing::{debug, info, instrument, warn};

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config, scheduler: Scheduler) -> Res<Self> {
        let client = SlackChatClient::new(config, scheduler).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<SlackChatClient> for ChatClient {
    fn from(client: SlackChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    scheduler: Scheduler,
    chat: ChatClient,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    pub app_token: SlackApiToken,
    pub bot_token: SlackApiToken,
    pub bot_user_id: String,
    pub client: Arc<FullClient>,
    pub scheduler: Scheduler,
}

impl Deref for SlackChatClient {
    type Target = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config, scheduler: Scheduler) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
            scheduler,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState {
            scheduler: self.scheduler.clone(),
            chat: ChatClient::from(self.clone()),
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections, and run until asked to stop.
        socket_mode_listener.start().await;

        crate::runtime::shutdown_signal().await;

        info!("Shutting down ...");
        socket_mode_listener.shutdown().await;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn send_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message)
            .with_as_user(true)
            .with_thread_ts(SlackTs(thread_ts.to_string()));

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn resolve_contact(&self, user_id: &str) -> Res<Option<String>> {
        let request = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));

        let session = self.client.open_session(&self.bot_token);

        let response = session.users_info(&request).await.map_err(|e| anyhow::anyhow!("Failed to get user info: {}", e))?;
        let user = response.user;

        let profile = user.profile.as_ref();
        let candidates = [
            profile.and_then(|p| p.display_name.clone()),
            profile.and_then(|p| p.real_name.clone()),
            user.name.clone(),
        ];

        Ok(candidates.into_iter().flatten().map(|name| name.trim().to_string()).find(|name| !name.is_empty()))
    }
}

// Conversion from Slack events.

/// Converts a Slack message event into an inbound message, if it is a plain user message.
fn inbound_message(event: &SlackMessageEvent, bot_user_id: &str) -> Option<InboundMessage> {
    // Edits, joins, bot posts, etc. all carry a subtype.
    if event.subtype.is_some() {
        return None;
    }

    let sender_id = event.sender.user.as_ref()?.0.clone();
    if sender_id == bot_user_id {
        return None;
    }

    let conversation_id = event.origin.channel.as_ref()?.0.clone();
    let text = event.content.as_ref().and_then(|c| c.text.clone())?;
    let message_id = event.origin.ts.0.clone();
    let timestamp = parse_ts(&message_id)?;
    let replied_to = reply_parent(&message_id, event.origin.thread_ts.as_ref().map(|ts| ts.0.as_str()));

    Some(InboundMessage {
        text,
        sender_id,
        conversation_id,
        message_id,
        replied_to,
        timestamp,
    })
}

/// Whole seconds of a Slack `ts` such as `1700000000.123456`.
fn parse_ts(ts: &str) -> Option<i64> {
    ts.split('.').next()?.parse().ok()
}

/// The parent of a threaded message; a thread root carries its own `ts` as `thread_ts`.
fn reply_parent(ts: &str, thread_ts: Option<&str>) -> Option<String> {
    thread_ts.filter(|parent| *parent != ts).map(str::to_string)
}

// Socket mode listener callbacks for Slack.

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;

    let (scheduler, chat) = {
        let states = states.read().await;
        let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;
        (user_state.scheduler.clone(), user_state.chat.clone())
    };

    match event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            let Some(message) = inbound_message(&slack_message_event, chat.bot_user_id()) else {
                debug!("Skipping message event that is not a plain user message.");
                return Ok(());
            };

            info!("Received message event ...");

            interaction::chat_event::handle_chat_event(message, scheduler, chat).await;
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ts() {
        assert_eq!(parse_ts("1700000000.123456"), Some(1_700_000_000));
        assert_eq!(parse_ts("1700000000"), Some(1_700_000_000));
        assert_eq!(parse_ts("not-a-ts"), None);
    }

    fn event(user: Option<&str>, ts: &str, thread_ts: Option<&str>, text: &str) -> SlackMessageEvent {
        let mut origin = SlackMessageOrigin::new(SlackTs(ts.to_string())).with_channel(SlackChannelId("C0RALLY".to_string()));
        if let Some(thread_ts) = thread_ts {
            origin = origin.with_thread_ts(SlackTs(thread_ts.to_string()));
        }

        let mut sender = SlackMessageSender::new();
        if let Some(user) = user {
            sender = sender.with_user(SlackUserId(user.to_string()));
        }

        SlackMessageEvent::new(origin, sender).with_content(SlackMessageContent::new().with_text(text.to_string()))
    }

    #[test]
    fn test_inbound_top_level_message() {
        let message = inbound_message(&event(Some("U0ALICE"), "1700000010.000100", None, "_?_"), "U0BOT").unwrap();

        assert_eq!(
            message,
            InboundMessage {
                text: "_?_".to_string(),
                sender_id: "U0ALICE".to_string(),
                conversation_id: "C0RALLY".to_string(),
                message_id: "1700000010.000100".to_string(),
                replied_to: None,
                timestamp: 1_700_000_010,
            }
        );
    }

    #[test]
    fn test_inbound_threaded_reply() {
        let message = inbound_message(&event(Some("U0BOB"), "1700000020.000100", Some("1700000010.000100"), "+1"), "U0BOT").unwrap();

        assert_eq!(message.replied_to.as_deref(), Some("1700000010.000100"));
        assert_eq!(message.thread_anchor(), "1700000010.000100");
        assert_eq!(message.timestamp, 1_700_000_020);
    }

    #[test]
    fn test_inbound_skips() {
        let with_subtype = event(Some("U0ALICE"), "1700000010.000100", None, "_?_").with_subtype(SlackMessageEventType::MessageChanged);
        let without_user = event(None, "1700000010.000100", None, "_?_");
        let from_bot = event(Some("U0BOT"), "1700000010.000100", None, "_?_");

        assert_eq!(inbound_message(&with_subtype, "U0BOT"), None);
        assert_eq!(inbound_message(&without_user, "U0BOT"), None);
        assert_eq!(inbound_message(&from_bot, "U0BOT"), None);
    }

    #[test]
    fn test_reply_parent() {
        assert_eq!(reply_parent("1700000001.000100", None), None);
        assert_eq!(reply_parent("1700000001.000100", Some("1700000001.000100")), None);
        assert_eq!(reply_parent("1700000002.000100", Some("1700000001.000100")), Some("1700000001.000100".to_string()));
    }
}
