//! Socket Mode connection handler.
//!
//! Uses slack-morphism's socket mode listener to receive events over
//! WebSocket without a public HTTP endpoint, and routes them into the
//! configuration resolver.

use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    slack_morphism::prelude::*,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {
    bugseer_channels::{
        ChannelHistory, FileStore, Messenger, RefreshOptions, Resolver, ResolverSettings,
        add_reaction_with_fallback,
    },
    bugseer_rules::HttpRulesLoader,
};

use crate::{client::SlackPlatform, config::SlackAccountConfig, identity::BotIdentity};

/// Shared state for socket mode callbacks.
#[derive(Clone)]
struct SocketModeState {
    platform: Arc<SlackPlatform>,
    resolver: Arc<Resolver>,
    identity: BotIdentity,
}

/// Connect to Slack and serve events until cancelled.
///
/// Connection or auth failures are fatal and propagate to the caller.
pub async fn run(
    config: SlackAccountConfig,
    settings: ResolverSettings,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let client = Arc::new(SlackClient::new(SlackClientHyperConnector::new()?));
    let platform = Arc::new(SlackPlatform::new(
        Arc::clone(&client),
        config.bot_token.clone(),
    ));

    let identity = match platform.identity().await {
        Ok(identity) => identity,
        Err(e) => {
            error!(error = %e, "Slack authentication failed");
            return Err(e.into());
        },
    };
    info!(bot = %identity, "connected to Slack");

    let loader = Arc::new(HttpRulesLoader::new(config.bot_token.clone()));
    let resolver = Arc::new(Resolver::new(
        loader,
        Arc::clone(&platform) as Arc<dyn Messenger>,
        Arc::clone(&platform) as Arc<dyn ChannelHistory>,
        settings,
    ));

    let state = SocketModeState {
        platform,
        resolver,
        identity,
    };

    let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_events);
    let listener_env = Arc::new(
        SlackClientEventsListenerEnvironment::new(Arc::clone(&client)).with_user_state(state),
    );
    let listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_env,
        callbacks,
    );

    let app_token = SlackApiToken::new(config.app_token.expose_secret().clone().into());
    listener.listen_for(&app_token).await?;

    tokio::select! {
        _ = listener.serve() => {
            warn!("socket mode connection closed");
        }
        _ = cancel.cancelled() => {
            info!("socket mode cancelled");
        }
    }
    Ok(())
}

async fn handle_push_events(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let guard = states.read().await;
    let state = guard
        .get_user_state::<SocketModeState>()
        .ok_or("missing socket mode state")?;

    if let Err(e) = handle_push_event_inner(state, event).await {
        warn!(error = %e, "failed to handle push event");
    }
    Ok(())
}

async fn handle_push_event_inner(
    state: &SocketModeState,
    event: SlackPushEventCallback,
) -> anyhow::Result<()> {
    match event.event {
        SlackEventCallbackBody::Message(msg) => handle_message_event(state, &msg).await,
        SlackEventCallbackBody::FileShared(ev) => handle_file_shared(state, &ev).await,
        SlackEventCallbackBody::FileChange(ev) => handle_file_changed(state, &ev).await,
        SlackEventCallbackBody::MemberJoinedChannel(ev) => handle_member_joined(state, &ev).await,
        SlackEventCallbackBody::MemberLeftChannel(ev) => {
            handle_member_left(state, &ev);
            Ok(())
        },
        _ => {
            debug!("ignoring event callback type");
            Ok(())
        },
    }
}

/// Match an inbound message against the channel's loaded rules and apply
/// reaction/comment actions.
async fn handle_message_event(
    state: &SocketModeState,
    event: &SlackMessageEvent,
) -> anyhow::Result<()> {
    // Skip bot messages to prevent loops, and message subtypes (edits,
    // deletes, joins rendered as messages).
    if event.sender.bot_id.is_some() || event.subtype.is_some() {
        return Ok(());
    }
    if event
        .sender
        .user
        .as_ref()
        .is_some_and(|u| u.to_string() == state.identity.user_id)
    {
        return Ok(());
    }

    let Some(channel) = event.origin.channel.as_ref().map(ToString::to_string) else {
        return Ok(());
    };
    let text = event
        .content
        .as_ref()
        .and_then(|c| c.text.clone())
        .unwrap_or_default();
    if text.is_empty() {
        return Ok(());
    }
    let ts = event.origin.ts.to_string();

    let channel_name = state
        .platform
        .channel_name(&channel)
        .await
        .unwrap_or_else(|_| channel.clone());
    let Some(config) = state.resolver.ensure(&channel, &channel_name).await? else {
        return Ok(());
    };
    let Some(rules) = config.rules() else {
        debug!(channel, "configuration present but not loaded, skipping message");
        return Ok(());
    };

    for rule in rules.matching(&text) {
        if let Some(emoji) = &rule.emoji {
            add_reaction_with_fallback(state.platform.as_ref(), &channel, emoji, &ts).await?;
        }
        if let Some(comment) = &rule.comment {
            state
                .platform
                .post_message(&channel, comment, Some(&ts))
                .await?;
        }
    }
    Ok(())
}

/// A file was shared into a channel: force a refresh crediting the uploader.
async fn handle_file_shared(
    state: &SocketModeState,
    event: &SlackFileSharedEvent,
) -> anyhow::Result<()> {
    let channel = event.channel_id.to_string();
    let candidate = state
        .platform
        .file_object(&event.file_id.to_string())
        .await?
        .into_candidate();

    let outcome = state
        .resolver
        .refresh(&channel, vec![candidate], RefreshOptions {
            force_create: true,
            requester: Some(event.user_id.to_string()),
            ..Default::default()
        })
        .await?;
    debug!(channel, ?outcome, "processed file_shared event");
    Ok(())
}

/// A shared file was edited: refresh every channel it is shared into.
async fn handle_file_changed(
    state: &SocketModeState,
    event: &SlackFileChangedEvent,
) -> anyhow::Result<()> {
    let file = state
        .platform
        .file_object(&event.file_id.to_string())
        .await?;
    let channels = file.channels.clone();
    let candidate = file.into_candidate();

    for channel in channels {
        let outcome = state
            .resolver
            .refresh(&channel, vec![candidate.clone()], RefreshOptions {
                force_create: true,
                ..Default::default()
            })
            .await?;
        debug!(channel, ?outcome, "processed file_change event");
    }
    Ok(())
}

/// The bot joined a channel: proactively scan its uploads. Treated like a
/// history replay so the channel isn't greeted with a success notice.
async fn handle_member_joined(
    state: &SocketModeState,
    event: &SlackMemberJoinedChannelEvent,
) -> anyhow::Result<()> {
    if event.user.to_string() != state.identity.user_id {
        return Ok(());
    }
    let channel = event.channel.to_string();
    let file_type = state.resolver.settings().file_type.clone();
    let files = state.platform.list_files(&channel, &file_type).await?;

    let outcome = state
        .resolver
        .refresh(&channel, files, RefreshOptions {
            from_history: true,
            force_create: true,
            ..Default::default()
        })
        .await?;
    info!(channel, ?outcome, "scanned channel uploads on join");
    Ok(())
}

/// The bot was removed from a channel: drop its configuration.
fn handle_member_left(state: &SocketModeState, event: &SlackMemberLeftChannelEvent) {
    if event.user.to_string() == state.identity.user_id {
        state.resolver.reset(&event.channel.to_string());
    }
}
