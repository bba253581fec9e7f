use crate::catalog::{extract_items, Catalog, CatalogHandle, ItemKind};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use ::serenity::futures::{Stream, StreamExt};
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub audio_files: usize,
    pub links: usize,
    pub messages: usize,
    /// False when the history walk stopped on an error.
    pub complete: bool,
}

/// Rebuilds the catalog from the source channel's full history.
pub struct CatalogLoader {
    ctx: serenity::Context,
    channel_id: serenity::ChannelId,
    catalog: CatalogHandle,
    interval: Duration,
}

impl CatalogLoader {
    pub fn new(
        ctx: serenity::Context,
        channel_id: serenity::ChannelId,
        catalog: CatalogHandle,
        interval: Duration,
    ) -> Self {
        Self {
            ctx,
            channel_id,
            catalog,
            interval,
        }
    }

    /// Scans immediately, then once per interval.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // A scan longer than the interval must not trigger back-to-back rescans.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(outcome) = self.refresh().await {
                debug!("Catalog loader: {:?}", outcome);
            }
        }
    }

    /// Returns `None` when the channel is unusable; the catalog is left as is.
    pub async fn refresh(&self) -> Option<ScanOutcome> {
        let channel = match self.channel_id.to_channel(&self.ctx).await {
            Ok(channel) => channel,
            Err(e) => {
                error!("Channel with ID {} not found: {}", self.channel_id, e);
                return None;
            }
        };

        if let serenity::Channel::Guild(guild_channel) = &channel {
            match self.can_read_history(guild_channel) {
                Some(true) => {}
                Some(false) => {
                    error!(
                        "Bot does not have permission to read message history in channel {}",
                        self.channel_id
                    );
                    return None;
                }
                None => {
                    warn!(
                        "Could not resolve permissions in channel {}, scanning anyway",
                        self.channel_id
                    );
                }
            }
        }

        let messages = self.channel_id.messages_iter(&self.ctx.http).boxed();
        let (catalog, outcome) = collect_history(messages).await;
        self.catalog.replace(catalog);

        info!(
            "Loaded {} audio files and {} links from {} messages",
            outcome.audio_files, outcome.links, outcome.messages
        );
        Some(outcome)
    }

    /// `None` while the guild or the bot's member is not cached yet.
    fn can_read_history(&self, channel: &serenity::GuildChannel) -> Option<bool> {
        let bot_id = self.ctx.cache.current_user().id;
        let guild = self.ctx.cache.guild(channel.guild_id)?;
        let member = guild.members.get(&bot_id)?;
        Some(
            guild
                .user_permissions_in(channel, member)
                .read_message_history(),
        )
    }
}

/// Walks a message history stream into a fresh catalog. An error ends the
/// walk; whatever was collected before it is kept.
pub async fn collect_history<S>(mut messages: S) -> (Catalog, ScanOutcome)
where
    S: Stream<Item = ::serenity::Result<serenity::Message>> + Unpin,
{
    let mut catalog = Catalog::new();
    let mut outcome = ScanOutcome {
        complete: true,
        ..Default::default()
    };

    while let Some(message) = messages.next().await {
        match message {
            Ok(message) => {
                outcome.messages += 1;
                ingest_message(&mut catalog, &message);
            }
            Err(e) => {
                error!("Error loading messages: {}", e);
                outcome.complete = false;
                break;
            }
        }
    }

    outcome.audio_files = catalog.count(ItemKind::AudioFile);
    outcome.links = catalog.count(ItemKind::Link);
    (catalog, outcome)
}

/// Adds the deliverable items of one message. Bot messages are ignored.
pub fn ingest_message(catalog: &mut Catalog, message: &serenity::Message) {
    if message.author.bot {
        return;
    }

    let posted_at = DateTime::<Utc>::from_timestamp(message.timestamp.unix_timestamp(), 0)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let author_name = message
        .author
        .global_name
        .as_deref()
        .unwrap_or(&message.author.name);
    let attachments = message
        .attachments
        .iter()
        .map(|a| (a.url.as_str(), a.content_type.as_deref()));

    for item in extract_items(&message.content, attachments, posted_at, author_name) {
        debug!("Added {:?}: {}", item.kind, item.url);
        catalog.insert(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::{Message, MessageId, User, UserId};

    fn mock_message(id: u64, content: &str, username: &str, bot: bool) -> Message {
        let mut msg = Message::default();
        msg.id = MessageId::new(id);
        msg.author = User::default();
        msg.author.id = UserId::new(id + 100);
        msg.author.name = username.to_string();
        msg.author.bot = bot;
        msg.content = content.to_string();
        msg
    }

    #[test]
    fn test_ingest_collects_links() {
        let mut catalog = Catalog::new();
        ingest_message(
            &mut catalog,
            &mock_message(1, "new banger https://youtu.be/xyz", "alice", false),
        );

        assert_eq!(catalog.len(), 1);
        let item = catalog.get("https://youtu.be/xyz").unwrap();
        assert_eq!(item.kind, ItemKind::Link);
        assert_eq!(item.author_name, "alice");
    }

    #[test]
    fn test_ingest_prefers_display_name() {
        let mut catalog = Catalog::new();
        let mut msg = mock_message(2, "https://example.com/song", "alice_01", false);
        msg.author.global_name = Some("Alice".to_string());
        ingest_message(&mut catalog, &msg);

        assert_eq!(catalog.get("https://example.com/song").unwrap().author_name, "Alice");
    }

    #[test]
    fn test_ingest_skips_bots() {
        let mut catalog = Catalog::new();
        ingest_message(
            &mut catalog,
            &mock_message(3, "https://example.com/from-bot", "robot", true),
        );
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_collect_history_full_walk() {
        let history = ::serenity::futures::stream::iter(vec![
            Ok(mock_message(10, "https://example.com/newest", "alice", false)),
            Ok(mock_message(11, "https://example.com/bot", "robot", true)),
            Ok(mock_message(12, "no links here", "bob", false)),
        ]);

        let (catalog, outcome) = collect_history(history).await;
        assert!(outcome.complete);
        assert_eq!(outcome.messages, 3);
        assert_eq!(outcome.links, 1);
        assert_eq!(outcome.audio_files, 0);
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_collect_history_keeps_partial_catalog_on_error() {
        let history = ::serenity::futures::stream::iter(vec![
            Ok(mock_message(20, "https://example.com/first", "alice", false)),
            Err(::serenity::Error::Other("history page failed")),
            Ok(mock_message(21, "https://example.com/never-reached", "bob", false)),
        ]);

        let (catalog, outcome) = collect_history(history).await;
        assert!(!outcome.complete);
        assert_eq!(outcome.messages, 1);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("https://example.com/first").is_some());
        assert!(catalog.get("https://example.com/never-reached").is_none());
    }
}
