use crate::delivery::{Delivery, LastDelivery};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("nothing has been delivered yet")]
    NothingToForward,
    #[error("forward channel not found")]
    DestinationNotFound,
    #[error("{0}")]
    Send(String),
}

/// Where `cool` re-posts the last pick.
#[async_trait]
pub trait ForwardTarget: Send + Sync {
    async fn exists(&self) -> bool;
    async fn post(&self, delivery: &Delivery) -> Result<(), String>;
}

pub struct ChannelTarget {
    ctx: serenity::Context,
    channel_id: serenity::ChannelId,
}

impl ChannelTarget {
    pub fn new(ctx: serenity::Context, channel_id: serenity::ChannelId) -> Self {
        Self { ctx, channel_id }
    }
}

#[async_trait]
impl ForwardTarget for ChannelTarget {
    async fn exists(&self) -> bool {
        match self.channel_id.to_channel(&self.ctx).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Forward channel {} not found: {}", self.channel_id, e);
                false
            }
        }
    }

    async fn post(&self, delivery: &Delivery) -> Result<(), String> {
        self.channel_id
            .send_message(&self.ctx.http, delivery.to_message())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Re-posts the most recent delivery into `target`.
pub async fn forward_last(
    last: &LastDelivery,
    target: &dyn ForwardTarget,
) -> Result<Delivery, ForwardError> {
    let delivery = last.get().ok_or(ForwardError::NothingToForward)?;
    if !target.exists().await {
        return Err(ForwardError::DestinationNotFound);
    }
    target
        .post(&delivery)
        .await
        .map_err(ForwardError::Send)?;
    info!("Forwarded {}", delivery.url);
    Ok(delivery)
}
