use crate::{Context, Error};
use tracing::{error, info};

/// Forget every issued track so all of them can be picked again (Admin only)
#[poise::command(prefix_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn clear_tracks(ctx: Context<'_>) -> Result<(), Error> {
    info!("clear_tracks received from {}", ctx.author().name);

    match super::dispenser(ctx.data()).clear().await {
        Ok(count) => {
            ctx.say(format!("✅ Список выданных треков очищен ({} записей).", count))
                .await?;
        }
        Err(e) => {
            error!("Failed to clear issued tracks: {}", e);
            ctx.say(format!("❌ Ошибка при очистке списка: {}", e))
                .await?;
        }
    }
    Ok(())
}
