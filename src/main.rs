use poise::serenity_prelude as serenity;
use std::time::Duration;
use tracing::{error, info};
use trackbox::commands::{admin, tracks};
use trackbox::{config::Config, Data, Error};

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Command '{}' failed: {}", ctx.command().name, error);
            let _ = ctx.say(format!("❌ Ошибка: {}", error)).await;
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();
    let prefix = config.command_prefix.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![tracks::run(), tracks::cool(), admin::clear_tracks()],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, _framework| {
            Box::pin(async move {
                info!("We have logged in as {}", ready.user.name);

                let db = trackbox::db::Database::new(&config)?;
                db.execute_init()?;

                let http_client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.http_timeout_secs))
                    .build()?;

                let catalog = trackbox::catalog::CatalogHandle::new();
                let loader = trackbox::scanner::CatalogLoader::new(
                    ctx.clone(),
                    serenity::ChannelId::new(config.source_channel_id),
                    catalog.clone(),
                    Duration::from_secs(config.catalog_refresh_secs.max(1)),
                );
                tokio::spawn(loader.run());

                Ok(Data {
                    config,
                    http_client,
                    db,
                    catalog,
                    last_delivery: trackbox::delivery::LastDelivery::new(),
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
