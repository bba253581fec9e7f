use crate::selection::parse_since;
use crate::services::dispenser::DispenseError;
use crate::services::forwarder::{forward_last, ChannelTarget, ForwardError};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

const NOT_LOADED: &str = "Аудиофайлы и ссылки пока не загружены.";
const BAD_DATE: &str = "Укажите действительную дату в формате: DD.MM.YYYY.";
const NOTHING_FOR_DATE: &str = "На указанную дату нет доступных аудиофайлов или ссылок.";
const ALL_ISSUED: &str = "Все аудиофайлы и ссылки уже были выданы.";
const NOTHING_TO_FORWARD: &str = "Нечего пересылать: сначала выполните команду run.";
const DESTINATION_NOT_FOUND: &str = "Канал для пересылки не найден.";

/// Send a random unissued track or link, optionally only those posted since DD.MM.YYYY
#[poise::command(prefix_command)]
pub async fn run(
    ctx: Context<'_>,
    #[description = "Earliest posting date, DD.MM.YYYY"] date: Option<String>,
) -> Result<(), Error> {
    if ctx.data().catalog.snapshot().is_empty() {
        ctx.say(NOT_LOADED).await?;
        return Ok(());
    }

    let since = match parse_since(date.as_deref()) {
        Ok(since) => since,
        Err(e) => {
            info!("Rejected run from {}: {}", ctx.author().name, e);
            ctx.say(BAD_DATE).await?;
            return Ok(());
        }
    };

    let dispenser = super::dispenser(ctx.data());
    let issued = match dispenser.dispense(since).await {
        Ok(issued) => issued,
        Err(e) => {
            if let DispenseError::Store(inner) = &e {
                error!("Issuance store failure: {:?}", inner);
            }
            ctx.say(dispense_reply(&e)).await?;
            return Ok(());
        }
    };

    let delivery = issued.delivery;
    if let Err(e) = ctx.send(delivery.to_reply()).await {
        error!("Failed to post {}: {}", delivery.url, e);
        dispenser.release(issued.claim_id).await?;
        return Err(e.into());
    }

    info!("Delivered {} to {}", delivery.url, ctx.author().name);
    ctx.data().last_delivery.set(delivery);
    Ok(())
}

/// Forward the most recent pick into the forward channel
#[poise::command(prefix_command)]
pub async fn cool(ctx: Context<'_>) -> Result<(), Error> {
    let destination = serenity::ChannelId::new(ctx.data().config.forward_channel_id);
    let target = ChannelTarget::new(ctx.serenity_context().clone(), destination);

    let reply = match forward_last(&ctx.data().last_delivery, &target).await {
        Ok(_) => format!("✅ Переслано в <#{}>.", destination),
        Err(e) => {
            if let ForwardError::Send(reason) = &e {
                error!("Failed to forward to {}: {}", destination, reason);
            }
            forward_reply(&e)
        }
    };
    ctx.say(reply).await?;
    Ok(())
}

fn dispense_reply(error: &DispenseError) -> String {
    match error {
        DispenseError::NotLoaded => NOT_LOADED.to_string(),
        DispenseError::NothingForDate => NOTHING_FOR_DATE.to_string(),
        DispenseError::AllIssued => ALL_ISSUED.to_string(),
        DispenseError::Download(e) => format!("❌ Ошибка при загрузке аудиофайла: {}", e),
        DispenseError::Store(e) => format!("❌ Ошибка базы данных: {}", e),
    }
}

fn forward_reply(error: &ForwardError) -> String {
    match error {
        ForwardError::NothingToForward => NOTHING_TO_FORWARD.to_string(),
        ForwardError::DestinationNotFound => DESTINATION_NOT_FOUND.to_string(),
        ForwardError::Send(reason) => format!("❌ Ошибка при пересылке: {}", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::FetchError;

    #[test]
    fn test_dispense_replies() {
        assert_eq!(dispense_reply(&DispenseError::NotLoaded), NOT_LOADED);
        assert_eq!(dispense_reply(&DispenseError::NothingForDate), NOTHING_FOR_DATE);
        assert_eq!(dispense_reply(&DispenseError::AllIssued), ALL_ISSUED);
        assert_eq!(
            dispense_reply(&DispenseError::Download(FetchError::Status(404))),
            "❌ Ошибка при загрузке аудиофайла: Failed to download file: 404"
        );
        assert!(dispense_reply(&DispenseError::Store(anyhow::anyhow!("disk full")))
            .contains("disk full"));
    }

    #[test]
    fn test_forward_replies() {
        assert_eq!(forward_reply(&ForwardError::NothingToForward), NOTHING_TO_FORWARD);
        assert_eq!(
            forward_reply(&ForwardError::DestinationNotFound),
            DESTINATION_NOT_FOUND
        );
        assert_eq!(
            forward_reply(&ForwardError::Send("Missing Access".to_string())),
            "❌ Ошибка при пересылке: Missing Access"
        );
    }
}
