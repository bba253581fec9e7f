//! Date filter parsing and the random pick over catalog items.
//!
//! The pick is two-stage: a fair coin decides between audio files and links
//! (whenever both still have candidates), then one url is drawn uniformly from
//! the chosen kind. Population sizes do not weight the coin.

use crate::catalog::{CatalogItem, ItemKind};
use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid date '{0}', expected DD.MM.YYYY")]
pub struct InvalidDate(pub String);

/// Parses an optional `DD.MM.YYYY` argument into the earliest accepted posting
/// time (midnight UTC). No argument means no lower bound.
pub fn parse_since(arg: Option<&str>) -> Result<DateTime<Utc>, InvalidDate> {
    let Some(raw) = arg.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DateTime::<Utc>::MIN_UTC);
    };

    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| InvalidDate(raw.to_string()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| InvalidDate(raw.to_string()))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(midnight, Utc))
}

pub fn choose_kind<R: Rng + ?Sized>(
    audio_available: bool,
    links_available: bool,
    rng: &mut R,
) -> Option<ItemKind> {
    match (audio_available, links_available) {
        (false, false) => None,
        (true, false) => Some(ItemKind::AudioFile),
        (false, true) => Some(ItemKind::Link),
        (true, true) => Some(if rng.gen_bool(0.5) {
            ItemKind::AudioFile
        } else {
            ItemKind::Link
        }),
    }
}

/// Picks one item out of `candidates`, or `None` when there are none.
pub fn pick<'a, R: Rng + ?Sized>(
    candidates: &[&'a CatalogItem],
    rng: &mut R,
) -> Option<&'a CatalogItem> {
    let audio: Vec<&'a CatalogItem> = candidates
        .iter()
        .copied()
        .filter(|item| item.kind == ItemKind::AudioFile)
        .collect();
    let links: Vec<&'a CatalogItem> = candidates
        .iter()
        .copied()
        .filter(|item| item.kind == ItemKind::Link)
        .collect();

    let pool = match choose_kind(!audio.is_empty(), !links.is_empty(), rng)? {
        ItemKind::AudioFile => audio,
        ItemKind::Link => links,
    };
    pool.choose(rng).copied()
}
