use crate::catalog::{CatalogHandle, CatalogItem};
use crate::db::Database;
use crate::delivery::{AudioFetcher, Delivery, FetchError};
use crate::selection;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DispenseError {
    #[error("catalog not loaded yet")]
    NotLoaded,
    #[error("nothing posted on or after the requested date")]
    NothingForDate,
    #[error("every matching item has already been issued")]
    AllIssued,
    #[error(transparent)]
    Download(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A delivery whose url is claimed in the issuance store under `claim_id`.
#[derive(Debug)]
pub struct Issued {
    pub claim_id: i64,
    pub delivery: Delivery,
}

/// Picks unissued catalog items and claims them in the issuance store.
pub struct Dispenser<F> {
    db: Database,
    catalog: CatalogHandle,
    fetcher: F,
}

impl<F: AudioFetcher> Dispenser<F> {
    pub fn new(db: Database, catalog: CatalogHandle, fetcher: F) -> Self {
        Self {
            db,
            catalog,
            fetcher,
        }
    }

    pub async fn dispense(&self, since: DateTime<Utc>) -> Result<Issued, DispenseError> {
        let mut rng = StdRng::from_entropy();
        self.dispense_with(since, &mut rng).await
    }

    /// On success the returned item is already recorded as issued. If posting
    /// it fails afterwards, call [`Dispenser::release`].
    pub async fn dispense_with<R: Rng + Send>(
        &self,
        since: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Issued, DispenseError> {
        let catalog = self.catalog.snapshot();
        if catalog.is_empty() {
            return Err(DispenseError::NotLoaded);
        }

        let candidates = catalog.since(since);
        if candidates.is_empty() {
            return Err(DispenseError::NothingForDate);
        }

        let urls: Vec<String> = candidates.iter().map(|item| item.url.clone()).collect();
        let issued = self
            .db
            .run_blocking(move |db| db.issued_subset(&urls))
            .await?;
        let mut remaining: Vec<&CatalogItem> = candidates
            .into_iter()
            .filter(|item| !issued.contains(&item.url))
            .collect();

        let (item, claim_id) = loop {
            let item = selection::pick(&remaining, rng).ok_or(DispenseError::AllIssued)?;
            let url = item.url.clone();
            if let Some(claim_id) = self.db.run_blocking(move |db| db.claim(&url)).await? {
                break (item, claim_id);
            }
            // Someone else issued it between the subset query and the claim.
            debug!("Lost claim on {}, picking again", item.url);
            remaining.retain(|candidate| candidate.url != item.url);
        };

        match Delivery::prepare(item, &self.fetcher).await {
            Ok(delivery) => {
                info!("Issued {:?} {}", delivery.kind, delivery.url);
                Ok(Issued { claim_id, delivery })
            }
            Err(e) => {
                warn!("Download of {} failed: {}", item.url, e);
                self.release(claim_id).await?;
                Err(e.into())
            }
        }
    }

    /// Returns a claimed url to the pool after a delivery that never reached
    /// the channel.
    pub async fn release(&self, claim_id: i64) -> anyhow::Result<()> {
        self.db.run_blocking(move |db| db.release(claim_id)).await
    }

    pub async fn clear(&self) -> anyhow::Result<usize> {
        let cleared = self.db.run_blocking(|db| db.clear_all()).await?;
        info!("Cleared {} issued tracks", cleared);
        Ok(cleared)
    }
}
