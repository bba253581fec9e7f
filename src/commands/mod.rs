pub mod admin;
pub mod tracks;

use crate::delivery::HttpFetcher;
use crate::services::dispenser::Dispenser;
use crate::Data;

fn dispenser(data: &Data) -> Dispenser<HttpFetcher> {
    Dispenser::new(
        data.db.clone(),
        data.catalog.clone(),
        HttpFetcher::new(data.http_client.clone()),
    )
}
