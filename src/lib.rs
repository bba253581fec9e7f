pub mod catalog;
pub mod commands;
pub mod config;
pub mod db;
pub mod delivery;
pub mod scanner;
pub mod selection;
pub mod services;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub http_client: reqwest::Client,
    pub db: db::Database,
    /// Latest scan of the source channel, swapped wholesale by the loader
    pub catalog: catalog::CatalogHandle,
    pub last_delivery: delivery::LastDelivery,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
