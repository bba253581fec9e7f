pub mod dispenser;
pub mod forwarder;
