// Service layer: business logic over the database pool.
pub mod activity_log;
pub mod consumption_recorder;
pub mod feed_ledger;
pub mod flocks;
