pub mod activity_log;
pub mod consumption_deduction;
pub mod feed_batch;
pub mod feed_consumption;
pub mod flock;
