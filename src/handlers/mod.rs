pub mod common;
pub mod feed;
pub mod flocks;
pub mod health;
