pub mod broadcast;
pub mod config;
pub mod data_center;
pub mod db;
pub mod guard;
pub mod handlers;
pub mod keyboards;
pub mod scheduler;
pub mod server;
pub mod texts;
pub mod types;
