pub mod api;
pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod cart;
pub mod catalog_events;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod profiles;
pub mod quotes;
pub mod routes;
pub mod schema;
pub mod search_history;
pub mod stats;
pub mod storage;
