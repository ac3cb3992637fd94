pub mod api;
pub mod core;
pub mod handlers;
pub mod models;
pub mod security;
pub mod services;
pub mod session;
pub mod stores;
pub mod utils;
