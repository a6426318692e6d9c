pub mod api;
pub mod auth;
pub mod cli;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod services;
pub mod settings;
pub mod store;
pub mod summary;
