pub mod app_state;
pub mod config;
pub mod entities;
pub mod extractor;
pub mod fetcher;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod pingback;
pub mod repositories;
pub mod site;
pub mod xmlrpc;
