// akeno-admin/src/lib.rs
pub mod auth;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod routes;
pub mod utils;

#[cfg(test)]
mod tests;
