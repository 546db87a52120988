// src/address/mod.rs

pub mod binding;
pub mod cache;
pub mod handlers;
pub mod models;
pub mod prefill;
pub mod resolver;
pub mod routes;
pub mod session;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::address_routes;
