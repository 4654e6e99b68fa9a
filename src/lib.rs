pub mod backend;
pub mod config;
pub mod error;
pub mod lightstate;
pub mod model;
pub mod routes;
pub mod server;
pub mod switch;

#[cfg(test)]
pub mod testutil;
