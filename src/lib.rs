pub mod access;
pub mod auth;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod pricing;
pub mod sql;
pub mod tls;
pub mod wire;
