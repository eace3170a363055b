// Library exports for Warble
// This allows integration tests and external code to use Warble modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod flash;
pub mod routes;
pub mod state;
