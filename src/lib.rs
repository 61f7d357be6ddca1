//! Load balanced request dispatch for gateway pipelines.
//!
//! A [`proxy::balancing::LoadBalancedMiddleware`] picks one backend host per request through a
//! [`load_balancing::Balancer`], points a private copy of the request at that host and hands it to
//! the next [`proxy::Proxy`] of the pipeline.

pub mod configuration;
pub mod discovery;
pub mod error;
pub mod error_response;
pub mod load_balancing;
pub mod logging;
pub mod proxy;
pub mod server;

pub use error::Error;
