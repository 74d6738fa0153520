//! Least connections load balancing director.

pub mod config;
pub mod error;
pub mod load_balancer;
pub mod observability;

pub use config::schema::LeastConnConfig;
pub use error::DirectorError;
pub use load_balancer::{Backend, Health, LeastConnDirector, ProbeContext, Target};
