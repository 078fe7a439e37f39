pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod normalize;
pub mod presence;
pub mod reconciler;
pub mod resolver;
pub mod snapshot;
pub mod template;
