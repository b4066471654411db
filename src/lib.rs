pub mod cache;
pub mod calendar;
pub mod catalog;
pub mod channel;
pub mod config;
pub mod engine;
pub mod invalidation;
pub mod limits;
pub mod model;
pub mod observability;
pub mod reaper;
pub mod service;
