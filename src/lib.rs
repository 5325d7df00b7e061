//! LigaBairro - neighborhood mutual-aid marketplace.
//!
//! Neighbors post help requests inside a fixed service area, helpers apply,
//! the requester accepts one helper, the pair chat in real time, and both
//! review each other once the request is completed.

pub mod auth;
pub mod cli;
pub mod config;
pub mod geo;
pub mod images;
pub mod models;
pub mod realtime;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
