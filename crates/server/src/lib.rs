//! HTTP surface of the chaos usage service

pub mod api;
pub mod config;
