//! Core viewer settings

pub mod config;
