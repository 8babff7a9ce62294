//! Windowscape: media job dispatch and priority scheduling service.

pub mod config;
pub mod engine;
pub mod error;
pub mod processors;
pub mod remote;
pub mod server;
