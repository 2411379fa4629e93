// src/lib.rs

pub mod app;
pub mod config;
pub mod core;
pub mod gateway;
pub mod llm;
pub mod logging;
pub mod report;
