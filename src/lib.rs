pub mod app;
pub mod cache;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod library;
pub mod model;
pub mod shell;
pub mod ui;
