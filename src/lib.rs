pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod markdown;
pub mod recipients;
pub mod settings_panel;
pub mod storage;
pub mod toast;
pub mod utils;

#[cfg(feature = "gui")]
pub mod app;
#[cfg(feature = "gui")]
pub mod ui;
