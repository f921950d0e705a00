//! # Feed Bot
//!
//! A Telegram bot that watches RSS/Atom feeds and posts new entries to chats.
//!
//! ## Features
//! - Feed subscriptions with per-feed "last seen" cursors
//! - Three-stage fetching: direct, cleaned-up text, headless browser render
//! - Include/exclude keyword filtering
//! - Reminders
//! - Admin HTTP API with health probes
//! - Persistent storage with SQLite

/// Bot command handlers and message processing
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Error types for the feed pipeline
pub mod error;
/// Fetching, parsing, diffing and filtering feeds
pub mod feeds;
/// Background jobs, delivery, alerts and the admin API
pub mod services;
/// Utility functions for datetime, validation, and formatting
pub mod utils;
