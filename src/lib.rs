//! Coach Assist: a business-coaching chat bot core.
//!
//! Multi-step intake and offer-builder wizards persisted per user, finalized
//! into typed records through a text-generation gateway, plus coaching
//! features and admin commands over the same store.

pub mod admin;
pub mod api;
pub mod bot;
pub mod channels;
pub mod coaching;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod store;
pub mod wizard;
