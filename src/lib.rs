//! Bracketline Core Library
//!
//! Bracketline mirrors externally-placed futures bracket orders as stop-loss /
//! take-profit overlay lines on a third-party chart surface. It merges order
//! signals from intercepted network calls, polled order-entry fields, and
//! persisted state into one authoritative order record, and pushes bracket
//! updates back to the platform when the user drags a line.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
