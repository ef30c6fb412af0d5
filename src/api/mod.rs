//! Outbound calls to services the quote service depends on.

pub mod notifications;
