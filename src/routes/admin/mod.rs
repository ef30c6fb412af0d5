//! Back-office routes. Every router here sits behind `admins_authorization`.

pub mod categories;
pub mod products;
pub mod profiles;
pub mod quote_requests;
pub mod stats;
