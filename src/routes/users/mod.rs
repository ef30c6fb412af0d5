//! Routes for signed-in customers.

pub mod cart;
pub mod profile;
pub mod quote_requests;
pub mod searches;
