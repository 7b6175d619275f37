//! Database query functions organized by collection.

pub mod catalog;
pub mod payouts;
pub mod promos;
pub mod settings;
pub mod users;
