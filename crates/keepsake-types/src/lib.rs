pub mod api;
pub mod collection;
pub mod events;
pub mod models;
