pub mod condition;
pub mod events;
pub mod vehicle;
