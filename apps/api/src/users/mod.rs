pub mod handlers;
pub mod profile;
