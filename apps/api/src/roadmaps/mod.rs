pub mod documentation;
pub mod generation;
pub mod handlers;
pub mod layout;
pub mod schema;
pub mod shared;
pub mod store;
