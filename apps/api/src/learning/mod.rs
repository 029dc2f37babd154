pub mod handlers;
pub mod personalize;
