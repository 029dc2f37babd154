//! Career catalog: filtered listing, detail, search and skill-based
//! recommendations.

pub mod handlers;
pub mod recommend;
