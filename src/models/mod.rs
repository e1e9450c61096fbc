pub mod admin;
pub mod rating;
pub mod vote;

pub use admin::*;
pub use rating::*;
pub use vote::*;
