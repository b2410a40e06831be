pub mod rating;
pub mod user;
