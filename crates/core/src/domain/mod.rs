pub mod details;
pub mod member;
pub mod state;
