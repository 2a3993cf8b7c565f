pub mod admin;
pub mod article;
pub mod auth;
pub mod engagement;
pub mod reader;
pub mod subscriber;
pub mod writer;
