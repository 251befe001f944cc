pub mod application;
pub mod job;
pub mod meeting;
pub mod notification;
pub mod user;
