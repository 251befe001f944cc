pub mod correlation_service;
pub mod directory_service;
pub mod meeting_service;
pub mod notification_service;
