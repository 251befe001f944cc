pub mod applicant_routes;
pub mod health;
pub mod meeting_routes;
pub mod notification_routes;
