pub mod applicant_dto;
pub mod meeting_dto;
pub mod notification_dto;
