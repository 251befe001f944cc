pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    correlation_service::CorrelationService, directory_service::DirectoryService,
    meeting_service::MeetingService, notification_service::NotificationService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub meeting_service: MeetingService,
    pub notification_service: NotificationService,
    pub correlation_service: CorrelationService,
    pub directory_service: DirectoryService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let notification_service = NotificationService::new(pool.clone());
        let directory_service = DirectoryService::new(pool.clone());
        let meeting_service = MeetingService::new(
            pool.clone(),
            notification_service.clone(),
            directory_service.clone(),
        );
        let correlation_service = CorrelationService::new(pool.clone());

        Self {
            pool,
            meeting_service,
            notification_service,
            correlation_service,
            directory_service,
        }
    }
}
