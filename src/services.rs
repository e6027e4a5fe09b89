pub mod reading_service;

pub use reading_service::ReadingService;
