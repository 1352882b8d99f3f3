pub mod ai_service;
pub mod feedback_service;
pub mod grading_service;
pub mod study_service;
pub mod test_service;
pub mod user_service;
