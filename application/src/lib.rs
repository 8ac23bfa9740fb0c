pub mod context;
pub mod last_question;
pub mod model_dispatch;
pub mod question_cache;
