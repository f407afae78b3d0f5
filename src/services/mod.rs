pub mod generator;
pub mod mailer;
pub mod pdf;
pub mod processor;
pub mod resume;
pub mod storage;
