pub mod appscope_service;
pub mod report;
