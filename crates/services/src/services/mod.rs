pub mod access;
pub mod ai_assistant;
pub mod canned_responses;
pub mod checkout;
pub mod claude_api;
pub mod config;
pub mod database_validator;
pub mod repair_workflow;
pub mod support_chat;
