pub mod completion_api;
pub mod default_config;
pub mod llm_model_config;
