pub mod errors;
pub mod models;
pub mod persona;
pub mod prompt_template;
pub mod providers;
pub mod relay;
pub mod transcript;
