pub mod client;
pub mod errors;
pub mod knowledge;
pub mod models;
pub mod prompt_template;
pub mod providers;
