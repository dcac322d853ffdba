pub mod config_file;
pub mod credentials;
pub mod token;
