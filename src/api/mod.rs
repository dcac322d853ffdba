pub mod client;
pub mod device_client;
pub mod errors;
pub mod message;
pub mod region;
pub mod response;
pub mod signing;
