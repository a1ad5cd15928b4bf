pub mod files;
pub mod http;
