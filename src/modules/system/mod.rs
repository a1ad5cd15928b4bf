pub mod config;
pub mod logger;
pub mod machine_id;
pub mod paths;
pub mod process;
pub mod quota;
pub mod validation;
