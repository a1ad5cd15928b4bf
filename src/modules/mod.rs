pub mod auth;
pub mod context;
pub mod identity_service;
pub mod persistence;
pub mod system;

pub use context::AppContext;
pub use identity_service::IdentityService;
