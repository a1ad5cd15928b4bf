pub mod idc;
pub mod lifecycle;
pub mod social;

pub use idc::IdcRefreshClient;
pub use lifecycle::{
    detect_auth_type, is_expired, token_validity, CredentialLookup, RefreshStrategy,
    TokenLifecycleManager, TokenValidity,
};
pub use social::SocialRefreshClient;
