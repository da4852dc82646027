pub mod cache;
pub mod config;
pub mod errors;
pub mod filter;
pub mod session;
pub mod telemetry;
pub mod token;
pub mod types;
pub mod upstream;

pub use cache::TimedCache;
pub use config::{Config, ProjectGroup};
pub use errors::Error;
pub use filter::{ProjectFilter, ProjectGroupsResponse, matches_pattern};
pub use session::{Credentials, SessionAuthenticator, SessionGrant, UpstreamAuthenticator};
pub use token::{
    BackgroundRefresher, RefreshPolicy, TokenEnvelope, TokenGuard, TokenGuardConfig, TokenStatus,
};
pub use upstream::UpstreamClient;

#[cfg(test)]
mod tests;
