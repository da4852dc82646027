mod background;
mod envelope;
mod guard;
mod policy;
mod status;
mod store;

pub use background::BackgroundRefresher;
pub use envelope::TokenEnvelope;
pub use guard::{TokenGuard, TokenGuardConfig, TokenGuardResult};
pub use policy::RefreshPolicy;
pub use status::TokenStatus;
pub use store::CredentialStore;
