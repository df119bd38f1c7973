pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod store;

pub use api::{Account, Balance, MonzoClient, WhoAmI};
pub use client::AuthorizedClient;
pub use config::{AuthConfig, ProviderConfig, Settings, StoreKind};
pub use error::MzutilError;
pub use oauth::{
    AuthorizationPrompt, Authenticator, BrowserPrompt, CachedTokenSource, MonzoAuthenticator,
    Token, TokenSource,
};
pub use store::{FileStore, KeychainStore, MemoryStore, SecretStore, SecretStoreExt};
