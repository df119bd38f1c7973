pub mod authenticator;
pub mod cache;
pub mod callback;
pub mod state;
pub mod token;
pub mod token_source;

pub use authenticator::{
    AuthorizationPrompt, Authenticator, BrowserPrompt, LoginPhase, MonzoAuthenticator,
};
pub use cache::{fetch_token, forget_token, persist_token, token_key};
pub use callback::{wait_for_callback, CallbackPayload, CallbackReceiver};
pub use state::{generate_state, states_match};
pub use token::{Token, TokenEndpoint};
pub use token_source::{CachedTokenSource, TokenRefresher, TokenSource};
