use std::sync::Arc;

use colored::Colorize;

use crate::api::MonzoClient;
use crate::cli::output::{format_accounts, format_balance, format_whoami, is_tty};
use crate::config::Settings;
use crate::error::MzutilError;
use crate::oauth::{forget_token, Authenticator, BrowserPrompt, MonzoAuthenticator};
use crate::store::SecretStore;

fn authenticator(
    settings: &Settings,
    store: Arc<dyn SecretStore>,
) -> Result<MonzoAuthenticator, MzutilError> {
    let prompt = Arc::new(BrowserPrompt {
        open_browser: settings.open_browser,
    });
    let auth = MonzoAuthenticator::from_store(settings.provider.clone(), store, prompt)
        .map_err(|e| {
            if e.is_not_found() {
                MzutilError::BadConfig("no saved client configuration. Run: mzutil setup".into())
            } else {
                e
            }
        })?;
    Ok(auth.with_callback_timeout(settings.oauth_timeout))
}

fn api_client(settings: &Settings) -> Result<(Arc<dyn SecretStore>, MonzoClient), MzutilError> {
    let store = settings.open_store()?;
    let auth = authenticator(settings, store.clone())?;
    let client = MonzoClient::from_authenticator(&auth, &settings.provider)?;
    Ok((store, client))
}

pub async fn run_login(settings: &Settings) -> Result<(), MzutilError> {
    let store = settings.open_store()?;
    let auth = authenticator(settings, store)?;
    auth.login().await?;

    let client = MonzoClient::from_authenticator(&auth, &settings.provider)?;
    let who = client.whoami().await?;
    let done = "Login successful";
    if is_tty() {
        println!("{}", done.green().bold());
    } else {
        println!("{done}");
    }
    println!("{}", format_whoami(&who));
    Ok(())
}

/// Invalidate the token at the provider, then drop the local copy even if
/// the remote call failed.
pub async fn run_logout(settings: &Settings) -> Result<(), MzutilError> {
    let (store, client) = api_client(settings)?;
    let remote = client.logout().await;
    if let Err(e) = &remote {
        tracing::warn!("Provider logout failed: {e}");
    }
    forget_token(store.as_ref(), &settings.provider.name)?;
    remote?;
    println!("Logged out");
    Ok(())
}

pub async fn run_balance(settings: &Settings, account_id: &str) -> Result<(), MzutilError> {
    let (_, client) = api_client(settings)?;
    let balance = client.balance(account_id).await?;
    println!("{}", format_balance(&balance));
    Ok(())
}

pub async fn run_accounts(settings: &Settings) -> Result<(), MzutilError> {
    let (_, client) = api_client(settings)?;
    let accounts = client.accounts().await?;
    println!("{}", format_accounts(&accounts, is_tty()));
    Ok(())
}

pub async fn run_whoami(settings: &Settings) -> Result<(), MzutilError> {
    let (_, client) = api_client(settings)?;
    let who = client.whoami().await?;
    println!("{}", format_whoami(&who));
    Ok(())
}

pub fn run_setup(settings: &Settings) -> Result<(), MzutilError> {
    let store = settings.open_store()?;
    crate::cli::setup::run_setup(store.as_ref())
}
