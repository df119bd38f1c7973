use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::cli::output::{format_auth_config, is_tty};
use crate::config::{AuthConfig, AUTH_CONFIG_KEY};
use crate::error::MzutilError;
use crate::store::{SecretStore, SecretStoreExt};

/// Interactive `setup`: prompt for client credentials and save them.
pub fn run_setup(store: &dyn SecretStore) -> Result<(), MzutilError> {
    if !io::IsTerminal::is_terminal(&io::stdin()) {
        return Err(MzutilError::BadConfig(
            "setup is interactive and needs a terminal".into(),
        ));
    }
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    setup_with(&mut reader, store, is_tty())
}

fn setup_with(
    reader: &mut impl BufRead,
    store: &dyn SecretStore,
    is_tty: bool,
) -> Result<(), MzutilError> {
    println!("Using secret store: {store}");

    match store.read_value::<AuthConfig>(AUTH_CONFIG_KEY) {
        Ok(existing) => {
            let heading = "Found an existing configuration:";
            if is_tty {
                println!("{}", heading.yellow());
            } else {
                println!("{heading}");
            }
            println!("{}", format_auth_config(&existing));
            let answer = prompt_choice(reader, "Overwrite it? [Y/n]: ", &["y", "n", ""])?;
            if answer == "n" {
                println!("Configuration unchanged.");
                return Ok(());
            }
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let config = AuthConfig {
        client_id: prompt_required(reader, "Client ID: ")?,
        client_secret: prompt_required(reader, "Client secret: ")?,
        callback_url: prompt_required(reader, "Callback URL: ")?,
    };
    store.write_value(AUTH_CONFIG_KEY, &config)?;

    let done = "Configuration saved.";
    if is_tty {
        println!("{}", done.green());
    } else {
        println!("{done}");
    }
    Ok(())
}

fn prompt(reader: &mut impl BufRead, message: &str) -> Result<String, MzutilError> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(MzutilError::BadConfig("setup aborted: end of input".into()));
    }
    Ok(line.trim().to_string())
}

fn prompt_required(reader: &mut impl BufRead, message: &str) -> Result<String, MzutilError> {
    loop {
        let answer = prompt(reader, message)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
        println!("A value is required.");
    }
}

fn prompt_choice(
    reader: &mut impl BufRead,
    message: &str,
    choices: &[&str],
) -> Result<String, MzutilError> {
    loop {
        let answer = prompt(reader, message)?.to_lowercase();
        if choices.contains(&answer.as_str()) {
            return Ok(answer);
        }
        println!("Please answer y or n.");
    }
}
