use colored::Colorize;

use crate::api::{Account, Balance, WhoAmI};
use crate::config::AuthConfig;

const ACCOUNT_SEPARATOR_WIDTH: usize = 80;

pub fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// `12.34 GBP`, from minor units.
pub fn format_amount(minor_units: i64, currency: &str) -> String {
    format!("{:.2} {}", minor_units as f64 / 100.0, currency)
}

pub fn format_balance(balance: &Balance) -> String {
    format!(
        "{} (spent today: {})",
        format_amount(balance.balance, &balance.currency),
        format_amount(balance.spend_today.abs(), &balance.currency)
    )
}

fn account_row(id: &str, created: &str, description: &str) -> String {
    format!("{id:<30}{created:<21}{description}")
}

pub fn format_accounts(accounts: &[Account], is_tty: bool) -> String {
    let header = account_row("Id", "Created", "Description");
    let header = if is_tty {
        header.bold().to_string()
    } else {
        header
    };

    let mut lines = vec![header, "-".repeat(ACCOUNT_SEPARATOR_WIDTH)];
    for account in accounts {
        let created = account.created.format("%d %b %y %H:%M UTC").to_string();
        let mut description = account.description.clone();
        if account.closed {
            description.push_str(" (closed)");
        }
        lines.push(account_row(&account.id, &created, &description));
    }
    lines.join("\n")
}

pub fn format_whoami(who: &WhoAmI) -> String {
    format!(
        "Authenticated: {}\nClient ID: {}\nUser ID: {}",
        who.authenticated, who.client_id, who.user_id
    )
}

pub fn format_auth_config(config: &AuthConfig) -> String {
    format!(
        "\tClient ID: {}\n\tClient Secret: {}\n\tCallback URL: {}",
        config.client_id,
        config.masked_secret(),
        config.callback_url
    )
}
