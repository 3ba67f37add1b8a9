//! Account commands.

use super::{CliResult, report_durability};
use crate::services::{RegisterRequest, ServiceContainer};
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;

/// Arguments for the `register` command.
#[derive(Debug)]
pub struct RegisterArgs {
    /// Desired username.
    pub username: String,
    /// Password.
    pub password: SecretString,
    /// Repeated password; the password itself when omitted.
    pub confirm: Option<SecretString>,
    /// Whether the privacy terms were accepted.
    pub agree_to_terms: bool,
}

/// Registers a new account.
///
/// # Errors
///
/// Returns an error if validation or storage fails.
pub fn cmd_register<W: Write>(
    services: &ServiceContainer,
    args: RegisterArgs,
    out: &mut W,
) -> CliResult {
    let confirm_password = args
        .confirm
        .unwrap_or_else(|| SecretString::from(args.password.expose_secret().to_string()));
    let user = report_durability(services.accounts().register(RegisterRequest {
        username: args.username,
        password: args.password,
        confirm_password,
        agree_to_terms: args.agree_to_terms,
    })?);

    writeln!(out, "Registered {} ({})", user.username, user.id)?;
    Ok(())
}

/// Checks credentials.
///
/// # Errors
///
/// Returns an error if the credentials are wrong or storage fails.
pub fn cmd_login<W: Write>(
    services: &ServiceContainer,
    username: &str,
    password: &SecretString,
    out: &mut W,
) -> CliResult {
    let user = services.accounts().login(username, password)?;
    writeln!(
        out,
        "Logged in as {} ({}), member since {}",
        user.username,
        user.id,
        user.created_at.format("%Y-%m-%d")
    )?;
    Ok(())
}
