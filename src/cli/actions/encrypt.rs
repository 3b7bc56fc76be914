use crate::{
    error::Error,
    vault::{self, KeySource},
};
use anyhow::{Context, Result, bail};
use std::{
    io::{self, BufRead, IsTerminal},
    process::ExitCode,
};
use zeroize::Zeroizing;

/// Read one line, without its line terminator
///
/// # Errors
///
/// Returns an error if reading fails
pub fn read_line<R: BufRead>(mut reader: R) -> io::Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    reader.read_line(&mut line)?;

    let len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(len);
    Ok(line)
}

fn read_password() -> Result<Zeroizing<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        rpassword::prompt_password("Password to encrypt: ")
            .map(Zeroizing::new)
            .map_err(Error::Input)
            .context("failed to read password")
    } else {
        read_line(stdin.lock())
            .map_err(Error::Input)
            .context("failed to read password from stdin")
    }
}

/// Encrypt a password with the configured key and print it for the config file
///
/// # Errors
///
/// Returns an error if the key cannot be loaded, the password is empty or
/// encryption fails
pub fn execute(key: &KeySource) -> Result<ExitCode> {
    let key = key
        .resolve()
        .map_err(Error::Key)
        .context("failed to load secret key")?;
    let password = read_password()?;

    if password.is_empty() {
        bail!("password must not be empty");
    }

    let encrypted = vault::encrypt_secret(&password, &key)
        .map_err(Error::Vault)
        .context("failed to encrypt password")?;
    println!("{encrypted}");

    Ok(ExitCode::SUCCESS)
}
