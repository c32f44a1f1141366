use anyhow::{bail, Result};
use console::Term;
use secrecy::SecretString;

pub fn read_password(account: &str) -> Result<SecretString> {
    let term = Term::stderr();
    term.write_str(&format!("Enter the password for Nessus account {}: ", account))?;
    let password = term.read_secure_line()?;

    if password.trim_end_matches(['\r', '\n']).is_empty() {
        bail!("password is required");
    }
    Ok(SecretString::new(password.into_boxed_str()))
}
