use std::io::{self, BufRead};

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use clap::Parser;
use serde_json::json;
use uuid::Uuid;

/// Print a user entry for the form-shield security file.
///
/// - `password_hash` is an Argon2id PHC string with a random salt
/// - `id` is a random UUID v4 unless given
///
/// Paste the output into the `users` array.
#[derive(Parser, Debug)]
#[command(name = "passwd-gen", version, about)]
struct Args {
    /// Login name
    #[arg(long)]
    username: String,

    /// Password. Read from the first line of stdin when omitted.
    #[arg(long)]
    password: Option<String>,

    /// Role granted to the user (repeatable)
    #[arg(long = "role", value_name = "ROLE")]
    roles: Vec<String>,

    /// Override id. Default: random UUID v4.
    #[arg(long)]
    id: Option<Uuid>,

    /// Write the entry with `"disabled": true`
    #[arg(long, default_value_t = false)]
    disabled: bool,
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
}

fn read_password() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let password = match args.password {
        Some(p) => p,
        None => read_password()?,
    };
    if password.trim().is_empty() {
        return Err("password must not be blank".into());
    }

    let password_hash = hash_password(&password).map_err(|e| format!("hashing failed: {e}"))?;

    let entry = json!({
        "id": args.id.unwrap_or_else(Uuid::new_v4),
        "username": args.username,
        "password_hash": password_hash,
        "roles": args.roles,
        "disabled": args.disabled,
    });

    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    #[test]
    fn hash_is_salted_and_verifiable() {
        let a = hash_password("password").unwrap();
        let b = hash_password("password").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));

        let parsed = PasswordHash::new(&a).unwrap();
        assert!(Argon2::default().verify_password(b"password", &parsed).is_ok());
    }
}
