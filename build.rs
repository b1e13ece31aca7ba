//! Build script for TuneBridge.
//!
//! Copies the `.env.example` template into the local data directory so users
//! find a ready-to-edit configuration next to where the application reads its
//! `.env` file:
//! - Linux: `~/.local/share/tunebridge/.env.example`
//! - macOS: `~/Library/Application Support/tunebridge/.env.example`
//! - Windows: `%LOCALAPPDATA%/tunebridge/.env.example`

use std::{env, fs, path::PathBuf};

/// Copies the configuration template, warning instead of failing when it is missing.
///
/// # Errors
///
/// Fails when `CARGO_MANIFEST_DIR` is unset or the data directory cannot be written.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("tunebridge");
    fs::create_dir_all(&out_dir)?;

    if env_example_path.is_file() {
        let contents = fs::read_to_string(&env_example_path)?;
        fs::write(out_dir.join(".env.example"), contents)?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
    }

    Ok(())
}
