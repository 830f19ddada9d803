//! Protect command: encrypt a post body into a payload.

use almanac_core::frontmatter::parse_frontmatter;
use almanac_core::encrypt;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

pub fn protect_post(post: &Path, password: Option<&str>, output: Option<&Path>) -> Result<()> {
    let content =
        fs::read_to_string(post).with_context(|| format!("Failed to read {:?}", post))?;
    let (frontmatter, body) = parse_frontmatter(&content)
        .with_context(|| format!("Invalid frontmatter in {:?}", post))?;

    let password = match password.or(frontmatter.password.as_deref()) {
        Some(password) if !password.is_empty() => password,
        _ => bail!("No password given and {:?} has no `password` field", post),
    };

    let payload = encrypt(&body, password).context("Failed to encrypt post")?;
    let json = serde_json::to_string_pretty(&payload)?;

    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            tracing::info!("Wrote payload to {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
