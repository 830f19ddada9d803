//! Unlock command: decrypt a payload and render it.

use super::load_config_or_default;
use almanac_core::types::{EncryptedPostPayload, ProtectedPostEnvelope};
use almanac_core::{CodecError, PipelineContext};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Either what `build` writes or what `protect` prints
#[derive(Deserialize)]
#[serde(untagged)]
enum PayloadFile {
    Envelope(ProtectedPostEnvelope),
    Bare(EncryptedPostPayload),
}

impl PayloadFile {
    fn into_payload(self) -> EncryptedPostPayload {
        match self {
            PayloadFile::Envelope(envelope) => envelope.payload,
            PayloadFile::Bare(payload) => payload,
        }
    }
}

pub fn unlock_payload(
    config_path: &Path,
    payload_path: &Path,
    password: &str,
    document: Option<&Path>,
) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    let json = fs::read_to_string(payload_path)
        .with_context(|| format!("Failed to read {:?}", payload_path))?;
    let payload = serde_json::from_str::<PayloadFile>(&json)
        .with_context(|| format!("{:?} is not a protected payload", payload_path))?
        .into_payload();

    let ctx = PipelineContext::from_config(&config);
    match ctx.unlock(&payload, password, document) {
        Ok(html) => {
            println!("{}", html);
            Ok(())
        }
        Err(CodecError::Authentication) => bail!("Incorrect password"),
        Err(e) => Err(e).context("Failed to unlock payload"),
    }
}
