//! Post-merge configuration checks.

use std::collections::HashSet;

use url::Url;

use super::{AudioStorageKind, AuthApiSecret, ServerConfig};

/// Run every validation rule against a merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_public_base_url(&config.public_base_url)?;
    validate_auth_api_secrets(&config.auth_api_secrets)?;
    validate_auth_required(config)?;
    validate_audio_storage(config)?;
    Ok(())
}

pub(super) fn validate_public_base_url(base: &str) -> Result<(), String> {
    let parsed =
        Url::parse(base).map_err(|e| format!("Invalid PUBLIC_BASE_URL '{base}': {e}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!(
            "PUBLIC_BASE_URL must use http or https, got '{}'",
            parsed.scheme()
        ));
    }
    Ok(())
}

pub(super) fn validate_auth_api_secrets(secrets: &[AuthApiSecret]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for entry in secrets {
        if entry.id.trim().is_empty() {
            return Err("Auth API secret id must not be empty".to_string());
        }
        if entry.secret.trim().is_empty() {
            return Err(format!("Auth API secret for id '{}' is empty", entry.id));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(format!("Duplicate auth API secret id '{}'", entry.id));
        }
    }
    Ok(())
}

pub(super) fn validate_auth_required(config: &ServerConfig) -> Result<(), String> {
    if config.auth_required && !config.has_api_secret_auth() && !config.has_jwt_auth() {
        return Err(
            "AUTH_REQUIRED is true but neither API secrets nor AUTH_JWT_SECRET are configured"
                .to_string(),
        );
    }
    Ok(())
}

pub(super) fn validate_audio_storage(config: &ServerConfig) -> Result<(), String> {
    match config.audio.kind {
        AudioStorageKind::Memory => Ok(()),
        AudioStorageKind::Local if config.audio.local_path.is_none() => Err(
            "audio storage 'local' requires audio.local_path (AUDIO_LOCAL_PATH)".to_string(),
        ),
        AudioStorageKind::S3 if config.audio.s3_bucket.is_none() => Err(
            "audio storage 's3' requires audio.s3_bucket (AUDIO_S3_BUCKET)".to_string(),
        ),
        _ => Ok(()),
    }
}
