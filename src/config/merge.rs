//! Overlay YAML values on top of the environment-derived configuration.

use std::path::PathBuf;

use super::env::load_from_env;
use super::utils::non_empty;
use super::yaml::YamlConfig;
use super::{
    AudioStorageKind, AuthApiSecret, DEFAULT_FIRESTORE_BASE_URL, FirestoreConfig, ServerConfig,
    TlsConfig,
};

/// Merge environment variables (base) with optional YAML overrides.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = non_empty(server.host) {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(base) = non_empty(server.public_base_url) {
            config.public_base_url = base;
        }
        if let Some(tls) = server.tls {
            if tls.enabled == Some(false) {
                config.tls = None;
            } else {
                match (non_empty(tls.cert_path), non_empty(tls.key_path)) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    (None, None) => {}
                    _ => {
                        return Err(
                            "server.tls requires both cert_path and key_path".to_string().into()
                        );
                    }
                }
            }
        }
    }

    if let Some(firestore) = yaml.firestore {
        if let Some(project_id) = non_empty(firestore.project_id) {
            let existing = config.firestore.take();
            config.firestore = Some(FirestoreConfig {
                project_id,
                database: non_empty(firestore.database)
                    .or_else(|| existing.as_ref().map(|f| f.database.clone()))
                    .unwrap_or_else(|| "(default)".to_string()),
                base_url: non_empty(firestore.base_url)
                    .or_else(|| existing.as_ref().map(|f| f.base_url.clone()))
                    .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string()),
                access_token: non_empty(firestore.access_token)
                    .or_else(|| existing.and_then(|f| f.access_token.clone())),
            });
        } else if let Some(ref mut existing) = config.firestore {
            if let Some(database) = non_empty(firestore.database) {
                existing.database = database;
            }
            if let Some(base_url) = non_empty(firestore.base_url) {
                existing.base_url = base_url;
            }
            if let Some(token) = non_empty(firestore.access_token) {
                existing.access_token = Some(token);
            }
        }
    }

    if let Some(providers) = yaml.providers {
        if let Some(key) = non_empty(providers.openai_api_key) {
            config.openai_api_key = Some(key);
        }
        if let Some(base) = non_empty(providers.openai_base_url) {
            config.openai_base_url = base;
        }
        if let Some(model) = non_empty(providers.openai_model) {
            config.openai_model = model;
        }
        if let Some(key) = non_empty(providers.elevenlabs_api_key) {
            config.elevenlabs_api_key = Some(key);
        }
        if let Some(base) = non_empty(providers.elevenlabs_base_url) {
            config.elevenlabs_base_url = base;
        }
        if let Some(model) = non_empty(providers.elevenlabs_model) {
            config.elevenlabs_model = model;
        }
    }

    if let Some(audio) = yaml.audio {
        if let Some(kind) = non_empty(audio.storage) {
            config.audio.kind = kind.parse::<AudioStorageKind>()?;
        }
        if let Some(path) = non_empty(audio.local_path) {
            config.audio.local_path = Some(PathBuf::from(path));
        }
        if let Some(bucket) = non_empty(audio.s3_bucket) {
            config.audio.s3_bucket = Some(bucket);
        }
        if let Some(region) = non_empty(audio.s3_region) {
            config.audio.s3_region = Some(region);
        }
        if let Some(endpoint) = non_empty(audio.s3_endpoint) {
            config.audio.s3_endpoint = Some(endpoint);
        }
        if let Some(key) = non_empty(audio.s3_access_key) {
            config.audio.s3_access_key = Some(key);
        }
        if let Some(secret) = non_empty(audio.s3_secret_key) {
            config.audio.s3_secret_key = Some(secret);
        }
    }

    if let Some(ttl) = yaml.cache.and_then(|cache| cache.voices_ttl_seconds) {
        config.voices_cache_ttl_seconds = ttl;
    }

    if let Some(email) = yaml.email {
        if let Some(host) = non_empty(email.smtp_host) {
            config.email.smtp_host = Some(host);
        }
        if let Some(port) = email.smtp_port {
            config.email.smtp_port = port;
        }
        if let Some(username) = non_empty(email.smtp_username) {
            config.email.smtp_username = Some(username);
        }
        if let Some(password) = non_empty(email.smtp_password) {
            config.email.smtp_password = Some(password);
        }
        if let Some(from) = non_empty(email.from) {
            config.email.from = from;
        }
        if let Some(secret) = non_empty(email.token_secret) {
            config.email.token_secret = Some(secret);
        }
        if let Some(ttl) = email.verification_ttl_hours {
            config.email.verification_ttl_hours = ttl;
        }
    }

    if let Some(auth) = yaml.auth {
        if let Some(required) = auth.required {
            config.auth_required = required;
        }
        if let Some(secret) = non_empty(auth.jwt_secret) {
            config.auth_jwt_secret = Some(secret);
        }
        if !auth.api_secrets.is_empty() {
            config.auth_api_secrets = auth
                .api_secrets
                .into_iter()
                .map(|entry| AuthApiSecret {
                    id: entry.id,
                    secret: entry.secret,
                })
                .collect();
        } else if let Some(secret) = non_empty(auth.api_secret) {
            config.auth_api_secrets = vec![AuthApiSecret {
                id: "default".to_string(),
                secret,
            }];
        }
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = non_empty(security.cors_allowed_origins) {
            config.cors_allowed_origins = Some(origins);
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
    }

    Ok(config)
}
