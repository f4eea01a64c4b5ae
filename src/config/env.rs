//! Environment variable loading.

use std::path::PathBuf;

use super::utils::{env_parse, env_var, parse_bool};
use super::{
    AudioStorageConfig, AudioStorageKind, AuthApiSecret, DEFAULT_FIRESTORE_BASE_URL,
    EmailConfig, FirestoreConfig, ServerConfig, TlsConfig, parse_auth_api_secrets_json,
};

/// Build a `ServerConfig` from environment variables on top of the defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = ServerConfig::default();

    if let Some(host) = env_var("HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse::<u16>("PORT")? {
        config.port = port;
    }
    if let Some(base) = env_var("PUBLIC_BASE_URL") {
        config.public_base_url = base;
    }

    config.tls = match (env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => return Err("Both TLS_CERT_PATH and TLS_KEY_PATH must be set to enable TLS".into()),
    };

    config.firestore = env_var("FIRESTORE_PROJECT_ID").map(|project_id| FirestoreConfig {
        project_id,
        database: env_var("FIRESTORE_DATABASE").unwrap_or_else(|| "(default)".to_string()),
        base_url: env_var("FIRESTORE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string()),
        access_token: env_var("FIRESTORE_ACCESS_TOKEN"),
    });

    config.openai_api_key = env_var("OPENAI_API_KEY");
    if let Some(base) = env_var("OPENAI_BASE_URL") {
        config.openai_base_url = base;
    }
    if let Some(model) = env_var("OPENAI_MODEL") {
        config.openai_model = model;
    }

    config.elevenlabs_api_key = env_var("ELEVENLABS_API_KEY");
    if let Some(base) = env_var("ELEVENLABS_BASE_URL") {
        config.elevenlabs_base_url = base;
    }
    if let Some(model) = env_var("ELEVENLABS_MODEL") {
        config.elevenlabs_model = model;
    }

    config.audio = AudioStorageConfig {
        kind: env_parse::<AudioStorageKind>("AUDIO_STORAGE")?.unwrap_or_default(),
        local_path: env_var("AUDIO_LOCAL_PATH").map(PathBuf::from),
        s3_bucket: env_var("AUDIO_S3_BUCKET"),
        s3_region: env_var("AUDIO_S3_REGION"),
        s3_endpoint: env_var("AUDIO_S3_ENDPOINT"),
        s3_access_key: env_var("AUDIO_S3_ACCESS_KEY"),
        s3_secret_key: env_var("AUDIO_S3_SECRET_KEY"),
    };

    if let Some(ttl) = env_parse::<u64>("VOICES_CACHE_TTL_SECONDS")? {
        config.voices_cache_ttl_seconds = ttl;
    }

    let defaults = EmailConfig::default();
    config.email = EmailConfig {
        smtp_host: env_var("SMTP_HOST"),
        smtp_port: env_parse::<u16>("SMTP_PORT")?.unwrap_or(defaults.smtp_port),
        smtp_username: env_var("SMTP_USERNAME"),
        smtp_password: env_var("SMTP_PASSWORD"),
        from: env_var("EMAIL_FROM").unwrap_or(defaults.from),
        token_secret: env_var("EMAIL_TOKEN_SECRET"),
        verification_ttl_hours: env_parse::<u64>("EMAIL_VERIFICATION_TTL_HOURS")?
            .unwrap_or(defaults.verification_ttl_hours),
    };

    if let Some(raw) = env_var("AUTH_REQUIRED") {
        config.auth_required =
            parse_bool(&raw).ok_or_else(|| format!("Invalid value for AUTH_REQUIRED: {raw}"))?;
    }
    config.auth_jwt_secret = env_var("AUTH_JWT_SECRET");
    config.auth_api_secrets = load_api_secrets()?;

    config.cors_allowed_origins = env_var("CORS_ALLOWED_ORIGINS");
    if let Some(rps) = env_parse::<u32>("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = env_parse::<u32>("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }

    Ok(config)
}

/// `AUTH_API_SECRETS_JSON` wins over the legacy `AUTH_API_SECRET` + `AUTH_API_SECRET_ID` pair.
fn load_api_secrets() -> Result<Vec<AuthApiSecret>, Box<dyn std::error::Error>> {
    if let Some(json) = env_var("AUTH_API_SECRETS_JSON") {
        return parse_auth_api_secrets_json(&json);
    }

    Ok(env_var("AUTH_API_SECRET")
        .map(|secret| {
            vec![AuthApiSecret {
                id: env_var("AUTH_API_SECRET_ID").unwrap_or_else(|| "default".to_string()),
                secret,
            }]
        })
        .unwrap_or_default())
}
