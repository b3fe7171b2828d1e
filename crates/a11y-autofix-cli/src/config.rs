//! Runtime configuration from `.env` files and the process environment.
//!
//! Every missing key is collected and reported together, after the selector
//! flags have been validated and before any network call.

use std::path::{Path, PathBuf};

use a11y_autofix_core::AutofixError;
use a11y_autofix_gateway::{
    AwsSettings, SpacecatAuth, SpacecatConfig, DEFAULT_AWS_REGION, DEFAULT_SNAPSHOT_BUCKET,
    DEFAULT_SPACECAT_API_BASE,
};
use tracing::{debug, warn};

/// Environment key that pins an existing snapshot archive.
pub const ARCHIVE_NAME_KEY: &str = "ARCHIVE_NAME";

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub spacecat: SpacecatConfig,
    pub bucket: String,
    pub queue_url: String,
    pub aws: AwsSettings,
    pub repo_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, AutofixError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AutofixError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let aws_key = |suffix: &str| {
            get(&format!("SPACECAT_AWS_{suffix}")).or_else(|| get(&format!("AWS_{suffix}")))
        };
        let mut missing = Vec::new();

        let auth = match (get("SPACECAT_SESSION_TOKEN"), get("SPACECAT_API_KEY")) {
            (Some(token), _) => Some(SpacecatAuth::SessionToken(token)),
            (None, Some(key)) => {
                warn!("SPACECAT_API_KEY is deprecated, prefer SPACECAT_SESSION_TOKEN");
                Some(SpacecatAuth::ApiKey(key))
            }
            (None, None) => {
                missing.push("SPACECAT_SESSION_TOKEN (or SPACECAT_API_KEY)".to_string());
                None
            }
        };
        let ims_org_id = required(&get, "SPACECAT_IMS_ORG_ID", &mut missing);
        let queue_url = required(&get, "SQS_SPACECAT_TO_MYSTIQUE_QUEUE_URL", &mut missing);

        let access_key_id = aws_key("ACCESS_KEY_ID");
        if access_key_id.is_none() {
            missing.push("SPACECAT_AWS_ACCESS_KEY_ID (or AWS_ACCESS_KEY_ID)".to_string());
        }
        let secret_access_key = aws_key("SECRET_ACCESS_KEY");
        if secret_access_key.is_none() {
            missing.push("SPACECAT_AWS_SECRET_ACCESS_KEY (or AWS_SECRET_ACCESS_KEY)".to_string());
        }

        let repo_path = match get("REPO_PATH").map(PathBuf::from) {
            Some(path) if path.is_dir() => Some(path),
            Some(path) => {
                missing.push(format!("REPO_PATH (not a directory: {})", path.display()));
                None
            }
            None => {
                missing.push("REPO_PATH".to_string());
                None
            }
        };

        match (auth, ims_org_id, queue_url, access_key_id, secret_access_key, repo_path) {
            (Some(auth), Some(ims_org_id), Some(queue_url), Some(key_id), Some(secret), Some(repo_path))
                if missing.is_empty() =>
            {
                let api_base = get("SPACECAT_API_BASE")
                    .unwrap_or_else(|| DEFAULT_SPACECAT_API_BASE.to_string());
                let region = get("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());
                Ok(Settings {
                    spacecat: SpacecatConfig::new(&ims_org_id, auth).with_api_base(&api_base),
                    bucket: get("S3_BUCKET_NAME")
                        .unwrap_or_else(|| DEFAULT_SNAPSHOT_BUCKET.to_string()),
                    queue_url,
                    aws: AwsSettings::new(&key_id, &secret)
                        .with_region(&region)
                        .with_session_token(aws_key("SESSION_TOKEN").as_deref()),
                    repo_path,
                })
            }
            _ => Err(AutofixError::Configuration(missing)),
        }
    }
}

fn required(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    missing: &mut Vec<String>,
) -> Option<String> {
    let value = get(key);
    if value.is_none() {
        missing.push(key.to_string());
    }
    value
}

/// Configured default archive name, if any.
pub fn archive_override() -> Option<String> {
    std::env::var(ARCHIVE_NAME_KEY)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Load `.env` from the working directory, then from the directory holding
/// the executable. Variables already set are never overridden.
pub fn load_dotenv() {
    let mut candidates = vec![PathBuf::from(".env")];
    if let Some(dir) = std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
    {
        candidates.push(dir.join(".env"));
    }
    for path in candidates {
        if path.is_file() {
            match dotenvy::from_path(&path) {
                Ok(()) => debug!(path = %path.display(), "loaded environment file"),
                Err(e) => warn!(path = %path.display(), error = %e, "could not read environment file"),
            }
        }
    }
}
