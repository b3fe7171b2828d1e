//! AWS session settings shared by the S3 object store and SQS queue.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::Credentials;

/// Default region when none is configured.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Static credentials plus region for the AWS clients.
#[derive(Clone)]
pub struct AwsSettings {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsSettings {
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        AwsSettings {
            region: DEFAULT_AWS_REGION.to_string(),
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
        }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    pub fn with_session_token(mut self, token: Option<&str>) -> Self {
        self.session_token = token.filter(|t| !t.is_empty()).map(str::to_string);
        self
    }

    /// Resolve an SDK config that uses exactly these credentials.
    pub async fn load(&self) -> SdkConfig {
        let credentials = Credentials::new(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            self.session_token.clone(),
            None,
            "a11y-autofix",
        );

        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await
    }
}

impl std::fmt::Debug for AwsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSettings")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
