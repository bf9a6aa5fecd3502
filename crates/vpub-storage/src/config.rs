//! Object store configuration.

use crate::error::{StorageError, StorageResult};

pub const ENV_ACCESS_KEY: &str = "CF_R2_KEY";
pub const ENV_SECRET_KEY: &str = "CF_R2_SECRET";
pub const ENV_ENDPOINT: &str = "CF_R2_ENDPOINT";
pub const ENV_BUCKET: &str = "CF_R2_BUCKET";
pub const ENV_PUBLIC_BASE_URL: &str = "CF_PUBLIC_CDN";
pub const ENV_REGION: &str = "CF_R2_REGION";

/// Raw store settings as found in the environment. Every field may be absent.
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub bucket_name: Option<String>,
    pub public_base_url: Option<String>,
    pub region: Option<String>,
}

impl StoreSettings {
    /// Read settings from environment variables without validating them.
    pub fn from_env() -> Self {
        Self {
            access_key_id: non_empty_var(ENV_ACCESS_KEY),
            secret_access_key: non_empty_var(ENV_SECRET_KEY),
            endpoint_url: non_empty_var(ENV_ENDPOINT),
            bucket_name: non_empty_var(ENV_BUCKET),
            public_base_url: non_empty_var(ENV_PUBLIC_BASE_URL),
            region: non_empty_var(ENV_REGION),
        }
    }

    /// Check that every required value is present.
    ///
    /// All missing variables are reported together.
    pub fn validate(&self) -> StorageResult<StoreConfig> {
        let required = [
            (ENV_ACCESS_KEY, &self.access_key_id),
            (ENV_SECRET_KEY, &self.secret_access_key),
            (ENV_ENDPOINT, &self.endpoint_url),
            (ENV_BUCKET, &self.bucket_name),
            (ENV_PUBLIC_BASE_URL, &self.public_base_url),
        ];

        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(StorageError::MisconfiguredStore { missing });
        }

        Ok(StoreConfig {
            access_key_id: self.access_key_id.clone().unwrap_or_default(),
            secret_access_key: self.secret_access_key.clone().unwrap_or_default(),
            endpoint_url: self.endpoint_url.clone().unwrap_or_default(),
            bucket_name: self.bucket_name.clone().unwrap_or_default(),
            public_base_url: self.public_base_url.clone().unwrap_or_default(),
            region: self.region.clone().unwrap_or_else(|| "auto".to_string()),
        })
    }
}

/// Validated configuration for the R2 client.
#[derive(Clone)]
pub struct StoreConfig {
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    /// Bucket name
    pub bucket_name: String,
    /// Public CDN base URL objects are served from
    pub public_base_url: String,
    /// Region (usually "auto" for R2)
    pub region: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("endpoint_url", &self.endpoint_url)
            .field("bucket_name", &self.bucket_name)
            .field("public_base_url", &self.public_base_url)
            .field("region", &self.region)
            .finish()
    }
}

/// Public URL of an object key under a CDN base URL.
pub fn public_url(public_base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        public_base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> StoreSettings {
        StoreSettings {
            access_key_id: Some("key".into()),
            secret_access_key: Some("secret".into()),
            endpoint_url: Some("https://acct.r2.cloudflarestorage.com".into()),
            bucket_name: Some("answers".into()),
            public_base_url: Some("https://cdn.example.com/".into()),
            region: None,
        }
    }

    #[test]
    fn test_validate_complete_settings() {
        let config = complete().validate().unwrap();
        assert_eq!(config.bucket_name, "answers");
        assert_eq!(config.region, "auto");
    }

    #[test]
    fn test_validate_reports_all_missing() {
        let settings = StoreSettings {
            secret_access_key: None,
            bucket_name: Some("   ".into()),
            public_base_url: None,
            ..complete()
        };

        match settings.validate() {
            Err(StorageError::MisconfiguredStore { missing }) => {
                assert_eq!(missing, vec![ENV_SECRET_KEY, ENV_BUCKET, ENV_PUBLIC_BASE_URL]);
            }
            other => panic!("expected MisconfiguredStore, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_settings_report_every_variable() {
        match StoreSettings::default().validate() {
            Err(StorageError::MisconfiguredStore { missing }) => assert_eq!(missing.len(), 5),
            other => panic!("expected MisconfiguredStore, got {other:?}"),
        }
    }

    #[test]
    fn test_public_url_joins_without_double_slash() {
        let config = complete().validate().unwrap();
        assert_eq!(
            public_url(&config.public_base_url, "answers/X/master.m3u8"),
            "https://cdn.example.com/answers/X/master.m3u8"
        );
        assert_eq!(
            public_url("https://cdn.example.com", "/answers/X/master.m3u8"),
            "https://cdn.example.com/answers/X/master.m3u8"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = complete().validate().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret\""));
        assert!(debug.contains("<redacted>"));
    }
}
