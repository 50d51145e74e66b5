//! Secret requirement detection
//!
//! Maps a validated configuration to the repository secrets its workflow
//! references. The mapping is total and pure: every platform, storage and
//! notification value has an entry, even when that entry is empty.

use crate::config::{Kind, Notification, Platform, Storage, WorkflowConfig};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::{self, Write as _};

/// Base64-encoded iOS distribution certificate
pub const IOS_CERTIFICATE_P12_BASE64: &str = "IOS_CERTIFICATE_P12_BASE64";
/// Password of the iOS distribution certificate
pub const IOS_CERTIFICATE_PASSWORD: &str = "IOS_CERTIFICATE_PASSWORD";
/// Base64-encoded provisioning profile
pub const IOS_PROVISIONING_PROFILE_BASE64: &str = "IOS_PROVISIONING_PROFILE_BASE64";
/// Password for the temporary build keychain
pub const IOS_KEYCHAIN_PASSWORD: &str = "IOS_KEYCHAIN_PASSWORD";
/// AWS access key id
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// AWS secret access key
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// AWS region of the artifact bucket
pub const AWS_REGION: &str = "AWS_REGION";
/// Artifact bucket name
pub const AWS_S3_BUCKET: &str = "AWS_S3_BUCKET";
/// Firebase application id
pub const FIREBASE_APP_ID: &str = "FIREBASE_APP_ID";
/// Firebase service account credentials
pub const FIREBASE_SERVICE_ACCOUNT_JSON: &str = "FIREBASE_SERVICE_ACCOUNT_JSON";
/// App Store Connect API key id
pub const APP_STORE_CONNECT_API_KEY_ID: &str = "APP_STORE_CONNECT_API_KEY_ID";
/// App Store Connect issuer id
pub const APP_STORE_CONNECT_ISSUER_ID: &str = "APP_STORE_CONNECT_ISSUER_ID";
/// Base64-encoded App Store Connect private key
pub const APP_STORE_CONNECT_API_KEY_BASE64: &str = "APP_STORE_CONNECT_API_KEY_BASE64";
/// Slack incoming webhook
pub const SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
/// SMTP server host
pub const SMTP_SERVER: &str = "SMTP_SERVER";
/// SMTP user
pub const SMTP_USERNAME: &str = "SMTP_USERNAME";
/// SMTP password
pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
/// Comma-separated recipient list
pub const EMAIL_RECIPIENTS: &str = "EMAIL_RECIPIENTS";

/// Where a secret must be defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum SecretScope {
    /// Repository-level secret
    Repository,
    /// Secret of the named deployment environment
    Environment(String),
}

impl fmt::Display for SecretScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repository => f.write_str("repository"),
            Self::Environment(name) => write!(f, "environment:{name}"),
        }
    }
}

/// A secret the generated workflow references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretRequirement {
    /// Secret name as referenced by `${{ secrets.NAME }}`
    pub name: String,
    /// Why the workflow needs it
    pub reason: String,
    /// Where it must be defined
    pub scope: SecretScope,
}

impl SecretRequirement {
    fn new(name: &str, reason: &str, scope: SecretScope) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.to_string(),
            scope,
        }
    }
}

/// Secrets required by the build steps for `platform`.
#[must_use]
pub const fn platform_secrets(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Ios => &[
            IOS_CERTIFICATE_P12_BASE64,
            IOS_CERTIFICATE_PASSWORD,
            IOS_PROVISIONING_PROFILE_BASE64,
            IOS_KEYCHAIN_PASSWORD,
        ],
        Platform::Android => &[],
    }
}

/// Secrets required by the upload steps for `storage` on `platform`.
///
/// TestFlight on Android has no upload step and therefore no secrets.
#[must_use]
pub const fn storage_secrets(storage: Storage, platform: Platform) -> &'static [&'static str] {
    match (storage, platform) {
        (Storage::Github, _) | (Storage::Testflight, Platform::Android) => &[],
        (Storage::S3, _) => &[
            AWS_ACCESS_KEY_ID,
            AWS_SECRET_ACCESS_KEY,
            AWS_REGION,
            AWS_S3_BUCKET,
        ],
        (Storage::Firebase, _) => &[FIREBASE_APP_ID, FIREBASE_SERVICE_ACCOUNT_JSON],
        (Storage::Testflight, Platform::Ios) => &[
            APP_STORE_CONNECT_API_KEY_ID,
            APP_STORE_CONNECT_ISSUER_ID,
            APP_STORE_CONNECT_API_KEY_BASE64,
        ],
    }
}

/// Secrets required by a notification channel.
#[must_use]
pub const fn notification_secrets(channel: Notification) -> &'static [&'static str] {
    match channel {
        Notification::PrComment => &[],
        Notification::Slack => &[SLACK_WEBHOOK_URL],
        Notification::Email => &[SMTP_SERVER, SMTP_USERNAME, SMTP_PASSWORD, EMAIL_RECIPIENTS],
    }
}

/// Detect every secret the workflow for `config` references.
///
/// Order is platform, storage, then notifications in configured order; names
/// are unique.
#[must_use]
pub fn detect_secrets(config: &WorkflowConfig) -> Vec<SecretRequirement> {
    let Some(build) = config.options.build.as_ref().filter(|_| config.kind == Kind::Build) else {
        return Vec::new();
    };

    let build_scope = build
        .environment
        .clone()
        .map_or(SecretScope::Repository, SecretScope::Environment);

    let mut seen: HashSet<&'static str> = HashSet::new();
    let mut secrets = Vec::new();
    let mut push = |names: &'static [&'static str], reason: String, scope: &SecretScope| {
        for name in names {
            if seen.insert(*name) {
                secrets.push(SecretRequirement::new(name, &reason, scope.clone()));
            }
        }
    };

    push(
        platform_secrets(build.platform),
        format!("{} code signing", build.platform.display_name()),
        &build_scope,
    );
    push(
        storage_secrets(build.storage, build.platform),
        format!("{} artifact upload", storage_label(build.storage)),
        &build_scope,
    );
    for channel in &build.notification {
        // the notify job never runs in the deployment environment
        push(
            notification_secrets(*channel),
            format!("{} notification", notification_label(*channel)),
            &SecretScope::Repository,
        );
    }

    tracing::debug!(
        count = secrets.len(),
        platform = %build.platform,
        storage = %build.storage,
        "secrets detected"
    );
    secrets
}

const fn storage_label(storage: Storage) -> &'static str {
    match storage {
        Storage::Github => "GitHub",
        Storage::S3 => "Amazon S3",
        Storage::Firebase => "Firebase App Distribution",
        Storage::Testflight => "TestFlight",
    }
}

const fn notification_label(channel: Notification) -> &'static str {
    match channel {
        Notification::PrComment => "Pull request",
        Notification::Slack => "Slack",
        Notification::Email => "Email",
    }
}

/// Render a human-readable secrets report.
#[must_use]
pub fn render_report(secrets: &[SecretRequirement]) -> String {
    if secrets.is_empty() {
        return "No additional secrets required.\n".to_string();
    }
    let width = secrets.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let mut report = String::from("Required secrets:\n");
    for secret in secrets {
        let _ = writeln!(
            report,
            "  {:<width$}  {} ({})",
            secret.name, secret.reason, secret.scope
        );
    }
    report
}
