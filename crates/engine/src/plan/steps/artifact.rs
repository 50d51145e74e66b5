//! Artifact upload and distribution steps.

use super::{JobContext, StepContributor, StepPhase, artifact_name, artifact_path};
use crate::config::{BuildOptions, Kind, Platform, Storage};
use crate::plan::{Binding, Condition, StepPlan};
use crate::secrets::{
    APP_STORE_CONNECT_API_KEY_BASE64, APP_STORE_CONNECT_API_KEY_ID, APP_STORE_CONNECT_ISSUER_ID,
    AWS_ACCESS_KEY_ID, AWS_REGION, AWS_S3_BUCKET, AWS_SECRET_ACCESS_KEY, FIREBASE_APP_ID,
    FIREBASE_SERVICE_ACCOUNT_JSON,
};

/// Stores the built app at the configured destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageContributor;

impl StorageContributor {
    fn github(build: &BuildOptions) -> Vec<StepPlan> {
        vec![
            StepPlan::uses("Upload artifact", "actions/upload-artifact@v4")
                .with_input("name", artifact_name(build))
                .with_input("path", artifact_path(build))
                .with_input("if-no-files-found", "error"),
        ]
    }

    fn s3(build: &BuildOptions) -> Vec<StepPlan> {
        let path = artifact_path(build);
        let file = path.rsplit('/').next().unwrap_or(&path).to_string();
        vec![
            StepPlan::uses(
                "Configure AWS credentials",
                "aws-actions/configure-aws-credentials@v4",
            )
            .with_input("aws-access-key-id", Binding::secret(AWS_ACCESS_KEY_ID))
            .with_input("aws-secret-access-key", Binding::secret(AWS_SECRET_ACCESS_KEY))
            .with_input("aws-region", Binding::secret(AWS_REGION)),
            StepPlan::run(
                "Upload to S3",
                format!(
                    "aws s3 cp \"{path}\" \
                     \"s3://$AWS_S3_BUCKET/$GITHUB_REPOSITORY/$GITHUB_SHA/{file}\""
                ),
            )
            .with_secret_env(AWS_S3_BUCKET),
        ]
    }

    fn firebase(build: &BuildOptions) -> Vec<StepPlan> {
        vec![
            StepPlan::uses(
                "Distribute with Firebase",
                "wzieba/Firebase-Distribution-Github-Action@v1",
            )
            .with_input("appId", Binding::secret(FIREBASE_APP_ID))
            .with_input(
                "serviceCredentialsFileContent",
                Binding::secret(FIREBASE_SERVICE_ACCOUNT_JSON),
            )
            .with_input("file", artifact_path(build)),
        ]
    }

    fn testflight(build: &BuildOptions) -> Vec<StepPlan> {
        let script = format!(
            "mkdir -p \"$HOME/private_keys\"\n\
             echo -n \"$APP_STORE_CONNECT_API_KEY_BASE64\" | base64 --decode \
             -o \"$HOME/private_keys/AuthKey_$APP_STORE_CONNECT_API_KEY_ID.p8\"\n\
             xcrun altool --upload-app --type ios --file \"{}\" \
             --apiKey \"$APP_STORE_CONNECT_API_KEY_ID\" \
             --apiIssuer \"$APP_STORE_CONNECT_ISSUER_ID\"",
            artifact_path(build)
        );
        vec![
            StepPlan::run("Upload to TestFlight", script)
                .with_secret_env(APP_STORE_CONNECT_API_KEY_ID)
                .with_secret_env(APP_STORE_CONNECT_ISSUER_ID)
                .with_secret_env(APP_STORE_CONNECT_API_KEY_BASE64),
        ]
    }
}

impl StepContributor for StorageContributor {
    fn id(&self) -> &'static str {
        "storage"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Artifact
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.is_primary() && ctx.build().is_some()
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        let Some(build) = ctx.build() else {
            return Vec::new();
        };
        match (build.storage, build.platform) {
            (Storage::Github, _) => Self::github(build),
            (Storage::S3, _) => Self::s3(build),
            (Storage::Firebase, _) => Self::firebase(build),
            (Storage::Testflight, Platform::Ios) => Self::testflight(build),
            (Storage::Testflight, Platform::Android) => Vec::new(),
        }
    }

    fn notes(&self, ctx: &JobContext<'_>) -> Vec<String> {
        match ctx.build() {
            Some(build)
                if build.storage == Storage::Testflight && build.platform == Platform::Android =>
            {
                vec![
                    "TestFlight distribution is only available for iOS; \
                     the Android build is not uploaded"
                        .to_string(),
                ]
            }
            _ => Vec::new(),
        }
    }
}

/// Uploads the coverage report of a test run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageContributor;

impl StepContributor for CoverageContributor {
    fn id(&self) -> &'static str {
        "coverage"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Artifact
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.is_primary_of(Kind::Test)
    }

    fn contribute(&self, _ctx: &JobContext<'_>) -> Vec<StepPlan> {
        vec![
            StepPlan::uses("Upload coverage", "actions/upload-artifact@v4")
                .with_input("name", "coverage")
                .with_input("path", "coverage/")
                .with_input("if-no-files-found", "warn")
                .with_condition(Condition::Always),
        ]
    }
}
