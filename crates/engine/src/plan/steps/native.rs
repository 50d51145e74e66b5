//! Native Android and iOS build steps.

use super::{JobContext, StepContributor, StepPhase};
use crate::config::Platform;
use crate::plan::{Condition, StepPlan};
use crate::secrets::{
    IOS_CERTIFICATE_P12_BASE64, IOS_CERTIFICATE_PASSWORD, IOS_KEYCHAIN_PASSWORD,
    IOS_PROVISIONING_PROFILE_BASE64,
};

/// Gradle `assemble<Variant>` in `android/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AndroidBuildContributor;

impl StepContributor for AndroidBuildContributor {
    fn id(&self) -> &'static str {
        "android-build"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Kind
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.primary_build_for(Platform::Android).is_some()
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        let Some(build) = ctx.build() else {
            return Vec::new();
        };
        let task = format!("assemble{}", build.variant.title());
        vec![
            StepPlan::run(
                format!("Build Android {}", build.variant.title()),
                format!("chmod +x gradlew\n./gradlew {task} --no-daemon"),
            )
            .with_working_directory("android"),
        ]
    }
}

const KEYCHAIN_SETUP: &str = r#"CERT_PATH="$RUNNER_TEMP/certificate.p12"
PROFILE_PATH="$RUNNER_TEMP/profile.mobileprovision"
KEYCHAIN_PATH="$RUNNER_TEMP/build.keychain-db"
echo -n "$IOS_CERTIFICATE_P12_BASE64" | base64 --decode -o "$CERT_PATH"
echo -n "$IOS_PROVISIONING_PROFILE_BASE64" | base64 --decode -o "$PROFILE_PATH"
security create-keychain -p "$IOS_KEYCHAIN_PASSWORD" "$KEYCHAIN_PATH"
security set-keychain-settings -lut 21600 "$KEYCHAIN_PATH"
security unlock-keychain -p "$IOS_KEYCHAIN_PASSWORD" "$KEYCHAIN_PATH"
security import "$CERT_PATH" -P "$IOS_CERTIFICATE_PASSWORD" -A -t cert -f pkcs12 -k "$KEYCHAIN_PATH"
security list-keychain -d user -s "$KEYCHAIN_PATH"
mkdir -p "$HOME/Library/MobileDevice/Provisioning Profiles"
cp "$PROFILE_PATH" "$HOME/Library/MobileDevice/Provisioning Profiles""#;

/// Code signing setup, `xcodebuild archive` and IPA export in `ios/`.
///
/// The workspace and scheme are discovered from the first `*.xcworkspace`;
/// export options are read from `ios/ExportOptions.plist`. The exported IPA
/// is renamed to `ios/build/ipa/app.ipa`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IosBuildContributor;

impl StepContributor for IosBuildContributor {
    fn id(&self) -> &'static str {
        "ios-build"
    }

    fn phase(&self) -> StepPhase {
        StepPhase::Kind
    }

    fn is_active(&self, ctx: &JobContext<'_>) -> bool {
        ctx.primary_build_for(Platform::Ios).is_some()
    }

    fn contribute(&self, ctx: &JobContext<'_>) -> Vec<StepPlan> {
        let Some(build) = ctx.build() else {
            return Vec::new();
        };
        let configuration = build.variant.title();
        let archive = format!(
            "WORKSPACE=$(ls -d *.xcworkspace | head -n 1)\n\
             SCHEME=$(basename \"$WORKSPACE\" .xcworkspace)\n\
             xcodebuild -workspace \"$WORKSPACE\" -scheme \"$SCHEME\" \
             -configuration {configuration} -sdk iphoneos \
             -archivePath build/app.xcarchive archive"
        );
        let export = "xcodebuild -exportArchive -archivePath build/app.xcarchive \
                      -exportPath build/ipa -exportOptionsPlist ExportOptions.plist\n\
                      mv build/ipa/*.ipa build/ipa/app.ipa";

        vec![
            StepPlan::run("Install signing certificate", KEYCHAIN_SETUP)
                .with_secret_env(IOS_CERTIFICATE_P12_BASE64)
                .with_secret_env(IOS_CERTIFICATE_PASSWORD)
                .with_secret_env(IOS_PROVISIONING_PROFILE_BASE64)
                .with_secret_env(IOS_KEYCHAIN_PASSWORD),
            StepPlan::run(format!("Archive iOS {configuration}"), archive)
                .with_working_directory("ios"),
            StepPlan::run("Export IPA", export).with_working_directory("ios"),
            StepPlan::run(
                "Remove signing keychain",
                "security delete-keychain \"$RUNNER_TEMP/build.keychain-db\"",
            )
            .with_condition(Condition::Always),
        ]
    }
}
