//! Build script for organ-play
//!
//! Stamps the binary with the commit it was built from and when, so a
//! startup log line identifies exactly which player is driving the organ.

use std::process::Command;

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|hash| hash.trim().to_string())
}

fn main() {
    let commit = git_short_hash().unwrap_or_else(|| "unknown".to_string());
    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    println!("cargo:rustc-env=ORGAN_PLAY_COMMIT={}", commit);
    println!("cargo:rustc-env=ORGAN_PLAY_BUILT_AT={}", built_at);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}
