use std::process::Command;

fn main() {
    // Short commit hash exposed to the wasm build via get_build_commit()
    let commit_hash = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=BUILD_COMMIT={}", commit_hash);
    println!("cargo:rerun-if-changed=.git/HEAD");
}
