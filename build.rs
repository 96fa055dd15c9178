use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=JSC_GIT_COMMIT");

    if let Ok(v) = env::var("JSC_GIT_COMMIT") {
        let v = v.trim();
        if !v.is_empty() {
            println!("cargo:rustc-env=JSC_GIT_COMMIT={v}");
            return;
        }
    }

    println!("cargo:rerun-if-changed=.git/HEAD");

    let commit = git_commit().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=JSC_GIT_COMMIT={commit}");
}

fn git_commit() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if s.is_empty() { None } else { Some(s) }
}
