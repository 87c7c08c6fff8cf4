//! test-support: helpers for release-readiness integration tests.
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support", features = ["serde"] }
//! ```
//!
//! Then in tests:
//! ```rust,ignore
//! use test_support::{init_tracing, fixture_path};
//!
//! #[test]
//! fn example() {
//!     init_tracing();
//!     let _forge = fixture_path("forge/sprint1.json");
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::env;
use std::path::{Path, PathBuf};

/// Variables the binary reads from the environment; cleared for hermetic CLI runs.
pub const CONFIG_VARS: &[&str] = &[
    "GITHUB_TOKEN",
    "GH_TOKEN",
    "GITHUB_REPO_OWNER",
    "GITHUB_REPO_NAME",
    "GOOGLE_API_KEY",
    "TEST_MILESTONE_TITLE",
    "GEMINI_MODEL",
    "GITHUB_API_URL",
    "RR_TEST_FORGE_FIXTURE",
    "RR_TEST_LLM_FIXTURE",
];

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Initialize insta snapshot settings once per test process.
///
/// Omits `Expression:` in snapshot headers for cleaner diffs.
pub fn init_insta() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let mut settings = insta::Settings::clone_current();
        settings.set_snapshot_path("../snapshots");
        settings.set_omit_expression(true);
        // Bind settings to the thread for the remainder of the test process by leaking the guard
        let guard = settings.bind_to_scope();
        std::mem::forget(guard);
    });
    Lazy::force(&INIT);
}

/// Return the path to the top-level `tests/fixtures` directory.
///
/// This crate lives at `<repo>/tests/support`, so the fixtures sit next to it.
pub fn fixtures_dir() -> PathBuf {
    let support_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    support_dir
        .parent()
        .map(|tests| tests.join("fixtures"))
        .unwrap_or_else(|| support_dir.join("fixtures"))
}

/// Absolute path of a fixture file.
pub fn fixture_path<P: AsRef<Path>>(rel_path: P) -> PathBuf {
    fixtures_dir().join(rel_path)
}

/// Read a UTF-8 text fixture into a string.
pub fn read_fixture_text<P: AsRef<Path>>(rel_path: P) -> String {
    let path = fixture_path(rel_path);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
}

/// Deserialize a JSON fixture into `T` (enable `serde` feature).
#[cfg(feature = "serde")]
pub fn read_fixture_json<T, P>(rel_path: P) -> T
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = fixture_path(rel_path);
    let file = std::fs::File::open(&path)
        .unwrap_or_else(|e| panic!("failed to open fixture {}: {e}", path.display()));
    serde_json::from_reader::<_, T>(file)
        .unwrap_or_else(|e| panic!("failed to parse JSON fixture {}: {e}", path.display()))
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::set_many(vars)
}

/// Remove environment variables for the duration of the returned guard.
pub fn without_env(keys: &[&str]) -> EnvGuard {
    EnvGuard::unset_many(keys)
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_tracing();
    assert_cmd::Command::cargo_bin(bin).expect("binary target not found")
}

/// Like `cmd_bin`, but with every configuration variable removed and the working
/// directory set to `cwd`, so no ambient `.env` or shell variables leak in.
pub fn hermetic_cmd(bin: &str, cwd: &Path) -> assert_cmd::Command {
    let mut cmd = cmd_bin(bin);
    cmd.current_dir(cwd);
    for key in CONFIG_VARS {
        cmd.env_remove(key);
    }
    // Keep `gh auth token` out of reach.
    cmd.env("PATH", "");
    cmd
}

/// Guard for temporarily setting or removing environment variables.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set_many(kv: &[(&str, &str)]) -> Self {
        let mut prev = Vec::with_capacity(kv.len());
        for (k, v) in kv {
            prev.push((k.to_string(), env::var(k).ok()));
            env::set_var(k, v);
        }
        Self { prev }
    }

    pub fn unset_many(keys: &[&str]) -> Self {
        let mut prev = Vec::with_capacity(keys.len());
        for k in keys {
            prev.push((k.to_string(), env::var(k).ok()));
            env::remove_var(k);
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..).rev() {
            match old {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}
