//! Build information captured at compile time.

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git commit hash (7 chars), or `unknown` outside a checkout.
pub const BUILD_HASH: &str = env!("BUILD_HASH");

const BUILD_DIRTY: &str = env!("BUILD_DIRTY");

/// Whether the build came from a working tree with uncommitted changes.
#[must_use]
pub fn is_dirty() -> bool {
    BUILD_DIRTY == "true"
}

/// Version shown by `--version`.
///
/// Format: `0.1.0 (abc1234)`, `0.1.0 (abc1234-dirty)`, or plain `0.1.0`
/// when no commit is known.
#[must_use]
pub fn version_string() -> String {
    match (BUILD_HASH, is_dirty()) {
        ("unknown", _) => VERSION.to_string(),
        (hash, true) => format!("{VERSION} ({hash}-dirty)"),
        (hash, false) => format!("{VERSION} ({hash})"),
    }
}

/// `User-Agent` sent with every request.
#[must_use]
pub fn user_agent() -> String {
    format!("{}/{VERSION}", crate::mcp::CLIENT_NAME)
}
