//! Removal of characters that are unsafe on the command line

use regex::Regex;
use std::sync::LazyLock;

/// Word characters, npm name characters, semver range characters, `=`, `?` and space
const UNSAFE_CLI_CHARS: &str = r"[^\w@/.<>()|~^+*=? -]";

/// Word characters plus `@`, `/`, `.` and `-`
const UNSAFE_NPM_CHARS: &str = r"[^\w@/.-]";

static UNSAFE_CLI: LazyLock<Regex> = LazyLock::new(|| Regex::new(UNSAFE_CLI_CHARS).unwrap());
static UNSAFE_NPM: LazyLock<Regex> = LazyLock::new(|| Regex::new(UNSAFE_NPM_CHARS).unwrap());

/// Strip characters that are not safe in a command-line argument
pub fn sanitize_arg(raw: &str) -> String {
    // \w is Unicode-aware in regex; npm names are ASCII
    UNSAFE_CLI
        .replace_all(raw, "")
        .chars()
        .filter(char::is_ascii)
        .collect()
}

/// Strip characters that cannot appear in an npm package spec
pub fn sanitize_package_name(raw: &str) -> String {
    UNSAFE_NPM
        .replace_all(raw, "")
        .chars()
        .filter(char::is_ascii)
        .collect()
}

pub fn sanitize_args(raw: &[String]) -> Vec<String> {
    raw.iter().map(|arg| sanitize_arg(arg)).collect()
}
