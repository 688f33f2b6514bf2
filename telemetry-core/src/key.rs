//! Dotted-path key construction shared by every meter that has to report
//! under a prefix: multi-meters joining a child label onto their own path,
//! the poller joining its configured prefix onto a meter's registration
//! path, and the struct recorder joining a field name onto its parent.

/// Joins `prefix` and `suffix` with a `.`, eliding the separator (and the
/// empty side) when either half is empty.
pub fn join(prefix: &str, suffix: &str) -> String {
    match (prefix.is_empty(), suffix.is_empty()) {
        (true, _) => suffix.to_string(),
        (_, true) => prefix.to_string(),
        (false, false) => format!("{prefix}.{suffix}"),
    }
}
