//! Resolution of `nodeset`/`ref` path references against a base path.

/// Resolve `raw` against `base`.
///
/// Absolute references are returned unchanged. A leading `../` climbs exactly
/// one level; deeper `../../` chains are not collapsed and end up appended
/// verbatim after the first climb.
pub fn resolve(raw: &str, base: &str) -> String {
    if raw.starts_with('/') {
        return raw.to_string();
    }
    if let Some(rest) = raw.strip_prefix("..") {
        if rest.starts_with('/') {
            return format!("{}{}", parent(base), rest);
        }
    }
    if raw == "." {
        return base.to_string();
    }
    let raw = raw.strip_prefix("./").unwrap_or(raw);
    format!("{base}/{raw}")
}

/// Drop the last `/`-delimited segment of `path`.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// HTML-safe element name derived from a field path (`/` becomes `_`).
pub fn element_name(path: &str) -> String {
    path.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_forms() {
        assert_eq!(resolve("../foo", "/a/b/c"), "/a/b/foo");
        assert_eq!(resolve("./bar", "/a/b"), "/a/b/bar");
        assert_eq!(resolve(".", "/a/b"), "/a/b");
        assert_eq!(resolve("baz", "/a/b"), "/a/b/baz");
        assert_eq!(resolve("/x/y", "/a/b"), "/x/y");
    }

    #[test]
    fn single_level_climb_only() {
        assert_eq!(resolve("../../foo", "/a/b/c"), "/a/b/../foo");
    }

    #[test]
    fn element_names() {
        assert_eq!(element_name("/data/group/age"), "_data_group_age");
        assert_eq!(parent("/data"), "");
    }
}
