//! Path utilities for route templates.
//!
//! All functions are pure. They keep route templates in one canonical
//! shape so that `"/foo"`, `"foo"` and `"/foo/"` register identically, and
//! derive the prefix a mounted route consumes.

/// The trailing capture appended to middleware routes.
pub const WILDCARD: &str = "(.*)";

/// Normalizes a route template.
///
/// - Adds a leading `/`
/// - Collapses repeated `/` outside parenthesized expressions
/// - Drops a trailing `/`, except for the root
///
/// ```
/// use waypoint::router::path::normalize;
///
/// assert_eq!(normalize(""), "/");
/// assert_eq!(normalize("foo/"), "/foo");
/// assert_eq!(normalize("//a///b/"), "/a/b");
/// assert_eq!(normalize("/:x(a//b)"), "/:x(a//b)");
/// ```
pub fn normalize(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 1);
    out.push('/');

    let mut depth = 0usize;
    let mut escaped = false;
    for ch in template.chars() {
        if escaped {
            escaped = false;
        } else {
            match ch {
                '\\' => escaped = true,
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                '/' if depth == 0 && out.ends_with('/') => continue,
                _ => {}
            }
        }
        out.push(ch);
    }

    if out.len() > 1 && out.ends_with('/') && !is_escaped(&out, out.len() - 1) {
        out.pop();
    }
    out
}

/// Joins a mount prefix and a route, then normalizes.
///
/// ```
/// use waypoint::router::path::join;
///
/// assert_eq!(join("/api", "/users"), "/api/users");
/// assert_eq!(join("/api/", "/"), "/api");
/// assert_eq!(join("/", "/(.*)"), "/(.*)");
/// ```
pub fn join(prefix: &str, route: &str) -> String {
    normalize(&format!("{prefix}/{route}"))
}

/// Whether the byte at `idx` is preceded by an odd run of backslashes.
fn is_escaped(template: &str, idx: usize) -> bool {
    let run = template.as_bytes()[..idx]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    run % 2 == 1
}

/// Whether the template already ends in an unescaped `(.*)` or `*`.
///
/// ```
/// use waypoint::router::path::ends_with_wildcard;
///
/// assert!(ends_with_wildcard("/files/*"));
/// assert!(!ends_with_wildcard(r"/a\*"));
/// ```
pub fn ends_with_wildcard(template: &str) -> bool {
    if template.ends_with(WILDCARD) {
        return !is_escaped(template, template.len() - WILDCARD.len());
    }
    template.ends_with('*') && !is_escaped(template, template.len() - 1)
}

/// Appends the implicit wildcard so a route also matches every sub-path.
pub fn with_wildcard(template: &str) -> String {
    join(template, WILDCARD)
}

/// The template without its trailing wildcard segment.
///
/// ```
/// use waypoint::router::path::strip_wildcard;
///
/// assert_eq!(strip_wildcard("/api/x/(.*)"), "/api/x");
/// assert_eq!(strip_wildcard("/static/*"), "/static");
/// assert_eq!(strip_wildcard("/api/info"), "/api/info");
/// ```
pub fn strip_wildcard(template: &str) -> &str {
    if !ends_with_wildcard(template) {
        return template;
    }
    let cut = if template.ends_with(WILDCARD) {
        WILDCARD.len()
    } else {
        1
    };
    let rest = &template[..template.len() - cut];
    rest.strip_suffix('/').unwrap_or(rest)
}

pub fn is_root(template: &str) -> bool {
    normalize(template) == "/"
}

pub fn has_trailing_slash(path: &str) -> bool {
    path.ends_with('/')
}
