//! Route template compilation.
//!
//! A template is turned into an anchored regular expression once, at
//! registration time. Supported syntax:
//!
//! | Template        | Meaning                                       |
//! |-----------------|-----------------------------------------------|
//! | `/about`        | literal segment                               |
//! | `/users/:id`    | named parameter, one path segment             |
//! | `/files/:n(\d+)`| named parameter with a custom expression      |
//! | `/files/(.*)`   | positional capture (the wildcard)             |
//! | `/files/*`      | shorthand for `(.*)`                          |
//! | `\:`            | escaped literal                               |
//!
//! Captures are reported through an ordered [`Token`] list: named
//! parameters by name, unnamed groups by their position among the unnamed
//! groups, counting from zero.

use std::collections::HashSet;

use regex::Regex;

use crate::config::RouterOptions;
use crate::router::error::PatternError;

/// What a named parameter matches when no expression is given.
const SEGMENT: &str = "[^/]+?";

/// Identity of one capture group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Named(String),
    Positional(usize),
}

impl Token {
    pub fn name(&self) -> Option<&str> {
        match self {
            Token::Named(name) => Some(name),
            Token::Positional(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    pub sensitive: bool,
    pub strict: bool,
}

impl From<RouterOptions> for PatternOptions {
    fn from(opts: RouterOptions) -> Self {
        Self {
            sensitive: opts.case_sensitive,
            strict: opts.strict,
        }
    }
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct Pattern {
    template: String,
    regex: Regex,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Compiles `template`.
    ///
    /// Unless `strict` is set the pattern also accepts one trailing slash.
    ///
    /// ```
    /// use waypoint::router::pattern::{Pattern, PatternOptions};
    ///
    /// let p = Pattern::compile("/users/:id", PatternOptions::default()).unwrap();
    /// assert!(p.is_match("/users/42"));
    /// assert!(p.is_match("/USERS/42/"));
    /// assert!(!p.is_match("/users/42/posts"));
    /// ```
    pub fn compile(template: &str, options: PatternOptions) -> Result<Self, PatternError> {
        let (mut body, tokens) = translate(template)?;

        if !options.strict {
            if body.ends_with('/') {
                body.pop();
            }
            body.push_str("/?");
        }

        let regex = build_regex(template, &body, options.sensitive, tokens.len())?;
        Ok(Self {
            template: template.to_string(),
            regex,
            tokens,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path`, returning one entry per token in token order.
    ///
    /// An entry is `None` when its group did not participate in the match.
    pub fn captures(&self, path: &str) -> Option<Vec<Option<String>>> {
        let caps = self.regex.captures(path)?;
        Some(
            (1..=self.tokens.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect(),
        )
    }
}

/// Recovers the part of a request path consumed by ancestor mounts.
///
/// Built from a mount prefix `P` as `^(P)/(.*)$`; group 1 is the consumed
/// prefix with any parameters in `P` filled in.
#[derive(Debug, Clone)]
pub struct BaseMatcher {
    prefix: String,
    regex: Regex,
}

impl BaseMatcher {
    pub fn compile(prefix: &str, options: PatternOptions) -> Result<Self, PatternError> {
        let (mut body, tokens) = translate(prefix)?;
        if body.ends_with('/') {
            body.pop();
        }

        let regex = build_regex(
            prefix,
            &format!("({body})/(.*)"),
            options.sensitive,
            tokens.len() + 2,
        )?;
        Ok(Self {
            prefix: prefix.to_string(),
            regex,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn consumed<'a>(&self, path: &'a str) -> Option<&'a str> {
        self.regex
            .captures(path)?
            .get(1)
            .map(|m| m.as_str())
    }
}

fn build_regex(
    template: &str,
    body: &str,
    sensitive: bool,
    groups: usize,
) -> Result<Regex, PatternError> {
    let source = if sensitive {
        format!("^{body}$")
    } else {
        format!("(?i)^{body}$")
    };

    let regex = Regex::new(&source).map_err(|e| PatternError::Regex {
        template: template.to_string(),
        reason: e.to_string(),
    })?;

    // captures_len counts the implicit whole-match group
    if regex.captures_len() != groups + 1 {
        return Err(PatternError::NestedGroup {
            template: template.to_string(),
        });
    }
    Ok(regex)
}

/// Rejects a template that names the same parameter twice.
///
/// Only checked for templates as registered. A mounted route may repeat a
/// name its mount prefix already uses.
pub(crate) fn ensure_unique_names(template: &str, tokens: &[Token]) -> Result<(), PatternError> {
    let mut seen = HashSet::new();
    for name in tokens.iter().filter_map(Token::name) {
        if !seen.insert(name) {
            return Err(PatternError::DuplicateParam {
                template: template.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Translates a template into an unanchored regex body plus its tokens.
fn translate(template: &str) -> Result<(String, Vec<Token>), PatternError> {
    let chars: Vec<(usize, char)> = template.char_indices().collect();
    let mut body = String::with_capacity(template.len() * 2);
    let mut tokens = Vec::new();
    let mut positional = 0;
    let mut buf = [0u8; 4];
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        match ch {
            '\\' => {
                match chars.get(i + 1) {
                    Some(&(_, escaped)) => {
                        body.push_str(&regex::escape(escaped.encode_utf8(&mut buf)));
                        i += 2;
                    }
                    None => {
                        body.push_str(r"\\");
                        i += 1;
                    }
                }
            }
            ':' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_name_char(chars[end].1) {
                    end += 1;
                }
                if end == start {
                    return Err(PatternError::EmptyParamName {
                        template: template.to_string(),
                        position: pos,
                    });
                }

                let name: String = chars[start..end].iter().map(|&(_, c)| c).collect();

                let expr = if matches!(chars.get(end), Some(&(_, '('))) {
                    let (expr, close) = group(template, &chars, end)?;
                    i = close + 1;
                    expr
                } else {
                    i = end;
                    SEGMENT
                };

                body.push('(');
                body.push_str(expr);
                body.push(')');
                tokens.push(Token::Named(name));
            }
            '(' => {
                let (expr, close) = group(template, &chars, i)?;
                body.push('(');
                body.push_str(expr);
                body.push(')');
                tokens.push(Token::Positional(positional));
                positional += 1;
                i = close + 1;
            }
            ')' => {
                return Err(PatternError::UnbalancedParen {
                    template: template.to_string(),
                    position: pos,
                });
            }
            '*' => {
                body.push_str("(.*)");
                tokens.push(Token::Positional(positional));
                positional += 1;
                i += 1;
            }
            _ => {
                body.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }

    Ok((body, tokens))
}

/// Scans the group opening at `chars[open]`, returning its inner text and
/// the index of the closing parenthesis.
fn group<'t>(
    template: &'t str,
    chars: &[(usize, char)],
    open: usize,
) -> Result<(&'t str, usize), PatternError> {
    let mut depth = 0usize;
    let mut k = open;

    while k < chars.len() {
        match chars[k].1 {
            '\\' => {
                k += 2;
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let inner = &template[chars[open].0 + 1..chars[k].0];
                    if inner.is_empty() {
                        return Err(PatternError::EmptyGroup {
                            template: template.to_string(),
                            position: chars[open].0,
                        });
                    }
                    return Ok((inner, k));
                }
            }
            _ => {}
        }
        k += 1;
    }

    Err(PatternError::UnbalancedParen {
        template: template.to_string(),
        position: chars[open].0,
    })
}
