//! Variable naming for construction plans.
//!
//! Names are derived from a type's short name (`Greeter` → `greeter`,
//! `HTTPClient` → `httpClient`). When that is taken, the last path segment
//! qualifies it (`bar::Service` → `barService`); a numeric suffix is the
//! last resort.

use std::collections::HashSet;

use tracing::trace;

const WRAPPER_KEYWORDS: &[&str] = &["dyn", "impl", "mut", "const"];

/// The innermost named type of a type name and the path segment in
/// front of it, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PathName<'a> {
    qualifier: Option<&'a str>,
    ident: &'a str,
}

/// Derives a variable name from a qualified type name.
///
/// The innermost named type wins, so `Arc<dyn Logger>` becomes `logger`.
/// Falls back to `v` when nothing usable is left.
///
/// ```
/// use wiregen_support::naming::variable_name;
///
/// assert_eq!(variable_name("app::greet::Greeter"), "greeter");
/// assert_eq!(variable_name("std::sync::Arc<dyn app::Logger>"), "logger");
/// assert_eq!(variable_name("app::HTTPClient"), "httpClient");
/// ```
pub fn variable_name(type_name: &str) -> String {
    match innermost_path(type_name) {
        Some(path) => lower_camel(path.ident),
        None => "v".to_string(),
    }
}

/// Like [`variable_name`], prefixed with the segment that qualifies the
/// type: `foo::Config` → `fooConfig`. `None` for unqualified types.
///
/// ```
/// use wiregen_support::naming::qualified_variable_name;
///
/// assert_eq!(qualified_variable_name("example::bar::Service").as_deref(), Some("barService"));
/// assert_eq!(qualified_variable_name("Service"), None);
/// ```
pub fn qualified_variable_name(type_name: &str) -> Option<String> {
    let path = innermost_path(type_name)?;
    let qualifier = path.qualifier?;

    let mut name = String::new();
    for (i, part) in qualifier.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            name.push_str(&lower_camel(part));
        } else {
            name.push_str(&upper_first(part));
        }
    }
    name.push_str(&upper_first(path.ident));
    Some(name)
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '\''
}

/// Picks the first path at the deepest generic nesting level.
fn innermost_path(name: &str) -> Option<PathName<'_>> {
    let mut best: Option<(usize, PathName<'_>)> = None;
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut segment: Option<&str> = None;
    let mut chars = name.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if is_ident_char(ch) {
            if start.is_none() {
                start = Some(idx);
            }
            continue;
        }
        let separator = name[idx..].starts_with("::");
        if let Some(begin) = start.take() {
            let ident = &name[begin..idx];
            if separator {
                segment = Some(ident);
                chars.next();
                continue;
            }
            let qualifier = segment.take();
            best = pick(best, PathName { qualifier, ident }, depth);
        }
        if separator {
            chars.next();
            continue;
        }
        segment = None;
        match ch {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if let Some(begin) = start {
        let qualifier = segment.take();
        best = pick(best, PathName { qualifier, ident: &name[begin..] }, depth);
    }

    best.map(|(_, path)| path)
}

fn pick<'a>(best: Option<(usize, PathName<'a>)>, path: PathName<'a>, depth: usize) -> Option<(usize, PathName<'a>)> {
    let ident = path.ident;
    let usable = !ident.starts_with('\'')
        && !WRAPPER_KEYWORDS.contains(&ident)
        && ident.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_');
    if !usable {
        return best;
    }
    match best {
        Some((best_depth, _)) if best_depth >= depth => best,
        _ => Some((depth, path)),
    }
}

fn upper_first(ident: &str) -> String {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercases the leading run of capitals, keeping the last one when it
/// starts the next word (`HTTPClient` → `httpClient`).
fn lower_camel(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let upper_run = chars.iter().take_while(|c| c.is_uppercase()).count();

    let lowered = match upper_run {
        0 => return ident.to_string(),
        n if n == chars.len() => n,
        1 => 1,
        n if chars[n].is_lowercase() => n - 1,
        n => n,
    };

    chars
        .iter()
        .enumerate()
        .flat_map(|(i, c)| {
            if i < lowered {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![*c]
            }
        })
        .collect()
}

/// Hands out unique names within one plan.
#[derive(Debug, Default)]
pub struct Namer {
    taken: HashSet<String>,
}

impl Namer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as unavailable without handing it out.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.taken.insert(name.into());
    }

    /// Names a variable holding a value of `type_name`.
    ///
    /// Tries [`variable_name`], then [`qualified_variable_name`], then
    /// numbered variants of the qualified name.
    pub fn fresh_for(&mut self, type_name: &str) -> String {
        let base = variable_name(type_name);
        if self.taken.insert(base.clone()) {
            return base;
        }
        match qualified_variable_name(type_name) {
            Some(qualified) if self.taken.insert(qualified.clone()) => {
                trace!(base = %base, name = %qualified, "Qualified variable name");
                qualified
            }
            Some(qualified) => self.fresh(&qualified),
            None => self.fresh(&base),
        }
    }

    /// Returns `base` if free, otherwise `base2`, `base3`, ...
    pub fn fresh(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut suffix = 2usize;
        loop {
            let candidate = format!("{base}{suffix}");
            if self.taken.insert(candidate.clone()) {
                trace!(base, name = %candidate, "Disambiguated variable name");
                return candidate;
            }
            suffix += 1;
        }
    }
}
