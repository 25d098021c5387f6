//! Text rendering utilities for human-friendly diagnostics.
//!
//! Provides helpers to format dependency paths, qualified type names,
//! "did you mean?" suggestions and step-by-step plan outlines.

/// Renders a dependency path as a readable string.
///
/// # Examples
/// ```
/// use wiregen_support::rendering::render_chain;
///
/// let chain = vec!["app::Event", "app::Greeter", "app::Event"];
/// assert_eq!(render_chain(&chain), "app::Event -> app::Greeter -> app::Event");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Shortens a fully qualified type name for display and naming.
///
/// Every path inside the name is reduced to its last segment, so generic
/// arguments and references keep their shape.
///
/// ```
/// use wiregen_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::greet::Greeter"), "Greeter");
/// assert_eq!(
///     shorten_type_name("std::sync::Arc<dyn app::log::Logger>"),
///     "Arc<dyn Logger>"
/// );
/// assert_eq!(shorten_type_name("&'static app::Config"), "&'static Config");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut segment = String::new();
    let mut chars = full_name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '&' | '*' | '[' | ']' | '(' | ')' | ';' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Suggests available names that are close to `requested`.
///
/// Candidates are ranked by edit distance between their short names;
/// a substring match on the short name ranks first. Ties keep the order
/// of `available`, so results are stable for a stable input.
///
/// ```
/// use wiregen_support::rendering::suggest_similar;
///
/// let available = ["app::Greeter", "app::Message", "app::Event"];
/// let found = suggest_similar("app::Greter", &available, 2);
/// assert_eq!(found, vec!["app::Greeter".to_string()]);
/// ```
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let wanted = shorten_type_name(requested).to_lowercase();
    let threshold = (wanted.chars().count() / 3).max(1);

    let mut scored: Vec<(usize, &str)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let short = shorten_type_name(name).to_lowercase();
            if short.is_empty() {
                return None;
            }
            if short.contains(&wanted) || wanted.contains(&short) {
                return Some((0, name));
            }
            let distance = edit_distance(&wanted, &short);
            (distance <= threshold).then_some((distance, name))
        })
        .collect();

    scored.sort_by_key(|(distance, _)| *distance);
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// One line of a plan outline.
#[derive(Debug)]
pub struct OutlineEntry {
    /// Short label for the kind of step (e.g. "call", "value")
    pub label: String,
    /// The step itself, already rendered
    pub text: String,
    /// Extra markers appended after the step (e.g. "check err")
    pub notes: Vec<String>,
}

/// Renders a list of steps as an aligned outline.
///
/// ```text
/// [call ] message = app::new_message()
/// [call ] event = app::new_event(greeter)  (check err, cleanup)
/// ```
pub fn render_outline(entries: &[OutlineEntry]) -> String {
    let width = entries.iter().map(|e| e.label.len()).max().unwrap_or(0);
    let mut result = String::new();

    for entry in entries {
        result.push_str(&format!("[{:<width$}] {}", entry.label, entry.text));
        if !entry.notes.is_empty() {
            result.push_str(&format!("  ({})", entry.notes.join(", ")));
        }
        result.push('\n');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_cycle_chain() {
        let chain = vec!["A", "B", "A"];
        assert_eq!(render_chain(&chain), "A -> B -> A");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn shorten_without_path() {
        assert_eq!(shorten_type_name("String"), "String");
    }

    #[test]
    fn shorten_nested_generics() {
        assert_eq!(
            shorten_type_name("std::collections::HashMap<alloc::string::String, app::Config>"),
            "HashMap<String, Config>"
        );
    }

    #[test]
    fn shorten_slices_and_tuples() {
        assert_eq!(shorten_type_name("[app::Item]"), "[Item]");
        assert_eq!(shorten_type_name("(app::A, app::B)"), "(A, B)");
    }

    #[test]
    fn suggest_typo() {
        let available = ["app::UserService", "app::UserRepository", "app::Database"];
        let found = suggest_similar("app::UserServise", &available, 3);
        assert_eq!(found.first().map(String::as_str), Some("app::UserService"));
    }

    #[test]
    fn suggest_nothing_close() {
        let available = ["app::Database"];
        assert!(suggest_similar("app::XyzAbcDef", &available, 3).is_empty());
    }

    #[test]
    fn suggest_skips_exact_name() {
        let available = ["app::Database"];
        assert!(suggest_similar("app::Database", &available, 3).is_empty());
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn outline_alignment() {
        let entries = vec![
            OutlineEntry {
                label: "call".to_string(),
                text: "message = new_message()".to_string(),
                notes: vec![],
            },
            OutlineEntry {
                label: "value".to_string(),
                text: "port = 8080".to_string(),
                notes: vec!["check err".to_string()],
            },
        ];

        let rendered = render_outline(&entries);
        assert_eq!(
            rendered,
            "[call ] message = new_message()\n[value] port = 8080  (check err)\n"
        );
    }
}
