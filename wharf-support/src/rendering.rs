//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to format resolution chains, type names,
//! and helpful suggestions in error output.

/// Renders a resolution chain as a readable string.
///
/// # Examples
/// ```
/// use wharf_support::rendering::render_chain;
///
/// let chain = vec!["mailer", "transport", "logger", "mailer"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "mailer → transport → logger → mailer");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders a resolution chain with scope annotations.
///
/// ```text
/// [container] mailer
///           ↓
/// [request]   request_logger
/// ```
pub fn render_chain_vertical(entries: &[ChainEntry]) -> String {
    let mut result = String::new();
    let max_scope_len = entries
        .iter()
        .map(|e| e.scope.len())
        .max()
        .unwrap_or(0);

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            result.push_str(&" ".repeat(max_scope_len + 3));
            result.push_str("↓\n");
        }

        result.push_str(&format!(
            "[{:<width$}] {}",
            entry.scope,
            entry.service,
            width = max_scope_len,
        ));

        if let Some(level) = entry.level {
            result.push_str(&format!("  (level {level})"));
        }

        result.push('\n');
    }

    result
}

/// An entry in a resolution chain for vertical rendering.
#[derive(Debug, Clone)]
pub struct ChainEntry {
    /// The service id
    pub service: String,
    /// The owning scope name (e.g., "container", "request")
    pub scope: String,
    /// Optional: the level of the owning scope
    pub level: Option<i32>,
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use wharf_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => {
                current_segment.push(ch);
            }
        }
    }

    result.push_str(&current_segment);
    result
}

/// Generates "did you mean?" suggestions from a list of known names.
///
/// Service ids and parameter names are dotted (`mailer.transport`), so
/// besides substring matches the last dotted segment is compared too.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_tail = last_segment(&requested_lower);

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            if name_lower == requested_lower {
                return None;
            }

            if name_lower.contains(&requested_lower)
                || requested_lower.contains(&name_lower)
            {
                return Some((name, 100));
            }

            let name_tail = last_segment(&name_lower);
            if name_tail == requested_tail {
                return Some((name, 80));
            }

            let common = name_lower
                .chars()
                .zip(requested_lower.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
