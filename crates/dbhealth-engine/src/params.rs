//! Bounded rendering of query parameters for error messages

use dbhealth_core::{QueryConfig, Value};

/// Render parameters as `[p1, p2, ...]`
///
/// At most `max_rendered_params` values are shown, each cut to
/// `max_rendered_param_len` characters. Hidden values are reported as
/// `(N more params than shown)`.
pub fn render_params(params: &[Value], config: &QueryConfig) -> String {
    let shown: Vec<String> = params
        .iter()
        .take(config.max_rendered_params)
        .map(|p| truncate(&p.to_string(), config.max_rendered_param_len))
        .collect();

    let mut rendered = format!("[{}]", shown.join(", "));
    let hidden = params.len().saturating_sub(shown.len());
    if hidden > 0 {
        rendered.push_str(&format!(" ({} more params than shown)", hidden));
    }
    rendered
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
