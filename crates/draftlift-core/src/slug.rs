const MAX_SLUG_LEN: usize = 100;

/// Turns a display name into a filesystem- and URL-safe directory name.
///
/// Lowercases, folds whitespace runs into `-`, drops anything outside
/// `[a-z0-9._-]`, collapses repeated dashes, trims leading and trailing
/// `-`, `_` and `.`, and caps the result at 100 characters. The empty string
/// means "not publishable".
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
            continue;
        }
        if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '.' || ch == '_') {
            continue;
        }
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        slug.push(ch);
    }

    let trimmed = slug.trim_matches(|c| matches!(c, '-' | '_' | '.'));
    let capped: String = trimmed.chars().take(MAX_SLUG_LEN).collect();
    capped
        .trim_end_matches(|c| matches!(c, '-' | '_' | '.'))
        .to_string()
}
