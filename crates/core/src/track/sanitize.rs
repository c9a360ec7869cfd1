//! Filename sanitization.

/// Keeps ASCII alphanumerics, spaces, hyphens, parentheses and periods,
/// then trims surrounding whitespace.
///
/// Path separators and shell metacharacters never survive, so the result is
/// safe to use as a single path component. Applying it twice is a no-op.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Like [`sanitize`], falling back to `fallback` when nothing is left.
pub fn sanitize_or(name: &str, fallback: &str) -> String {
    let cleaned = sanitize(name);
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_disallowed_characters() {
        assert_eq!(sanitize("Song/Name?!"), "SongName");
        assert_eq!(sanitize("AC/DC - Back In Black"), "ACDC - Back In Black");
        assert_eq!(sanitize("Don't Stop Me Now"), "Dont Stop Me Now");
    }

    #[test]
    fn test_keeps_allowed_punctuation() {
        assert_eq!(
            sanitize("Song (Live) - Remastered 2011."),
            "Song (Live) - Remastered 2011."
        );
    }

    #[test]
    fn test_is_idempotent() {
        let inputs = [
            "Song/Name?!",
            "  padded  ",
            "$(rm -rf ~)",
            "Beyoncé – Halo",
            "../../etc/passwd",
            "a\tb\nc",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_blocks_path_traversal_and_shell_metacharacters() {
        let cleaned = sanitize("../../etc/passwd; rm -rf / | cat `id` $HOME");
        assert!(!cleaned.contains('/'));
        assert!(!cleaned.contains(';'));
        assert!(!cleaned.contains('|'));
        assert!(!cleaned.contains('`'));
        assert!(!cleaned.contains('$'));
        // Dots survive but can no longer form a separate path segment.
        assert!(cleaned.starts_with("....etcpasswd"));
    }

    #[test]
    fn test_non_ascii_is_removed() {
        assert_eq!(sanitize("Beyoncé"), "Beyonc");
        assert_eq!(sanitize("東京"), "");
    }

    #[test]
    fn test_trims_result() {
        assert_eq!(sanitize("  ?Hello?  "), "Hello");
    }

    #[test]
    fn test_sanitize_or_fallback() {
        assert_eq!(sanitize_or("???", "Untitled"), "Untitled");
        assert_eq!(sanitize_or("Hits!", "Untitled"), "Hits");
    }
}
