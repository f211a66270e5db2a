//! Policy utilities: no-issue detection and comment shaping.

/// Lowercase phrases that mark a "nothing to report" answer.
pub const NO_ISSUE_PHRASES: [&str; 3] = ["no issue", "no change", "any issue"];

/// True if the lowercased `text` contains any of [`NO_ISSUE_PHRASES`].
///
/// Deliberately lossy: "I can't see any issues" and "No changes needed" are
/// both caught, "LGTM" is not.
pub fn no_issue(text: &str) -> bool {
    let lower = text.to_lowercase();
    NO_ISSUE_PHRASES.iter().any(|p| lower.contains(p))
}

/// Why a generated review was not posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// The model returned nothing but whitespace.
    Blank,
    /// The model reported no problems.
    NoIssue,
}

/// Decides whether `text` should be posted.
pub fn suppression(text: &str) -> Option<Suppression> {
    if text.trim().is_empty() {
        Some(Suppression::Blank)
    } else if no_issue(text) {
        Some(Suppression::NoIssue)
    } else {
        None
    }
}

/// Comment body: attribution header, newline, generated text.
///
/// Leading blank lines (completion models like to open with "\n\n") are
/// dropped; the rest of the text is kept as returned.
pub fn render_comment(header: &str, text: &str) -> String {
    let body = text.trim_start_matches(['\n', '\r']);
    format!("{header}\n{body}")
}
