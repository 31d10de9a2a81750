// src/utils/html.rs

/// Sanitizes learner-supplied text before it is echoed back in feedback.
///
/// Whitelist-based: safe inline tags survive, `<script>` and friends are
/// removed together with their content, event-handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
