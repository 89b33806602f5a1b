// src/utils/html.rs

/// Strips markup from a user-supplied string before it is stored or echoed.
///
/// Whitelist based: safe tags like <b> survive, <script> is removed with
/// its content, event attributes are dropped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
