/// Text and URI helpers shared by the request handlers.
///
/// Positions are LSP positions: 0-based lines, columns counted in
/// characters.
use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::*;

use crate::Backend;

/// Letters, digits and `_`.
pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Line `position.line` of `content`, if it exists.
pub fn line_at(content: &str, line: u32) -> Option<&str> {
    content.lines().nth(line as usize)
}

/// The text of the cursor's line up to the cursor.
///
/// A cursor past the last line (editors send this for a trailing newline)
/// yields an empty string.
pub fn line_prefix(content: &str, position: Position) -> String {
    line_at(content, position.line)
        .map(|line| line.chars().take(position.character as usize).collect())
        .unwrap_or_default()
}

/// The identifier under the cursor, `$` and `\` included.
pub fn word_at(content: &str, position: Position) -> Option<String> {
    let chars: Vec<char> = line_at(content, position.line)?.chars().collect();
    let col = position.character as usize;
    if col > chars.len() {
        return None;
    }
    let part_of_word = |c: char| is_identifier_char(c) || c == '$' || c == '\\';
    let mut start = col;
    while start > 0 && part_of_word(chars[start - 1]) {
        start -= 1;
    }
    let mut end = col;
    while end < chars.len() && part_of_word(chars[end]) {
        end += 1;
    }
    if start == end {
        return None;
    }
    Some(chars[start..end].iter().collect())
}

/// Byte offset of `position` in `content`.
pub fn position_to_offset(content: &str, position: Position) -> usize {
    let mut offset = 0;
    for (i, line) in content.split_inclusive('\n').enumerate() {
        if i == position.line as usize {
            let column = line
                .char_indices()
                .nth(position.character as usize)
                .map(|(idx, _)| idx)
                .unwrap_or(line.trim_end_matches(['\n', '\r']).len());
            return offset + column;
        }
        offset += line.len();
    }
    content.len()
}

/// The URI without its last segment: `file:///a/b.zy` → `file:///a`.
pub fn uri_dir(uri: &str) -> Option<&str> {
    uri.rsplit_once('/').map(|(dir, _)| dir)
}

pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    Url::parse(uri).ok()?.to_file_path().ok()
}

pub fn path_to_uri(path: &Path) -> Option<String> {
    Url::from_file_path(path).ok().map(|url| url.to_string())
}

impl Backend {
    /// Send a `window/logMessage` when a client is attached.
    pub(crate) async fn log(&self, typ: MessageType, message: String) {
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    #[test]
    fn words_include_sigils_and_namespaces() {
        let src = "<?php\n$user = new App\\User();\n";
        assert_eq!(word_at(src, pos(1, 2)).as_deref(), Some("$user"));
        assert_eq!(word_at(src, pos(1, 14)).as_deref(), Some("App\\User"));
        assert_eq!(word_at(src, pos(1, 6)), None);
    }

    #[test]
    fn prefix_and_offsets_count_characters() {
        let src = "<?php\n$é = 1;\n";
        assert_eq!(line_prefix(src, pos(1, 2)), "$é");
        assert_eq!(position_to_offset(src, pos(1, 2)), 6 + 3);
        assert_eq!(line_prefix(src, pos(9, 0)), "");
        assert_eq!(position_to_offset(src, pos(9, 0)), src.len());
    }

    #[test]
    fn uri_helpers() {
        assert_eq!(uri_dir("file:///a/b/c.zy"), Some("file:///a/b"));
        let path = uri_to_path("file:///tmp/x.zy").expect("path");
        assert_eq!(path, PathBuf::from("/tmp/x.zy"));
        assert_eq!(path_to_uri(&path).as_deref(), Some("file:///tmp/x.zy"));
    }
}
