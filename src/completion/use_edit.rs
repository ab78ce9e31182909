/// `use` statement insertion for auto-import.
use tower_lsp::lsp_types::*;

/// Line (0-based) where a new `use` statement goes.
///
/// After the last top-level `use` line, otherwise after the `namespace`
/// line, otherwise after the `<?php` tag.  Never line 0, so the opening
/// tag always stays first.
pub(crate) fn find_use_insert_line(content: &str) -> u32 {
    let mut last_use: Option<u32> = None;
    let mut namespace: Option<u32> = None;
    let mut open_tag: Option<u32> = None;

    // `use` inside a class body is a trait import, not a name import.
    let mut depth: u32 = 0;
    let mut braced_namespace = false;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        let depth_at_start = depth;
        for ch in trimmed.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        if trimmed.starts_with("<?") && open_tag.is_none() {
            open_tag = Some(i as u32);
        }
        if trimmed.starts_with("namespace ") {
            namespace = Some(i as u32);
            braced_namespace |= trimmed.contains('{');
        }
        let import_depth = u32::from(braced_namespace);
        if depth_at_start <= import_depth && trimmed.starts_with("use ") {
            last_use = Some(i as u32);
        }
    }

    let anchor = last_use.or(namespace).or(open_tag).unwrap_or(0);
    (anchor + 1).max(1)
}

/// Whether `content` already has a `use` line for `fqn`.
pub(crate) fn already_imported(content: &str, fqn: &str) -> bool {
    let fqn = fqn.trim_start_matches('\\');
    content.lines().any(|line| {
        let Some(clause) = line.trim().strip_prefix("use ") else {
            return false;
        };
        let clause = clause.trim_end_matches(';').trim();
        let clause = clause.strip_prefix("function ").unwrap_or(clause);
        let name = clause.split(" as ").next().unwrap_or(clause).trim();
        name.trim_start_matches('\\').eq_ignore_ascii_case(fqn)
    })
}

/// Edit inserting `use <fqn>;` (or `use function <fqn>;`).
///
/// `None` for global names and names the file already imports.
pub(crate) fn build_use_edit(content: &str, fqn: &str, function: bool) -> Option<Vec<TextEdit>> {
    if !fqn.contains('\\') || already_imported(content, fqn) {
        return None;
    }
    let position = Position {
        line: find_use_insert_line(content),
        character: 0,
    };
    let keyword = if function { "use function" } else { "use" };
    Some(vec![TextEdit {
        range: Range {
            start: position,
            end: position,
        },
        new_text: format!("{keyword} {fqn};\n"),
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_after_last_import() {
        let src = "<?php\nnamespace App;\n\nuse App\\Models\\User;\nuse App\\Models\\Post;\n\nclass A {\n  use Loggable;\n}\n";
        assert_eq!(find_use_insert_line(src), 5);
    }

    #[test]
    fn falls_back_to_namespace_then_open_tag() {
        assert_eq!(find_use_insert_line("<?php\nnamespace App;\nclass A {}\n"), 2);
        assert_eq!(find_use_insert_line("<?php\nclass A {}\n"), 1);
        assert_eq!(find_use_insert_line(""), 1);
    }

    #[test]
    fn skips_global_and_imported_names() {
        let src = "<?php\nuse App\\Mail\\Mailer;\n";
        assert!(build_use_edit(src, "DateTime", false).is_none());
        assert!(build_use_edit(src, "App\\Mail\\Mailer", false).is_none());
        let edit = build_use_edit(src, "App\\Http\\Request", false).expect("edit");
        assert_eq!(edit[0].new_text, "use App\\Http\\Request;\n");
        assert_eq!(edit[0].range.start.line, 2);
    }
}
