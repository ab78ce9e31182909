/// Completion context detection.
///
/// The text of the current line up to the cursor decides which provider
/// answers a completion request.  Triggers are tried in priority order
/// (`->`, `.`, `::`, `$`) and a trigger only counts when everything typed
/// after its last occurrence is identifier characters, so `$a->b($c` is a
/// variable context and not a member context.
///
/// When no trigger applies, the last complete word is inspected: `new`
/// selects class-name completion; a word being typed selects keyword
/// completion.
use crate::util::is_identifier_char;

/// What the user is completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// `subject->prefix`, `subject?->prefix` or `subject.prefix`.
    Member { subject: String, prefix: String },
    /// `Class::prefix`.  The prefix keeps its `$` for static properties.
    Static { class: String, prefix: String },
    /// `$prefix`; the prefix excludes the sigil.
    Variable { prefix: String },
    /// `new Prefix`.
    New { prefix: String },
    /// A bare word being typed.
    Keyword { prefix: String },
    /// Nothing useful to the left of the cursor.
    Default,
}

/// Classify `line` (the current line truncated at the cursor).
pub fn classify(line: &str) -> CompletionContext {
    if line.trim().is_empty() {
        return CompletionContext::Default;
    }

    if let Some(idx) = line.rfind("->") {
        let prefix = &line[idx + 2..];
        if is_identifier(prefix) {
            let end = if line[..idx].ends_with('?') { idx - 1 } else { idx };
            return CompletionContext::Member {
                subject: extract_subject(&line[..end]),
                prefix: prefix.to_string(),
            };
        }
    }

    if let Some(idx) = line.rfind('.') {
        let prefix = &line[idx + 1..];
        if is_identifier(prefix) && is_dot_access(&line[..idx]) {
            return CompletionContext::Member {
                subject: extract_subject(&line[..idx]),
                prefix: prefix.to_string(),
            };
        }
    }

    if let Some(idx) = line.rfind("::") {
        let prefix = &line[idx + 2..];
        let bare = prefix.strip_prefix('$').unwrap_or(prefix);
        if is_identifier(bare) {
            return CompletionContext::Static {
                class: extract_subject(&line[..idx]),
                prefix: prefix.to_string(),
            };
        }
    }

    if let Some(idx) = line.rfind('$') {
        let prefix = &line[idx + 1..];
        if is_identifier(prefix) {
            return CompletionContext::Variable {
                prefix: prefix.to_string(),
            };
        }
    }

    // The word being typed may contain `\` when it is a qualified name.
    let (before, typing) = if line.ends_with(char::is_whitespace) {
        (line, "")
    } else {
        let word_start = line
            .char_indices()
            .rev()
            .find(|(_, c)| !is_identifier_char(*c) && *c != '\\')
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        line.split_at(word_start)
    };
    let last_word = before
        .trim_end()
        .rsplit(|c: char| c.is_whitespace() || c == '(' || c == '=' || c == ',')
        .next()
        .unwrap_or("");
    if last_word.eq_ignore_ascii_case("new") {
        return CompletionContext::New {
            prefix: typing.to_string(),
        };
    }

    match typing.chars().next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '\\' => CompletionContext::Keyword {
            prefix: typing.to_string(),
        },
        _ => CompletionContext::Default,
    }
}

fn is_identifier(text: &str) -> bool {
    text.chars().all(is_identifier_char)
}

/// `.` is member access only after a name or a call, never in a number.
fn is_dot_access(before: &str) -> bool {
    let subject = extract_subject(before);
    match subject.chars().last() {
        Some(')' | ']') => true,
        Some(c) if is_identifier_char(c) => !subject.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// The expression text ending at the end of `before`.
///
/// Walks backwards over identifiers, `$`, `\`, `->`, `?->`, `::` and
/// balanced `(...)`/`[...]` groups, so `$a->b($x)->c` yields the whole
/// chain and `foo($user` yields `$user`.
pub fn extract_subject(before: &str) -> String {
    let chars: Vec<char> = before.trim_end().chars().collect();
    let mut i = chars.len();
    while i > 0 {
        let c = chars[i - 1];
        if is_identifier_char(c) || c == '$' || c == '\\' {
            i -= 1;
        } else if c == ')' || c == ']' {
            let open = if c == ')' { '(' } else { '[' };
            let mut depth = 0usize;
            let mut j = i;
            let mut matched = false;
            while j > 0 {
                let ch = chars[j - 1];
                if ch == c {
                    depth += 1;
                } else if ch == open {
                    depth -= 1;
                    if depth == 0 {
                        matched = true;
                        j -= 1;
                        break;
                    }
                }
                j -= 1;
            }
            if !matched {
                break;
            }
            i = j;
        } else if c == '>' && i >= 2 && chars[i - 2] == '-' {
            i -= 2;
            if i > 0 && chars[i - 1] == '?' {
                i -= 1;
            }
        } else if c == ':' && i >= 2 && chars[i - 2] == ':' {
            i -= 2;
        } else if c == '.' && i >= 2 && is_identifier_char(chars[i - 2]) {
            i -= 1;
        } else {
            break;
        }
    }
    chars[i..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(subject: &str, prefix: &str) -> CompletionContext {
        CompletionContext::Member {
            subject: subject.to_string(),
            prefix: prefix.to_string(),
        }
    }

    #[test]
    fn arrow_wins_when_followed_by_identifier() {
        assert_eq!(classify("  $user->na"), member("$user", "na"));
        assert_eq!(classify("$user->"), member("$user", ""));
        assert_eq!(classify("$user?->get"), member("$user", "get"));
    }

    #[test]
    fn chains_keep_the_whole_receiver() {
        assert_eq!(
            classify("$a->b($x, [1])->c"),
            member("$a->b($x, [1])", "c")
        );
        assert_eq!(classify("echo Foo::make()->"), member("Foo::make()", ""));
    }

    #[test]
    fn argument_after_arrow_is_a_variable_context() {
        assert_eq!(
            classify("$a->b($c"),
            CompletionContext::Variable {
                prefix: "c".to_string()
            }
        );
    }

    #[test]
    fn dot_is_member_access_but_not_in_numbers() {
        assert_eq!(classify("obj.na"), member("obj", "na"));
        assert_eq!(classify("$x = 1."), CompletionContext::Default);
    }

    #[test]
    fn double_colon_is_static() {
        assert_eq!(
            classify("Config::ma"),
            CompletionContext::Static {
                class: "Config".to_string(),
                prefix: "ma".to_string()
            }
        );
        assert_eq!(
            classify("self::$ca"),
            CompletionContext::Static {
                class: "self".to_string(),
                prefix: "$ca".to_string()
            }
        );
    }

    #[test]
    fn new_keyword_selects_class_names() {
        assert_eq!(
            classify("$m = new Mai"),
            CompletionContext::New {
                prefix: "Mai".to_string()
            }
        );
        assert_eq!(
            classify("return new "),
            CompletionContext::New {
                prefix: String::new()
            }
        );
    }

    #[test]
    fn bare_words_and_defaults() {
        assert_eq!(
            classify("    fore"),
            CompletionContext::Keyword {
                prefix: "fore".to_string()
            }
        );
        assert_eq!(classify("foo(1, "), CompletionContext::Default);
        assert_eq!(classify("   "), CompletionContext::Default);
    }

    #[test]
    fn subject_stops_at_operators_and_unbalanced_groups() {
        assert_eq!(extract_subject("foo($user"), "$user");
        assert_eq!(extract_subject("$x = $this->repo"), "$this->repo");
        assert_eq!(extract_subject("if (App\\Models\\User"), "App\\Models\\User");
    }
}
