//! Lexical helpers over SQL text.
//!
//! Nothing here parses SQL. These functions scan text for a few well-known
//! shapes (code fences, `FROM`/`JOIN` targets, `column = value`, bare
//! identifiers). Comments and literals are masked out first so that text
//! inside them is ignored. Masking follows Postgres lexing but is still
//! best-effort, so checks that reject use the raw text as well.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

static TABLE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:from|join)\b").expect("valid table keyword regex"));

/// Language tags that text generators put after an opening code fence.
const FENCE_LANGUAGE_TAGS: &[&str] = &[
    "sql", "tsql", "t-sql", "mssql", "sqlserver", "postgres", "postgresql", "psql", "pgsql",
    "mysql", "sqlite", "plsql",
];

/// Strip surrounding markdown code fences and a language tag.
///
/// When the text contains a fenced block, the content of the first block is
/// returned. Otherwise the trimmed input is returned unchanged.
pub fn strip_code_fences(raw: &str) -> String {
    let text = raw.trim();
    let Some(open) = text.find("```") else {
        return text.to_string();
    };

    let after_open = text[open..].trim_start_matches('`');
    let body = match after_open.find("```") {
        Some(close) => &after_open[..close],
        None => after_open,
    };

    strip_language_tag(body).trim().to_string()
}

fn strip_language_tag(body: &str) -> &str {
    // Tag on its own line: "```sql\nSELECT ..."
    if let Some((first_line, rest)) = body.split_once('\n') {
        let tag = first_line.trim();
        if !tag.is_empty()
            && !tag.eq_ignore_ascii_case("select")
            && tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        {
            return rest;
        }
        if tag.is_empty() {
            return rest;
        }
    }

    // Tag on the same line: "```sql SELECT ..."
    let trimmed = body.trim_start();
    let word_end = trimmed
        .find(|c: char| c.is_whitespace())
        .unwrap_or(trimmed.len());
    let word = &trimmed[..word_end];
    if word_end < trimmed.len()
        && FENCE_LANGUAGE_TAGS
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(word))
    {
        return &trimmed[word_end..];
    }
    body
}

/// Replace comment bodies and string literals with spaces.
///
/// Recognized, in Postgres lexing order:
/// - `-- line` and `/* block */` comments
/// - `'...'` literals with doubled-quote escapes
/// - `E'...'` literals with backslash escapes
/// - `$$...$$` and `$tag$...$tag$` dollar-quoted strings
/// - `"..."` and `[...]` identifiers
///
/// A quoted identifier that is a plain name (`"family_dr_id"`) is kept, since
/// it names a real column or table. Any other quoted identifier has its
/// interior blanked, so an alias such as `"family_dr_id = 5"` cannot pose as
/// a filter. Unterminated constructs are masked to the end of the text.
pub fn mask_comments_and_literals(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let prev_is_ident = i > 0 && is_identifier_char(chars[i - 1]);

        match c {
            '-' if next == Some('-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&c| c == '\n')
                    .map_or(chars.len(), |offset| i + offset);
                blank(&mut out, &chars[i..end]);
                i = end;
            }
            '/' if next == Some('*') => {
                let end = find_pair(&chars, i + 2, '*', '/').map_or(chars.len(), |pos| pos + 2);
                blank(&mut out, &chars[i..end]);
                i = end;
            }
            '\'' => {
                let end = string_end(&chars, i + 1, false);
                blank(&mut out, &chars[i..end]);
                i = end;
            }
            'e' | 'E' if next == Some('\'') && !prev_is_ident => {
                let end = string_end(&chars, i + 2, true);
                blank(&mut out, &chars[i..end]);
                i = end;
            }
            '$' if !prev_is_ident => match dollar_tag(&chars, i) {
                Some(tag_len) => {
                    let tag = &chars[i..i + tag_len];
                    let body = i + tag_len;
                    let end = (body..chars.len())
                        .find(|&pos| chars[pos..].starts_with(tag))
                        .map_or(chars.len(), |pos| pos + tag_len);
                    blank(&mut out, &chars[i..end]);
                    i = end;
                }
                None => {
                    out.push(c);
                    i += 1;
                }
            },
            '"' | '[' => {
                let close = if c == '"' { '"' } else { ']' };
                match chars[i + 1..].iter().position(|&ch| ch == close) {
                    Some(offset) => {
                        let inner = &chars[i + 1..i + 1 + offset];
                        out.push(c);
                        if !inner.is_empty() && inner.iter().all(|&ch| is_identifier_char(ch)) {
                            out.extend(inner);
                        } else {
                            blank(&mut out, inner);
                        }
                        out.push(close);
                        i += offset + 2;
                    }
                    None if c == '"' => {
                        blank(&mut out, &chars[i..]);
                        i = chars.len();
                    }
                    None => {
                        out.push(c);
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Push one space per char, keeping line breaks.
fn blank(out: &mut String, chars: &[char]) {
    out.extend(chars.iter().map(|&c| if c == '\n' { '\n' } else { ' ' }));
}

/// Index of `first` immediately followed by `second`, searching from `from`.
fn find_pair(chars: &[char], from: usize, first: char, second: char) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&pos| chars[pos] == first && chars[pos + 1] == second)
}

/// Position just past the quote closing a literal whose body starts at `from`.
fn string_end(chars: &[char], from: usize, backslash_escapes: bool) -> usize {
    let mut pos = from;
    while pos < chars.len() {
        match chars[pos] {
            '\\' if backslash_escapes => pos += 2,
            '\'' if chars.get(pos + 1) == Some(&'\'') => pos += 2,
            '\'' => return pos + 1,
            _ => pos += 1,
        }
    }
    chars.len()
}

/// Length of a `$$` or `$tag$` opener at `start`, if there is one.
fn dollar_tag(chars: &[char], start: usize) -> Option<usize> {
    let mut pos = start + 1;
    if chars.get(pos).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    while let Some(&c) = chars.get(pos) {
        if c == '$' {
            return Some(pos - start + 1);
        }
        if !(c.is_alphanumeric() || c == '_') {
            return None;
        }
        pos += 1;
    }
    None
}

/// A table named after `FROM` or `JOIN`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Schema qualifier, lower-cased. `None` for unqualified references.
    pub schema: Option<String>,
    /// Table name, lower-cased.
    pub name: String,
}

impl TableRef {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(|s| s.to_ascii_lowercase()),
            name: name.to_ascii_lowercase(),
        }
    }

    /// Whether this reference names `target`. An unqualified reference
    /// matches any schema, so `FROM patients` is treated like `FROM dbo.patients`.
    pub fn refers_to(&self, target: &TableRef) -> bool {
        if self.name != target.name {
            return false;
        }
        match (&self.schema, &target.schema) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Collect the de-duplicated set of tables referenced after `FROM`/`JOIN`.
///
/// Tolerates arbitrary whitespace between the keyword and the name, bracket or
/// double-quote identifier quoting, the `ONLY`/`LATERAL` modifiers and
/// comma-separated `FROM a, b` lists. Subqueries are covered because every
/// `FROM`/`JOIN` keyword is visited. References inside comments and literals
/// are ignored.
pub fn extract_tables(sql: &str) -> BTreeSet<TableRef> {
    collect_tables(&mask_comments_and_literals(sql))
}

/// Like [`extract_tables`], but over the raw text: names inside comments and
/// literals count too. Gates use this alongside the masked scan so that a
/// quoting trick the masker misreads can only add references, never hide one.
pub fn extract_tables_unmasked(sql: &str) -> BTreeSet<TableRef> {
    collect_tables(sql)
}

fn collect_tables(text: &str) -> BTreeSet<TableRef> {
    let mut tables = BTreeSet::new();

    for keyword in TABLE_KEYWORD.find_iter(text) {
        let mut cursor = Cursor::new(text, keyword.end());
        loop {
            cursor.skip_table_modifiers();
            let Some(table) = cursor.qualified_name() else {
                break;
            };
            tables.insert(table);

            // Inheritance star, optional alias, then an optional comma
            // introducing the next table.
            cursor.skip_whitespace();
            cursor.eat('*');
            cursor.skip_whitespace();
            if !cursor.eat(',') {
                if let Some(word) = cursor.word() {
                    if word.eq_ignore_ascii_case("as") {
                        cursor.skip_whitespace();
                        cursor.word();
                    }
                }
                cursor.skip_whitespace();
                if !cursor.eat(',') {
                    break;
                }
            }
        }
    }

    tables
}

/// Whether `sql` contains `<column> = <value>` with the column optionally
/// table-qualified and arbitrary whitespace around `=`. Only exact equality
/// with the literal integer is recognized.
pub fn contains_equality_filter(sql: &str, column: &str, value: i64) -> bool {
    let masked = mask_comments_and_literals(sql);
    let value_text = value.to_string();

    word_positions(&masked, column).into_iter().any(|start| {
        let mut cursor = Cursor::new(&masked, start + column.len());
        // Allow a closing identifier quote: [family_dr_id] = 5, "family_dr_id" = 5
        let _ = cursor.eat(']') || cursor.eat('"');
        cursor.skip_whitespace();
        if !cursor.eat('=') {
            return false;
        }
        cursor.skip_whitespace();
        let rest = cursor.remaining();
        let Some(after) = rest.strip_prefix(value_text.as_str()) else {
            return false;
        };
        !after
            .chars()
            .next()
            .is_some_and(|c| is_identifier_char(c) || c == '.')
    })
}

/// Byte offsets of case-insensitive whole-word occurrences of `word` in `text`.
///
/// A dotted prefix (`p.first_name`) still counts as a whole-word hit.
pub fn word_positions(text: &str, word: &str) -> Vec<usize> {
    if word.is_empty() {
        return Vec::new();
    }
    let haystack = text.to_ascii_lowercase();
    let needle = word.to_ascii_lowercase();

    let mut hits = Vec::new();
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(&needle) {
        let start = from + offset;
        let end = start + needle.len();
        let before_ok = !haystack[..start]
            .chars()
            .next_back()
            .is_some_and(is_identifier_char);
        let after_ok = !haystack[end..].chars().next().is_some_and(is_identifier_char);
        if before_ok && after_ok {
            hits.push(start);
        }
        from = start + needle.len().max(1);
    }
    hits
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '@' || c == '#' || c == '$'
}

/// Minimal forward-only scanner over masked SQL text.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.remaining();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn eat(&mut self, c: char) -> bool {
        if self.remaining().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> Option<&'a str> {
        let rest = self.remaining();
        let len = rest
            .find(|c: char| !is_identifier_char(c))
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    /// Step over `ONLY`, `LATERAL` and an opening parenthesis after `ONLY`.
    fn skip_table_modifiers(&mut self) {
        loop {
            self.skip_whitespace();
            let checkpoint = self.pos;
            match self.word() {
                Some(word) if word.eq_ignore_ascii_case("only") => {
                    self.skip_whitespace();
                    self.eat('(');
                }
                Some(word) if word.eq_ignore_ascii_case("lateral") => {}
                _ => {
                    self.pos = checkpoint;
                    return;
                }
            }
        }
    }

    /// One identifier part: bare word, `[bracketed]` or `"quoted"`.
    fn identifier(&mut self) -> Option<&'a str> {
        let rest = self.remaining();
        for (open, close) in [('[', ']'), ('"', '"')] {
            if let Some(inner) = rest.strip_prefix(open) {
                let end = inner.find(close)?;
                self.pos += open.len_utf8() + end + close.len_utf8();
                return Some(&inner[..end]);
            }
        }
        self.word()
    }

    /// `name`, `schema.name` or `db.schema.name`; keeps the last two parts.
    fn qualified_name(&mut self) -> Option<TableRef> {
        self.skip_whitespace();
        let mut parts = vec![self.identifier()?];
        loop {
            let checkpoint = self.pos;
            self.skip_whitespace();
            if !self.eat('.') {
                self.pos = checkpoint;
                break;
            }
            self.skip_whitespace();
            match self.identifier() {
                Some(part) => parts.push(part),
                None => {
                    self.pos = checkpoint;
                    break;
                }
            }
        }

        let name = parts.pop()?;
        let schema = parts.pop();
        Some(TableRef::new(schema, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(sql: &str) -> Vec<String> {
        extract_tables(sql).iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn strips_sql_fence() {
        assert_eq!(
            strip_code_fences("```sql\nSELECT TOP 5 * FROM dbo.patients\n```"),
            "SELECT TOP 5 * FROM dbo.patients"
        );
    }

    #[test]
    fn strips_bare_fence_and_same_line_tag() {
        assert_eq!(strip_code_fences("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```SQL SELECT 1```"), "SELECT 1");
        assert_eq!(strip_code_fences("```SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn extracts_fenced_block_from_chatter() {
        let raw = "Here is the query:\n```tsql\nSELECT 1\n```\nHope this helps.";
        assert_eq!(strip_code_fences(raw), "SELECT 1");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  SELECT 1;\n"), "SELECT 1;");
    }

    #[test]
    fn masks_comments_and_literals() {
        let masked = mask_comments_and_literals("SELECT 'it''s' -- hi\nFROM /* x */ t");
        assert!(!masked.contains("it"));
        assert!(!masked.contains("hi"));
        assert!(!masked.contains('x'));
        assert!(masked.contains("FROM"));
        assert!(masked.ends_with(" t"));
    }

    #[test]
    fn extracts_from_and_join_tables() {
        let sql = "SELECT * FROM dbo.patients p JOIN dbo.patient_notes n ON p.id=n.patient_id";
        assert_eq!(names(sql), vec!["dbo.patient_notes", "dbo.patients"]);
    }

    #[test]
    fn extraction_tolerates_whitespace_and_quoting() {
        let sql = "select *\nfrom\n\t[dbo] . [Patients]\nleft join \"dbo\".\"visits\" v on 1=1";
        assert_eq!(names(sql), vec!["dbo.patients", "dbo.visits"]);
    }

    #[test]
    fn extraction_follows_comma_lists_and_subqueries() {
        let sql = "SELECT * FROM dbo.visits v, dbo.patients AS p \
                   WHERE v.id IN (SELECT visit_id FROM dbo.notes)";
        assert_eq!(names(sql), vec!["dbo.notes", "dbo.patients", "dbo.visits"]);
    }

    #[test]
    fn extraction_ignores_comments_and_literals() {
        let sql = "SELECT 'from dbo.secret' FROM dbo.visits -- join dbo.patients";
        assert_eq!(names(sql), vec!["dbo.visits"]);
    }

    #[test]
    fn unqualified_reference_matches_any_schema() {
        let target = TableRef::new(Some("dbo"), "patients");
        assert!(TableRef::new(None, "PATIENTS").refers_to(&target));
        assert!(!TableRef::new(Some("archive"), "patients").refers_to(&target));
    }

    #[test]
    fn equality_filter_variants() {
        assert!(contains_equality_filter("WHERE family_dr_id = 12", "family_dr_id", 12));
        assert!(contains_equality_filter("WHERE p.family_dr_id=12", "family_dr_id", 12));
        assert!(contains_equality_filter("WHERE [family_dr_id]\n=\n12", "family_dr_id", 12));
        assert!(!contains_equality_filter("WHERE family_dr_id = 13", "family_dr_id", 12));
        assert!(!contains_equality_filter("WHERE family_dr_id = 123", "family_dr_id", 12));
        assert!(!contains_equality_filter("WHERE family_dr_id <> 12", "family_dr_id", 12));
        assert!(!contains_equality_filter("WHERE x_family_dr_id = 12", "family_dr_id", 12));
        assert!(!contains_equality_filter("WHERE 12 = family_dr_id", "family_dr_id", 12));
    }

    #[test]
    fn equality_filter_in_literal_does_not_count() {
        assert!(!contains_equality_filter(
            "SELECT 'family_dr_id = 12' FROM dbo.patients",
            "family_dr_id",
            12
        ));
    }

    #[test]
    fn word_positions_respects_boundaries() {
        assert_eq!(word_positions("p.email, email_opt_in", "email"), vec![2]);
        assert!(word_positions("patient_email", "email").is_empty());
        assert_eq!(word_positions("EMAIL", "email"), vec![0]);
    }

    #[test]
    fn quote_inside_identifier_does_not_open_a_literal() {
        let masked = mask_comments_and_literals("SELECT 1 AS \"x'\", p.* FROM dbo.patients p -- '");
        assert!(masked.contains("FROM dbo.patients p"));
        let masked = mask_comments_and_literals("SELECT [x'] FROM dbo.patients -- '");
        assert!(masked.contains("FROM dbo.patients"));
    }

    #[test]
    fn plain_quoted_identifiers_are_kept() {
        let masked = mask_comments_and_literals("WHERE \"family_dr_id\" = 5 AND [pharmacy_id] = 3");
        assert_eq!(masked, "WHERE \"family_dr_id\" = 5 AND [pharmacy_id] = 3");
        let masked = mask_comments_and_literals("SELECT \"family_dr_id = 5\"");
        assert!(!masked.contains("= 5"));
    }

    #[test]
    fn masks_escape_and_dollar_strings() {
        let masked = mask_comments_and_literals(r"SELECT E'it\'s', $$a'b$$, $q$c'd$q$ FROM t");
        assert!(!masked.contains('\''));
        assert!(!masked.contains('a'));
        assert!(!masked.contains('q'));
        assert!(masked.ends_with("FROM t"));
    }

    #[test]
    fn positional_parameter_is_not_a_dollar_quote() {
        let masked = mask_comments_and_literals("WHERE id = $1 AND family_dr_id = 5");
        assert_eq!(masked, "WHERE id = $1 AND family_dr_id = 5");
    }

    #[test]
    fn extraction_skips_only_and_lateral() {
        assert_eq!(names("SELECT * FROM ONLY dbo.patients"), vec!["dbo.patients"]);
        assert_eq!(names("SELECT * FROM ONLY (dbo.patients) p"), vec!["dbo.patients"]);
        assert_eq!(
            names("SELECT * FROM dbo.patients * p, LATERAL dbo.visits v"),
            vec!["dbo.patients", "dbo.visits"]
        );
    }

    #[test]
    fn unmasked_extraction_sees_commented_tables() {
        let sql = "SELECT 1 FROM dbo.visits -- JOIN dbo.patients";
        let raw: Vec<String> = extract_tables_unmasked(sql).iter().map(|t| t.to_string()).collect();
        assert_eq!(raw, vec!["dbo.patients", "dbo.visits"]);
    }
}
