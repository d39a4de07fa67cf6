use std::ops::Range;

use sqlparser::{
    dialect::MySqlDialect,
    tokenizer::{Location, Token, TokenWithSpan, Tokenizer},
};

/// A significant token of the statement with its byte range
#[derive(Debug, Clone, PartialEq)]
struct Spanned {
    token: Token,
    span: Range<usize>,
}

/// Finds clause boundaries in SQL text over the sqlparser token stream.
///
/// Whitespace and comments are dropped, so keywords only match as whole
/// words outside of quoted literals. Text that fails to tokenize is scanned
/// up to the failing position.
#[derive(Debug, Clone)]
pub struct SqlScanner<'a> {
    sql: &'a str,
    tokens: Vec<Spanned>,
}

impl<'a> SqlScanner<'a> {
    pub fn new(sql: &'a str) -> Self {
        Self {
            sql,
            tokens: tokenize(sql),
        }
    }

    fn text(&self, token: &Spanned) -> &'a str {
        self.sql.get(token.span.clone()).unwrap_or_default()
    }

    fn is_keyword(token: &Spanned, keyword: &str) -> bool {
        match &token.token {
            Token::Word(w) => w.quote_style.is_none() && w.value.eq_ignore_ascii_case(keyword),
            _ => false,
        }
    }

    /// Counts the occurrences of the keyword
    pub fn count_keyword(&self, keyword: &str) -> usize {
        self.tokens
            .iter()
            .filter(|t| Self::is_keyword(t, keyword))
            .count()
    }

    /// Byte offset of the first occurrence of the keyword
    pub fn find_keyword(&self, keyword: &str) -> Option<usize> {
        self.tokens
            .iter()
            .find(|t| Self::is_keyword(t, keyword))
            .map(|t| t.span.start)
    }

    /// Byte offset of the first occurrence of `first second`, eg `GROUP BY`
    pub fn find_keyword_pair(&self, first: &str, second: &str) -> Option<usize> {
        self.tokens.windows(2).find_map(|w| {
            (Self::is_keyword(&w[0], first) && Self::is_keyword(&w[1], second))
                .then(|| w[0].span.start)
        })
    }

    /// Finds the first `keyword <integer>`, returning the range covering the
    /// whole phrase and the integer
    pub fn find_keyword_number(&self, keyword: &str) -> Option<(Range<usize>, u64)> {
        self.tokens.windows(2).find_map(|w| {
            if !Self::is_keyword(&w[0], keyword) {
                return None;
            }

            match &w[1].token {
                Token::Number(n, _) => {
                    let n = n.parse::<u64>().ok()?;
                    Some((w[0].span.start..w[1].span.end, n))
                }
                _ => None,
            }
        })
    }

    /// Byte offsets of the first '(' and the last ')' outside of literals
    pub fn outer_parens(&self) -> Option<(usize, usize)> {
        let open = self.tokens.iter().find(|t| t.token == Token::LParen)?;
        let close = self.tokens.iter().rev().find(|t| t.token == Token::RParen)?;

        (open.span.start < close.span.start).then(|| (open.span.start, close.span.start))
    }

    /// The first significant character of the statement, skipping
    /// whitespace, comments and a `query=` prefix
    pub fn first_significant_char(&self) -> Option<char> {
        let mut tokens = self.tokens.as_slice();

        if let [first, Spanned { token: Token::Eq, .. }, rest @ ..] = tokens {
            if Self::is_keyword(first, "query") {
                tokens = rest;
            }
        }

        tokens
            .first()
            .and_then(|t| self.text(t).chars().next())
    }

    /// Counts the `?` placeholders outside of literals
    pub fn count_placeholders(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| matches!(&t.token, Token::Placeholder(p) if p == "?"))
            .count()
    }

    /// The identifier following the first occurrence of the keyword, unquoted
    pub fn word_after(&self, keyword: &str) -> Option<&'a str> {
        let pos = self
            .tokens
            .iter()
            .position(|t| Self::is_keyword(t, keyword))?;
        let next = self.tokens.get(pos + 1)?;

        match &next.token {
            Token::Word(w) if w.quote_style == Some('`') => {
                let text = self.text(next);
                text.strip_prefix('`')
                    .and_then(|t| t.strip_suffix('`'))
                    .or(Some(text))
            }
            Token::Word(_) | Token::DoubleQuotedString(_) => Some(self.text(next)),
            _ => None,
        }
    }
}

fn tokenize(sql: &str) -> Vec<Spanned> {
    let mut buf = vec![];
    // on error the buffer holds the tokens preceding the failure
    let _ = Tokenizer::new(&MySqlDialect {}, sql).tokenize_with_location_into_buf(&mut buf);

    let lines = LineIndex::new(sql);

    buf.into_iter()
        .filter(|t| !matches!(t.token, Token::Whitespace(_) | Token::EOF))
        .map(|TokenWithSpan { token, span }| Spanned {
            token,
            span: lines.offset(span.start)..lines.offset(span.end),
        })
        .collect()
}

/// Maps tokenizer locations (1-based line and char column) to byte offsets
struct LineIndex<'a> {
    sql: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(sql: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(sql.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self { sql, starts }
    }

    fn offset(&self, loc: Location) -> usize {
        let line = (loc.line as usize).saturating_sub(1);
        let col = (loc.column as usize).saturating_sub(1);

        let start = match self.starts.get(line) {
            Some(start) => *start,
            None => return self.sql.len(),
        };

        self.sql[start..]
            .char_indices()
            .nth(col)
            .map(|(i, _)| start + i)
            .unwrap_or(self.sql.len())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_scanner_count_keyword_word_bounded() {
        let scanner = SqlScanner::new("SELECT selected FROM (select * from t) WHERE x = 'select'");

        assert_eq!(scanner.count_keyword("select"), 2);
    }

    #[test]
    fn test_scanner_find_keyword_skips_literals() {
        let sql = "SELECT * FROM t WHERE name = 'where' AND somewhere = 1";
        let scanner = SqlScanner::new(sql);

        assert_eq!(scanner.find_keyword("where"), Some(16));
        assert_eq!(&sql[16..21], "WHERE");
    }

    #[test]
    fn test_scanner_find_keyword_skips_comments() {
        let sql = "SELECT * FROM t /* where */ WHERE a = 1";
        let scanner = SqlScanner::new(sql);

        assert_eq!(scanner.find_keyword("where"), Some(28));
    }

    #[test]
    fn test_scanner_find_keyword_number() {
        let sql = "SELECT * FROM t WHERE id = 5 LIMIT 10 OFFSET 3";
        let scanner = SqlScanner::new(sql);

        let (range, n) = scanner.find_keyword_number("limit").unwrap();
        assert_eq!(&sql[range], "LIMIT 10");
        assert_eq!(n, 10);

        let (range, n) = scanner.find_keyword_number("offset").unwrap();
        assert_eq!(&sql[range], "OFFSET 3");
        assert_eq!(n, 3);
    }

    #[test]
    fn test_scanner_find_keyword_number_multiline() {
        let sql = "SELECT *\nFROM t\nLIMIT\n  20";
        let scanner = SqlScanner::new(sql);

        let (range, n) = scanner.find_keyword_number("limit").unwrap();
        assert_eq!(&sql[range], "LIMIT\n  20");
        assert_eq!(n, 20);
    }

    #[test]
    fn test_scanner_find_keyword_number_requires_integer() {
        let scanner = SqlScanner::new("SELECT * FROM t LIMIT ?");

        assert_eq!(scanner.find_keyword_number("limit"), None);
    }

    #[test]
    fn test_scanner_find_keyword_pair() {
        let sql = "WHERE a = 1 GROUP  BY b";
        let scanner = SqlScanner::new(sql);

        assert_eq!(scanner.find_keyword_pair("group", "by"), Some(12));
        assert_eq!(SqlScanner::new("WHERE grp = 1").find_keyword_pair("group", "by"), None);
    }

    #[test]
    fn test_scanner_outer_parens() {
        let sql = "SELECT * FROM (SELECT a FROM t WHERE b = ')') x";
        let scanner = SqlScanner::new(sql);

        assert_eq!(scanner.outer_parens(), Some((14, 44)));
        assert_eq!(SqlScanner::new("SELECT 1").outer_parens(), None);
    }

    #[test]
    fn test_scanner_first_significant_char() {
        assert_eq!(SqlScanner::new("  select 1").first_significant_char(), Some('s'));
        assert_eq!(
            SqlScanner::new("/* hint */ -- c\n# other\n INSERT INTO t").first_significant_char(),
            Some('I')
        );
        assert_eq!(
            SqlScanner::new("query=DELETE FROM t").first_significant_char(),
            Some('D')
        );
        assert_eq!(SqlScanner::new("   ").first_significant_char(), None);
        assert_eq!(SqlScanner::new("").first_significant_char(), None);
    }

    #[test]
    fn test_scanner_first_significant_char_non_ascii() {
        assert_eq!(
            SqlScanner::new("中éé FROM t").first_significant_char(),
            Some('中')
        );
        assert_eq!(
            SqlScanner::new("éé中 select").first_significant_char(),
            Some('é')
        );
        assert_eq!(
            SqlScanner::new("/* 注释 */ select 1").first_significant_char(),
            Some('s')
        );
    }

    #[test]
    fn test_scanner_unterminated_literal() {
        let sql = "SELECT * FROM t WHERE a = 'open";
        let scanner = SqlScanner::new(sql);

        assert_eq!(scanner.first_significant_char(), Some('S'));
        assert_eq!(scanner.find_keyword("where"), Some(16));
    }

    #[test]
    fn test_scanner_word_after() {
        let scanner = SqlScanner::new("select a from `docs` where b = 1");

        assert_eq!(scanner.word_after("FROM"), Some("docs"));
        assert_eq!(scanner.word_after("where"), Some("b"));
        assert_eq!(scanner.word_after("limit"), None);
        assert_eq!(SqlScanner::new("SELECT * FROM (SELECT 1)").word_after("from"), None);
    }

    #[test]
    fn test_scanner_count_placeholders() {
        let scanner = SqlScanner::new("SELECT * FROM t WHERE a = ? AND b = '?' AND c IN (?, ?)");

        assert_eq!(scanner.count_placeholders(), 3);
    }

    #[test]
    fn test_scanner_multibyte() {
        let sql = "SELECT * FROM t WHERE 名称 = '中文' LIMIT 5";
        let scanner = SqlScanner::new(sql);

        let (range, n) = scanner.find_keyword_number("limit").unwrap();
        assert_eq!(&sql[range], "LIMIT 5");
        assert_eq!(n, 5);
    }
}
