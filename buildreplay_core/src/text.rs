//! Episode text parsing.
//!
//! Recorded actions and valid placements usually arrive as Python/numpy
//! reprs (`array([[...]], dtype=int64)`, lists of tuples). Decoration is
//! stripped, the remaining text must be a pure numeric nested-array literal,
//! and that literal is read into a `serde_json::Value` tree so text and JSON
//! input share one validation path in [`crate::catalog`].
//!
//! Nothing here evaluates code: anything outside `[0-9 [ ] , . -]` and
//! whitespace after normalisation is rejected.

use crate::catalog::{ActionMatrix, PlacementCatalog};
use crate::error::EpisodeError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const ACTIONS: &str = "recorded_actions";
const VALID: &str = "valid";

/// Deepest list nesting accepted; episode data nests at most four levels.
const MAX_NESTING: usize = 16;

fn pattern(cell: &'static OnceLock<Regex>, re: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(re).expect("static pattern compiles"))
}

/// Removes numpy decoration from a recorded-actions repr.
///
/// `array(` constructors lose their name, `dtype=` annotations are dropped,
/// and parentheses around a bracketed literal are unwrapped.
pub fn strip_array_wrappers(text: &str) -> String {
    static CTOR: OnceLock<Regex> = OnceLock::new();
    static DTYPE: OnceLock<Regex> = OnceLock::new();
    static PAREN_LIST: OnceLock<Regex> = OnceLock::new();

    let text = text.trim();
    let text = pattern(&CTOR, r"\barray\s*\(").replace_all(text, "(");
    let text = pattern(&DTYPE, r",\s*dtype\s*=\s*[^)]+").replace_all(&text, "");
    let text = pattern(&PAREN_LIST, r"\(\s*(\[[^\]]*\])\s*\)").replace_all(&text, "$1");

    let trimmed = text.trim();
    if trimmed.starts_with('(') && trimmed.ends_with(')') {
        let inner = trimmed[1..trimmed.len() - 1].trim();
        if inner.starts_with('[') && inner.ends_with(']') {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

/// Rewrites Python tuple notation in a valid-placement repr to arrays.
///
/// `(x, y, z)` becomes `[x,y,z]` and `([x,y,z], n)` becomes `[[x,y,z],n]`.
pub fn normalize_tuples(text: &str) -> String {
    static COORD: OnceLock<Regex> = OnceLock::new();
    static PAIR: OnceLock<Regex> = OnceLock::new();

    let text = text.trim();
    let coord = pattern(&COORD, r"\(\s*(-?\d+)\s*,\s*(-?\d+)\s*,\s*(-?\d+)\s*\)");
    let pair = pattern(&PAIR, r"\(\s*(\[[^\]]+\])\s*,\s*(-?\d+(?:\.\d+)?)\s*\)");
    let text = coord.replace_all(text, "[$1,$2,$3]");
    let text = pair.replace_all(&text, "[$1,$2]");
    text.into_owned()
}

fn check_numeric_charset(source_name: &'static str, text: &str) -> Result<(), EpisodeError> {
    let allowed = |c: char| c.is_ascii_digit() || c.is_whitespace() || "[],.-".contains(c);
    match text.chars().find(|&c| !allowed(c)) {
        Some(found) => Err(EpisodeError::InvalidCharacters { source_name, found }),
        None => Ok(()),
    }
}

/// Parses recorded-actions text into a validated action matrix.
pub fn parse_actions_text(text: &str) -> Result<ActionMatrix, EpisodeError> {
    let text = strip_array_wrappers(text);
    check_numeric_charset(ACTIONS, &text)?;
    let value = parse_literal(ACTIONS, &text)?;
    ActionMatrix::from_value(&value)
}

/// Parses valid-placement text into a validated catalog.
pub fn parse_catalog_text(text: &str) -> Result<PlacementCatalog, EpisodeError> {
    let text = normalize_tuples(text);
    check_numeric_charset(VALID, &text)?;
    let value = parse_literal(VALID, &text)?;
    PlacementCatalog::from_value(&value)
}

/// Reads a nested numeric array literal.
///
/// Grammar: `list := '[' (item (',' item)* ','?)? ']'`, `item := list | number`,
/// numbers as `-12`, `3`, `1.5`, `.5`, `2.`. Trailing commas are allowed.
pub fn parse_literal(source_name: &'static str, text: &str) -> Result<Value, EpisodeError> {
    let mut parser = LiteralParser {
        src: text.as_bytes(),
        pos: 0,
        depth: 0,
        source_name,
    };
    parser.skip_ws();
    let value = parser.item()?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct LiteralParser<'src> {
    src: &'src [u8],
    pos: usize,
    depth: usize,
    source_name: &'static str,
}

impl<'src> LiteralParser<'src> {
    fn error(&self, message: impl Into<String>) -> EpisodeError {
        EpisodeError::Syntax {
            source_name: self.source_name,
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn item(&mut self) -> Result<Value, EpisodeError> {
        match self.peek() {
            Some(b'[') => {
                if self.depth == MAX_NESTING {
                    return Err(self.error("nesting too deep"));
                }
                self.depth += 1;
                let list = self.list();
                self.depth -= 1;
                list
            }
            Some(b'-' | b'.' | b'0'..=b'9') => self.number(),
            Some(_) => Err(self.error("expected '[' or a number")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn list(&mut self) -> Result<Value, EpisodeError> {
        self.pos += 1; // '['
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.item()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                Some(_) => return Err(self.error("expected ',' or ']'")),
                None => return Err(self.error("unterminated list")),
            }
        }
    }

    fn number(&mut self) -> Result<Value, EpisodeError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let int_start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let int_digits = self.pos - int_start;

        let mut frac_digits = 0;
        let has_dot = self.peek() == Some(b'.');
        if has_dot {
            self.pos += 1;
            let frac_start = self.pos;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
            frac_digits = self.pos - frac_start;
        }

        if int_digits == 0 && frac_digits == 0 {
            self.pos = start;
            return Err(self.error("malformed number"));
        }

        // Slice is ASCII by construction.
        let literal = std::str::from_utf8(&self.src[start..self.pos])
            .map_err(|e| self.error(e.to_string()))?;
        if !has_dot {
            if let Ok(n) = literal.parse::<i64>() {
                return Ok(Value::from(n));
            }
        }
        let n: f64 = literal
            .trim_end_matches('.')
            .parse()
            .map_err(|_| self.error(format!("malformed number {:?}", literal)))?;
        Ok(Value::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CellCoord;
    use crate::discipline::Discipline;
    use serde_json::json;

    #[test]
    fn test_strip_numpy_repr() {
        let text = concat!(
            "array([[0, 1, 2, 3, 4, 5, 6, 7],\n",
            "       [1, 1, 1, 1, 1, 1, 1, 1]], dtype=int64)"
        );
        assert_eq!(
            strip_array_wrappers(text),
            "[[0, 1, 2, 3, 4, 5, 6, 7],\n       [1, 1, 1, 1, 1, 1, 1, 1]]"
        );
    }

    #[test]
    fn test_parse_numpy_actions() {
        let text = concat!(
            "array([[0, 1, 2, 3, 4, 5, 6, 7],\n",
            "       [1, 1, 1, 1, 1, 1, 1, 1]], dtype=int64)"
        );
        let actions = parse_actions_text(text).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions.row(0).unwrap().get(Discipline::Insulation), 7);
    }

    #[test]
    fn test_parse_plain_actions_with_trailing_comma() {
        let actions = parse_actions_text("[[0,0,0,0,0,0,0,0,],]").unwrap();
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_actions_reject_foreign_characters() {
        let err = parse_actions_text("[[0,0,0,0,0,0,0,alert(1)]]").unwrap_err();
        assert!(matches!(err, EpisodeError::InvalidCharacters { found: 'a', .. }));
    }

    #[test]
    fn test_actions_reject_short_row_text() {
        let err = parse_actions_text("[[0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0]]").unwrap_err();
        assert!(matches!(err, EpisodeError::RowLength { row: 1, found: 7, .. }));
    }

    #[test]
    fn test_literal_numbers() {
        assert_eq!(parse_literal("t", "[-3, 1.5, .5, 2.]").unwrap(), json!([-3, 1.5, 0.5, 2.0]));
        assert!(parse_literal("t", "[1,,2]").is_err());
        assert!(parse_literal("t", "[1 2]").is_err());
        assert!(parse_literal("t", "[1,2").is_err());
        assert!(parse_literal("t", "[-]").is_err());
        assert!(parse_literal("t", "[1] [2]").is_err());
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let deep = format!("{}0{}", "[".repeat(5000), "]".repeat(5000));
        assert!(matches!(
            parse_actions_text(&deep),
            Err(EpisodeError::Syntax { ref message, .. }) if message == "nesting too deep"
        ));
        assert!(parse_catalog_text(&deep).is_err());

        let nested = format!("{}0{}", "[".repeat(MAX_NESTING), "]".repeat(MAX_NESTING));
        assert!(parse_literal("t", &nested).is_ok());
    }

    #[test]
    fn test_normalize_python_tuples() {
        let text = "[[((1, 2, 3), 4), (5, 6, 7)], [], [], [], [], [], [], []]";
        assert_eq!(
            normalize_tuples(text),
            "[[[[1,2,3],4], [5,6,7]], [], [], [], [], [], [], []]"
        );
    }

    #[test]
    fn test_parse_catalog_text() {
        let text = "[[((1, 2, 3), 4), (5, 6, 7)], [], [], [], [], [], [], [(0, 0, -1)]]";
        let catalog = parse_catalog_text(text).unwrap();
        let piling = catalog.discipline(Discipline::Piling);
        assert_eq!(piling.len(), 2);
        assert_eq!(piling.requirement_at(CellCoord::new(1, 2, 3)), Some(4));
        assert_eq!(piling.requirement_at(CellCoord::new(5, 6, 7)), None);
        assert_eq!(
            catalog.discipline(Discipline::Insulation).entry(0).unwrap().coord,
            CellCoord::new(0, 0, -1)
        );
    }

    #[test]
    fn test_catalog_text_wrong_discipline_count() {
        let err = parse_catalog_text("[[], [], []]").unwrap_err();
        assert!(matches!(err, EpisodeError::DisciplineCount { found: 3, .. }));
    }

    #[test]
    fn test_catalog_text_rejects_code() {
        let err = parse_catalog_text("[[], [], [], [], [], [], [], [None]]").unwrap_err();
        assert!(matches!(err, EpisodeError::InvalidCharacters { found: 'N', .. }));
    }
}
