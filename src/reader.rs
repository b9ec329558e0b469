//! The notation reader: a recursive-descent parser turning notation text
//! into values. The grammar merges JSON literals (objects, arrays,
//! strings, numbers, `true`/`false`/`null`) with S-expression lists
//! (optionally dotted) and symbols, plus the `'v` quote shorthand.
//!
//! The single-value entry point [`decode`] returns the next value and the
//! position immediately after it, and signals end-of-input distinctly from
//! a syntax error so a caller can loop over consecutive top-level forms in
//! one buffer. Syntax errors carry the offending position translated into
//! a 1-based line number and a column offset from the last preceding
//! newline.

use crate::SyntaxError;
use crate::ast::{Value, cons, is_symbol_name, list_from_vec};
use crate::symbol::SymbolTable;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Characters that end a literal token: whitespace, the closers of the
/// surrounding structures, and the object/array separators.
fn is_literal_end(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | ')' | ']' | '}' | ':' | ',')
}

/// Internal control flow: end-of-input is distinct from a syntax error so
/// the structural parsers can translate a premature end into the precise
/// "unclosed ..." condition for the construct they were reading.
enum Interrupt {
    Eof,
    Syntax(SyntaxError),
}

type Scan<T> = Result<T, Interrupt>;

/// Decode the next value from `code` starting at byte offset `pos`.
///
/// Returns `Ok(Some((value, next_pos)))` on success, `Ok(None)` when only
/// whitespace remains, and a [`SyntaxError`] for malformed text. Symbols
/// are interned through `symbols`.
pub fn decode(
    code: &str,
    pos: usize,
    symbols: &mut SymbolTable,
) -> Result<Option<(Value, usize)>, SyntaxError> {
    let mut reader = Reader { code, pos, symbols };
    match reader.next_value() {
        Ok(value) => Ok(Some((value, reader.pos))),
        Err(Interrupt::Eof) => Ok(None),
        Err(Interrupt::Syntax(error)) => Err(error),
    }
}

/// Decode every top-level value in `code`.
pub fn decode_all(code: &str, symbols: &mut SymbolTable) -> Result<Vec<Value>, SyntaxError> {
    let mut values = Vec::new();
    let mut pos = 0;
    while let Some((value, next)) = decode(code, pos, symbols)? {
        values.push(value);
        pos = next;
    }
    Ok(values)
}

struct Reader<'a> {
    code: &'a str,
    pos: usize,
    symbols: &'a mut SymbolTable,
}

impl Reader<'_> {
    fn fail<T>(&self, message: &str) -> Scan<T> {
        self.fail_at(self.pos, message)
    }

    fn fail_at<T>(&self, pos: usize, message: &str) -> Scan<T> {
        Err(Interrupt::Syntax(SyntaxError::new(self.code, pos, message)))
    }

    /// Translate a premature end-of-input into a syntax error for the
    /// structure currently being read.
    fn closed<T>(&self, result: Scan<T>, message: &'static str) -> Scan<T> {
        match result {
            Err(Interrupt::Eof) => self.fail(message),
            other => other,
        }
    }

    /// Skip insignificant whitespace, then return the next character
    /// without consuming it. An out-of-range start offset reads as end
    /// of input.
    fn peek(&mut self) -> Scan<char> {
        let rest = self.code.get(self.pos..).unwrap_or("");
        let trimmed = rest.trim_start_matches([' ', '\t', '\r', '\n']);
        self.pos += rest.len() - trimmed.len();
        trimmed.chars().next().ok_or(Interrupt::Eof)
    }

    fn poll(&mut self) -> Scan<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Ok(ch)
    }

    fn next_value(&mut self) -> Scan<Value> {
        match self.peek()? {
            '(' => self.next_list(),
            '{' => self.next_object(),
            '[' => self.next_array(),
            '\'' => {
                self.poll()?;
                let quoted = self.next_value();
                let quoted = self.closed(quoted, "lack of quoted value")?;
                let quote = Value::Symbol(self.symbols.intern("quote"));
                Ok(cons(quote, cons(quoted, Value::Null)))
            }
            _ => self.next_literal(),
        }
    }

    fn next_list(&mut self) -> Scan<Value> {
        self.poll()?;
        let mut items = Vec::new();
        loop {
            let ch = self.peek();
            match self.closed(ch, "unclosed list")? {
                '.' => {
                    self.poll()?;
                    if items.is_empty() {
                        return self.fail("lack of dotted prefix");
                    }
                    let tail = self.next_value();
                    let tail = self.closed(tail, "surplus of dotted suffix")?;
                    let close = self.poll();
                    if self.closed(close, "surplus of dotted suffix")? != ')' {
                        return self.fail("surplus of dotted suffix");
                    }
                    return Ok(items
                        .into_iter()
                        .rev()
                        .fold(tail, |rest, item| cons(item, rest)));
                }
                ')' => {
                    self.poll()?;
                    return Ok(list_from_vec(items));
                }
                _ => {
                    let item = self.next_value();
                    items.push(self.closed(item, "unclosed list")?);
                }
            }
        }
    }

    fn next_object(&mut self) -> Scan<Value> {
        self.poll()?;
        let mut entries = BTreeMap::new();
        let ch = self.peek();
        if self.closed(ch, "unclosed object")? == '}' {
            self.poll()?;
            return Ok(Value::Object(Rc::new(entries)));
        }
        loop {
            let key = self.next_string();
            let key = self.closed(key, "unclosed object")?;
            let sep = self.poll();
            if self.closed(sep, "unclosed object")? != ':' {
                return self.fail("lack of colon");
            }
            let value = self.next_value();
            let value = self.closed(value, "unclosed object")?;
            // Duplicate keys: the last occurrence wins
            entries.insert(key, value);
            let next = self.poll();
            match self.closed(next, "unclosed object")? {
                '}' => return Ok(Value::Object(Rc::new(entries))),
                ',' => {}
                _ => return self.fail("lack of comma"),
            }
        }
    }

    fn next_array(&mut self) -> Scan<Value> {
        self.poll()?;
        let mut items = Vec::new();
        let ch = self.peek();
        if self.closed(ch, "unclosed array")? == ']' {
            self.poll()?;
            return Ok(Value::Array(Rc::new(items)));
        }
        loop {
            let item = self.next_value();
            items.push(self.closed(item, "unclosed array")?);
            let next = self.poll();
            match self.closed(next, "unclosed array")? {
                ']' => return Ok(Value::Array(Rc::new(items))),
                ',' => {}
                _ => return self.fail("lack of comma"),
            }
        }
    }

    fn next_literal(&mut self) -> Scan<Value> {
        if self.peek()? == '"' {
            return self.next_string().map(Value::Str);
        }
        let start = self.pos;
        let end = self.code[start..]
            .find(is_literal_end)
            .map_or(self.code.len(), |offset| start + offset);
        let token = &self.code[start..end];
        self.pos = end;
        match token {
            "null" => return Ok(Value::Null),
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            _ => {}
        }
        if is_symbol_name(token) {
            return Ok(Value::Symbol(self.symbols.intern(token)));
        }
        match classify_number(token) {
            Some(NumberToken::Int) => match token.parse::<i64>() {
                Ok(n) => Ok(Value::Int(n)),
                Err(_) => self.fail_at(start, "integer literal out of range"),
            },
            Some(NumberToken::Float) => match token.parse::<f64>() {
                Ok(x) => Ok(Value::Float(x)),
                Err(_) => self.fail("unknown literal"),
            },
            None => self.fail("unknown literal"),
        }
    }

    /// Read a double-quoted string with JSON-style escapes. The token must
    /// be followed by a literal terminator, matching the original grammar.
    fn next_string(&mut self) -> Scan<String> {
        if self.peek()? != '"' {
            return self.fail("invalid string notation");
        }
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let mut chars = self.code[self.pos..].chars();
            match chars.next() {
                None => return self.fail_at(start, "unterminated string"),
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    let escape_pos = self.pos;
                    self.pos += 1;
                    let Some(escape) = self.code[self.pos..].chars().next() else {
                        return self.fail_at(start, "unterminated string");
                    };
                    self.pos += escape.len_utf8();
                    match escape {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        '/' => out.push('/'),
                        'b' => out.push('\u{0008}'),
                        'f' => out.push('\u{000C}'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => out.push(self.unicode_escape(escape_pos)?),
                        _ => return self.fail_at(escape_pos, "invalid string escape"),
                    }
                }
                Some(ch) => {
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        match self.code[self.pos..].chars().next() {
            Some(ch) if !is_literal_end(ch) => self.fail("unknown literal"),
            _ => Ok(out),
        }
    }

    /// Decode the remainder of a `\uXXXX` escape (the `\u` is consumed).
    /// Surrogate pairs are combined; lone surrogates are rejected.
    fn unicode_escape(&mut self, escape_pos: usize) -> Scan<char> {
        let unit = self.hex_unit(escape_pos)?;
        let decoded = if (0xD800..=0xDBFF).contains(&unit) {
            if !self.code[self.pos..].starts_with("\\u") {
                return self.fail_at(escape_pos, "invalid \\u escape");
            }
            self.pos += 2;
            let low = self.hex_unit(escape_pos)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return self.fail_at(escape_pos, "invalid \\u escape");
            }
            0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
        } else {
            unit
        };
        match char::from_u32(decoded) {
            Some(ch) => Ok(ch),
            None => self.fail_at(escape_pos, "invalid \\u escape"),
        }
    }

    /// Exactly 4 hex digits.
    fn hex_unit(&mut self, escape_pos: usize) -> Scan<u32> {
        let Some(digits) = self.code.get(self.pos..self.pos + 4) else {
            return self.fail_at(escape_pos, "invalid \\u escape");
        };
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return self.fail_at(escape_pos, "invalid \\u escape");
        }
        self.pos += 4;
        match u32::from_str_radix(digits, 16) {
            Ok(unit) => Ok(unit),
            Err(_) => self.fail_at(escape_pos, "invalid \\u escape"),
        }
    }
}

enum NumberToken {
    Int,
    Float,
}

/// Validate a number token: optional sign, integer part without leading
/// zeros, optional fraction, optional exponent. The presence of a fraction
/// or exponent selects the floating-point representation.
fn classify_number(token: &str) -> Option<NumberToken> {
    let mut chars = token.chars().peekable();
    if matches!(chars.peek(), Some('+' | '-')) {
        chars.next();
    }
    match chars.next() {
        Some('0') => {}
        Some(c) if c.is_ascii_digit() => {
            while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
                chars.next();
            }
        }
        _ => return None,
    }
    let mut float = false;
    if chars.peek() == Some(&'.') {
        chars.next();
        if !matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
            return None;
        }
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
            chars.next();
        }
        float = true;
    }
    if matches!(chars.peek(), Some('e' | 'E')) {
        chars.next();
        if matches!(chars.peek(), Some('+' | '-')) {
            chars.next();
        }
        if !matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
            return None;
        }
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
            chars.next();
        }
        float = true;
    }
    if chars.next().is_some() {
        return None;
    }
    Some(if float {
        NumberToken::Float
    } else {
        NumberToken::Int
    })
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;

    /// Test result variants for comprehensive reader tests
    #[derive(Debug)]
    enum ReadResult {
        /// Decoding should succeed with this structural value
        Success(Value),
        /// Decoding should succeed and re-encode to this exact text
        Rendered(&'static str),
        /// Decoding should fail with an error containing this message
        SpecificError(&'static str),
    }
    use ReadResult::*;

    fn success<T: Into<Value>>(value: T) -> ReadResult {
        Success(value.into())
    }

    fn run_read_tests(test_cases: Vec<(&str, ReadResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Read test #{}", i + 1);
            let mut symbols = SymbolTable::new();
            let result = decode(input, 0, &mut symbols);
            match (result, expected) {
                (Ok(Some((value, _))), Success(expected_value)) => {
                    assert_eq!(value, *expected_value, "{test_id}: value mismatch");
                }
                (Ok(Some((value, _))), Rendered(expected_text)) => {
                    let rendered = crate::writer::encode(&value).unwrap_or_else(|e| {
                        panic!("{test_id}: encode failed for '{input}': {e:?}")
                    });
                    assert_eq!(&rendered, expected_text, "{test_id}: rendering mismatch");

                    // Round-trip: the rendering reads back to an equal value
                    let mut symbols = SymbolTable::new();
                    let (reread, _) = decode(&rendered, 0, &mut symbols)
                        .unwrap_or_else(|e| {
                            panic!("{test_id}: round-trip decode failed for '{rendered}': {e:?}")
                        })
                        .unwrap_or_else(|| panic!("{test_id}: round-trip read nothing"));
                    let rerendered = crate::writer::encode(&reread).unwrap();
                    assert_eq!(rendered, rerendered, "{test_id}: round-trip mismatch");
                }
                (Err(error), SpecificError(expected_text)) => {
                    assert!(
                        error.message.contains(expected_text),
                        "{test_id}: error should contain '{expected_text}', got '{}'",
                        error.message
                    );
                }
                (Ok(None), _) => panic!("{test_id}: unexpected end of input for '{input}'"),
                (Ok(Some((value, _))), SpecificError(expected_text)) => {
                    panic!("{test_id}: expected error containing '{expected_text}', got {value:?}")
                }
                (Err(error), _) => {
                    panic!("{test_id}: expected success for '{input}', got error {error:?}")
                }
            }
        }
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Comprehensive test coverage is intentionally thorough
    fn test_reader_comprehensive() {
        let test_cases = vec![
            // ===== NUMBER PARSING =====
            ("42", success(42)),
            ("-5", success(-5)),
            ("+5", success(5)),
            ("0", success(0)),
            ("-0", success(0)),
            ("1234567890", success(1234567890)),
            ("-9876543210", success(-9876543210i64)),
            ("12345.6789", success(12345.6789)),
            ("-9.876543e21", success(-9.876543e21)),
            ("-9.876543E+21", success(-9.876543e21)),
            ("9.8765432e-1", success(9.8765432e-1)),
            ("1e10", success(1e10)),
            ("0.5", success(0.5)),
            // Number parsing failures
            ("00", SpecificError("unknown literal")),
            ("01", SpecificError("unknown literal")),
            ("1.", SpecificError("unknown literal")),
            (".5", SpecificError("unknown literal")),
            ("1e", SpecificError("unknown literal")),
            ("1e+", SpecificError("unknown literal")),
            ("123abc", SpecificError("unknown literal")),
            ("99999999999999999999", SpecificError("integer literal out of range")),
            // ===== RESERVED TOKENS =====
            ("true", success(true)),
            ("false", success(false)),
            ("null", Success(Value::Null)),
            // ===== SYMBOL PARSING =====
            ("foo", Rendered("foo")),
            ("+", Rendered("+")),
            ("-", Rendered("-")),
            ("...", Rendered("...")),
            ("list->vec?", Rendered("list->vec?")),
            ("@home", Rendered("@home")),
            ("set!", Rendered("set!")),
            ("truex", Rendered("truex")),
            ("nullary", Rendered("nullary")),
            // ===== STRING PARSING =====
            ("\"SIMPLE STRING\"", success("SIMPLE STRING")),
            ("\"\"", success("")),
            (
                "\"COMPLEX\\nMULTI\\tLINED\\n\\\"STRING\\u0022\\n\"",
                success("COMPLEX\nMULTI\tLINED\n\"STRING\"\n"),
            ),
            (r#""slash\/b\bf\f""#, success("slash/b\u{0008}f\u{000C}")),
            (r#""Aé""#, success("A\u{e9}")),
            // Surrogate pair for U+1F600, escaped and raw
            (r#""\ud83d\ude00""#, success("\u{1F600}")),
            (r#""😀""#, success("\u{1F600}")),
            // String failures
            (r#""unterminated"#, SpecificError("unterminated string")),
            (r#""bad\"#, SpecificError("unterminated string")),
            (r#""bad\x""#, SpecificError("invalid string escape")),
            (r#""bad\u12""#, SpecificError("invalid \\u escape")),
            (r#""bad\u12zz""#, SpecificError("invalid \\u escape")),
            // Lone high surrogate
            (r#""\ud83d""#, SpecificError("invalid \\u escape")),
            // A string token must end at a literal terminator
            ("\"abc\"x", SpecificError("unknown literal")),
            // ===== LIST PARSING =====
            ("()", Rendered("()")),
            ("(list and symbol)", Rendered("(list and symbol)")),
            ("(dotted . pair)", Rendered("(dotted . pair)")),
            ("( 1   2\t\n3 )", Rendered("(1 2 3)")),
            ("((1 2) (3 4))", Rendered("((1 2) (3 4))")),
            // A dotted null tail still yields a proper list
            ("(a . (b . (c . null)))", Rendered("(a b c)")),
            ("(a b . 3)", Rendered("(a b . 3)")),
            // List failures
            ("(a b", SpecificError("unclosed list")),
            ("(", SpecificError("unclosed list")),
            ("(. b)", SpecificError("lack of dotted prefix")),
            ("(a . b c)", SpecificError("surplus of dotted suffix")),
            ("(a . )", SpecificError("unknown literal")),
            ("(a .", SpecificError("surplus of dotted suffix")),
            (")", SpecificError("unknown literal")),
            ("(1,2)", SpecificError("unknown literal")),
            // ===== ARRAY PARSING =====
            ("[]", Rendered("[]")),
            ("[1, 2, 3, 4, 5]", Rendered("[1,2,3,4,5]")),
            ("[a, [b, c], \"d\"]", Rendered("[a,[b,c],\"d\"]")),
            ("[1", SpecificError("unclosed array")),
            ("[1,", SpecificError("unclosed array")),
            ("[1 2]", SpecificError("lack of comma")),
            // ===== OBJECT PARSING =====
            ("{}", Rendered("{}")),
            (
                "{\"a\": carrot, \"b\": apple, \"c\": banana}",
                Rendered("{\"a\":carrot,\"b\":apple,\"c\":banana}"),
            ),
            // Keys are order-insignificant; rendering is sorted
            ("{\"b\": 2, \"a\": 1}", Rendered("{\"a\":1,\"b\":2}")),
            // Duplicate keys: last occurrence wins
            ("{\"a\": 1, \"a\": 2}", Rendered("{\"a\":2}")),
            ("{\"a\": {\"b\": []}}", Rendered("{\"a\":{\"b\":[]}}")),
            ("{", SpecificError("unclosed object")),
            ("{\"a\"", SpecificError("unclosed object")),
            ("{\"a\" 1}", SpecificError("lack of colon")),
            ("{\"a\": 1 \"b\": 2}", SpecificError("lack of comma")),
            ("{a: 1}", SpecificError("invalid string notation")),
            ("{1: 2}", SpecificError("invalid string notation")),
            // ===== QUOTE SHORTHAND =====
            ("'20", Rendered("(quote 20)")),
            ("'null", Rendered("(quote null)")),
            ("'(a b c)", Rendered("(quote (a b c))")),
            ("'[a, b, c]", Rendered("(quote [a,b,c])")),
            ("'{\"a\": b}", Rendered("(quote {\"a\":b})")),
            ("''x", Rendered("(quote (quote x))")),
            ("'", SpecificError("lack of quoted value")),
            // ===== MISC FAILURES =====
            ("\u{e9}", SpecificError("unknown literal")),
            (",", SpecificError("unknown literal")),
        ];

        run_read_tests(test_cases);
    }

    #[test]
    fn test_decode_sequences_and_eof() {
        let mut symbols = SymbolTable::new();
        let code = "  (quote a)\n  42 \"s\"\n";

        let (first, pos) = decode(code, 0, &mut symbols).unwrap().unwrap();
        assert_eq!(format!("{first}"), "(quote a)");

        let (second, pos) = decode(code, pos, &mut symbols).unwrap().unwrap();
        assert_eq!(second, val(42));

        let (third, pos) = decode(code, pos, &mut symbols).unwrap().unwrap();
        assert_eq!(third, val("s"));

        // Natural end of input is not an error
        assert_eq!(decode(code, pos, &mut symbols).unwrap(), None);
        assert_eq!(decode("", 0, &mut symbols).unwrap(), None);
        assert_eq!(decode("   \t\r\n", 0, &mut symbols).unwrap(), None);
    }

    #[test]
    fn test_decode_all() {
        let mut symbols = SymbolTable::new();
        let values = decode_all("1 2 3", &mut symbols).unwrap();
        assert_eq!(values, vec![val(1), val(2), val(3)]);

        assert!(decode_all("1 2 (", &mut symbols).is_err());
    }

    #[test]
    fn test_interning_through_reader() {
        let mut symbols = SymbolTable::new();
        let values = decode_all("(a a) a", &mut symbols).unwrap();
        let [in_list, again] = [&values[0], &values[1]];
        let Value::Cell(cell) = in_list else {
            panic!("expected a list");
        };
        // All three occurrences share one identity
        assert_eq!(cell.first, *again);
    }

    #[test]
    fn test_error_positions() {
        let mut symbols = SymbolTable::new();

        // Error on line 2: the stray comma after `c,`
        let err = decode("(a b\n  c, d)", 0, &mut symbols).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 4);
        assert_eq!(err.message, "unknown literal");

        let err = decode("(a b", 0, &mut symbols).unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 5);
        assert_eq!(err.message, "unclosed list");

        let err = decode("{\"k\" 1}", 0, &mut symbols).unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.message, "lack of colon");
    }

    #[test]
    fn test_dotted_tail_inside_nested_structures() {
        let mut symbols = SymbolTable::new();
        let (value, _) = decode("[(a . b), (c d . e)]", 0, &mut symbols)
            .unwrap()
            .unwrap();
        assert_eq!(format!("{value}"), "[(a . b),(c d . e)]");
    }

    #[test]
    fn test_number_classification_boundaries() {
        assert_eq!(
            decode("9223372036854775807", 0, &mut SymbolTable::new())
                .unwrap()
                .unwrap()
                .0,
            val(i64::MAX)
        );
        assert_eq!(
            decode("-9223372036854775808", 0, &mut SymbolTable::new())
                .unwrap()
                .unwrap()
                .0,
            val(i64::MIN)
        );
    }
}
