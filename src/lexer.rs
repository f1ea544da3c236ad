//! # Lexer
//!
//! Hand-written, line-oriented scanner. Each physical line becomes one
//! [`LineRecord`] holding zero or more statements. Rules:
//!
//! 1. `;` separates statements; empty statements are dropped.
//! 2. `#` at statement position starts a comment that runs to the end of the line.
//!    After a shape's closing parenthesis it starts the attribute segment instead.
//! 3. A shape statement is `[+|-]keyword(...)`, optionally followed by `||`.
//!    Parentheses are matched by depth; the text between them is left raw.
//! 4. Anything else is a directive: `global` takes the rest of the line, other
//!    keywords take the text up to the next `;` or `#`.
//! 5. Whole-line comments may carry a shape (`# text(...) ...`, `# composite(...) || ...`)
//!    or a `# tile N` directive.
//!
//! Errors stop the current line only. Statements lexed before the error are kept.

use crate::error::LexError;
use crate::region::Sign;

/// Keywords that DS9 writes inside comments as shapes.
const COMMENT_SHAPES: &[&str] = &["text", "vector", "ruler", "composite", "template"];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LineClass {
    Blank,
    Comment,
    Directive,
    /// At least one shape statement, or a line that failed to lex.
    Shape,
}

/// Raw pieces of `[sign]keyword(params) [||] [# attributes]`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ShapeTokens<'a> {
    pub sign: Sign,
    pub keyword: &'a str,
    /// Text between the parentheses, untouched.
    pub params: &'a str,
    /// Attribute segment without the leading `#`, trimmed.
    pub attributes: Option<&'a str>,
    /// The statement ended in `||` (composite continuation).
    pub continued: bool,
    /// The shape was found inside a `#` comment.
    pub commented: bool,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Statement<'a> {
    Directive { keyword: &'a str, args: &'a str },
    Shape(ShapeTokens<'a>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct LineRecord<'a> {
    /// 1-based line number.
    pub line: usize,
    pub class: LineClass,
    pub statements: Vec<Statement<'a>>,
    /// Free comment text, without the `#`.
    pub comment: Option<&'a str>,
    pub error: Option<LexError>,
}

/// Lexer over the full text of a region file.
pub struct Lexer<'a> {
    text: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// Lazily lexes the text, one record per line.
    pub fn records(&self) -> impl Iterator<Item = LineRecord<'a>> + 'a {
        let text = self.text;
        text.lines().enumerate().map(|(idx, line)| lex_line(idx + 1, line))
    }
}

/// Lexes a single line. `line` is the 1-based number reported in errors.
pub fn lex_line(line: usize, text: &str) -> LineRecord<'_> {
    let trimmed = text.trim();
    let mut record =
        LineRecord { line, class: LineClass::Blank, statements: Vec::new(), comment: None, error: None };
    if trimmed.is_empty() {
        return record;
    }

    let result = match trimmed.strip_prefix('#') {
        Some(body) => lex_comment(&mut record, body.trim_start()),
        None => lex_statements(&mut record, trimmed),
    };
    if let Err(reason) = result {
        record.error = Some(LexError::new(line, reason));
    }

    record.class = if record.statements.iter().any(|s| matches!(s, Statement::Shape(_))) {
        LineClass::Shape
    } else if !record.statements.is_empty() {
        LineClass::Directive
    } else if record.error.is_some() {
        LineClass::Shape
    } else {
        LineClass::Comment
    };
    record
}

fn lex_comment<'a>(record: &mut LineRecord<'a>, body: &'a str) -> Result<(), String> {
    let mut scanner = Scanner::new(body);
    let word = scanner.ident();
    let lower = word.to_ascii_lowercase();

    if COMMENT_SHAPES.contains(&lower.as_str()) {
        scanner.skip_ws();
        if scanner.peek() == Some(b'(') {
            let shape = scan_shape(&mut scanner, Sign::Include, word, true)?;
            record.statements.push(Statement::Shape(shape));
            return Ok(());
        }
    } else if lower == "tile" {
        let args = scanner.rest().trim();
        if args.starts_with(|c: char| c.is_ascii_digit()) {
            record.statements.push(Statement::Directive { keyword: word, args });
            return Ok(());
        }
    }
    record.comment = Some(body);
    Ok(())
}

fn lex_statements<'a>(record: &mut LineRecord<'a>, text: &'a str) -> Result<(), String> {
    let mut scanner = Scanner::new(text);
    loop {
        scanner.skip_ws();
        match scanner.peek() {
            None => return Ok(()),
            Some(b';') => {
                scanner.bump();
                continue;
            }
            Some(b'#') => {
                record.comment = Some(scanner.rest()[1..].trim());
                return Ok(());
            }
            Some(_) => {}
        }
        let statement = lex_statement(&mut scanner)?;
        record.statements.push(statement);
    }
}

fn lex_statement<'a>(scanner: &mut Scanner<'a>) -> Result<Statement<'a>, String> {
    let explicit_sign = match scanner.peek() {
        Some(b'-') => Some(Sign::Exclude),
        Some(b'+') => Some(Sign::Include),
        _ => None,
    };
    if explicit_sign.is_some() {
        scanner.bump();
        scanner.skip_ws();
    }

    let keyword = scanner.ident();
    if keyword.is_empty() {
        return Err(match scanner.peek_char() {
            Some(')') => "unbalanced ')'".to_string(),
            Some(c) => format!("unexpected character '{c}'"),
            None => "sign without a shape".to_string(),
        });
    }

    scanner.skip_ws();
    if scanner.peek() == Some(b'(') {
        let shape = scan_shape(scanner, explicit_sign.unwrap_or_default(), keyword, false)?;
        scanner.skip_ws();
        return match scanner.peek() {
            None | Some(b';') => Ok(Statement::Shape(shape)),
            Some(_) => Err(format!("unexpected text after {keyword}(...): '{}'", scanner.rest().trim())),
        };
    }

    if explicit_sign.is_some() {
        return Err(format!("sign before '{keyword}', which is not a shape"));
    }
    if keyword.eq_ignore_ascii_case("global") {
        let args = scanner.rest().trim();
        scanner.finish();
        return Ok(Statement::Directive { keyword, args });
    }

    let rest = scanner.rest();
    let end = rest.find([';', '#']).unwrap_or(rest.len());
    let args = rest[..end].trim();
    if args.contains(')') && !args.contains('(') {
        return Err("unbalanced ')'".to_string());
    }
    if args.contains(['(', ')']) {
        return Err(format!("unexpected parenthesis after '{keyword}'"));
    }
    scanner.advance(end);
    Ok(Statement::Directive { keyword, args })
}

/// Scans `(params) [||] [# attrs]` with the scanner positioned on `(`.
fn scan_shape<'a>(
    scanner: &mut Scanner<'a>,
    sign: Sign,
    keyword: &'a str,
    commented: bool,
) -> Result<ShapeTokens<'a>, String> {
    let open = scanner.pos + 1;
    let mut depth = 0usize;
    let mut close = None;
    for (offset, b) in scanner.text.as_bytes()[scanner.pos..].iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(scanner.pos + offset);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(close) = close else {
        return Err(format!("unterminated parenthesis in '{keyword}('"));
    };
    let params = &scanner.text[open..close];
    scanner.pos = close + 1;

    scanner.skip_ws();
    let continued = scanner.rest().starts_with("||");
    if continued {
        scanner.advance(2);
        scanner.skip_ws();
    }

    // Comment-borne shapes carry their attributes without a second `#`.
    let segment = if commented {
        let rest = scanner.rest();
        Some(rest.strip_prefix('#').unwrap_or(rest))
    } else if scanner.peek() == Some(b'#') {
        Some(&scanner.rest()[1..])
    } else {
        None
    };

    let attributes = match segment.map(str::trim) {
        Some(seg) => {
            check_attribute_segment(seg)?;
            scanner.finish();
            (!seg.is_empty()).then_some(seg)
        }
        None => None,
    };

    Ok(ShapeTokens { sign, keyword, params, attributes, continued, commented })
}

/// Every quoted value (`="..."`, `='...'`, `={...}`) must be closed.
fn check_attribute_segment(segment: &str) -> Result<(), String> {
    let mut rest = segment;
    while let Some(eq) = rest.find('=') {
        let after = rest[eq + 1..].trim_start();
        let closer = match after.as_bytes().first() {
            Some(b'"') => '"',
            Some(b'\'') => '\'',
            Some(b'{') => '}',
            _ => {
                rest = after;
                continue;
            }
        };
        match after[1..].find(closer) {
            Some(end) => rest = &after[end + 2..],
            None => return Err(format!("unterminated attribute value: '{}'", after.trim_end())),
        }
    }
    Ok(())
}

/// Byte cursor over one line. Only ever stops on ASCII bytes, so every slice
/// it hands out lies on a char boundary.
struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
    }

    fn finish(&mut self) {
        self.pos = self.text.len();
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }
}
