use std::ops::Range;

use fxhash::FxHashMap;

use crate::air::{Air, AirStmt, DbValue, StmtKind};
use crate::error::{AsmErrorKind, AssemblyError};
use crate::opcode;

/// Highest address an `ORG` directive may move the cursor to.
const ADDRESS_MAX: i64 = 0xFF;

/// First pass of the assembler.
///
/// Classifies every line and binds each label to the address of the line that follows it.
/// Operands are left unresolved until [`Air::emit`], so labels may be used before they are
/// declared.
pub struct AsmParser<'a> {
    src: &'a str,
    stmts: Vec<AirStmt>,
    labels: FxHashMap<String, usize>,
    label_order: Vec<String>,
    /// Emission cursor
    addr: usize,
    /// One past the highest address written to
    end: usize,
}

/// A single line of source with its position.
struct SourceLine<'a> {
    number: usize,
    span: Range<usize>,
    code: &'a str,
    comment: Option<&'a str>,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser {
            src,
            stmts: Vec::new(),
            labels: FxHashMap::default(),
            label_order: Vec::new(),
            addr: 0,
            end: 0,
        }
    }

    pub fn parse(mut self) -> Result<Air<'a>, AssemblyError> {
        for line in lines(self.src) {
            self.parse_line(line)?;
        }
        Ok(Air::new(
            self.src,
            self.stmts,
            self.labels,
            self.label_order,
            self.end,
        ))
    }

    fn parse_line(&mut self, line: SourceLine<'a>) -> Result<(), AssemblyError> {
        let code = opcode::normalize(line.code);
        let comment = line.comment.map(str::to_string);

        // Comment-only lines produce nothing
        if code.is_empty() {
            return Ok(());
        }

        let (first, rest) = match code.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim()),
            None => (code.as_str(), ""),
        };

        let kind = if let Some(name) = code.strip_suffix(':') {
            let name = name.trim();
            if !is_label(name) {
                return Err(self.error(&line, AsmErrorKind::InvalidLabel(name.to_string())));
            }
            if self.labels.insert(name.to_string(), self.addr).is_some() {
                return Err(self.error(&line, AsmErrorKind::DuplicateLabel(name.to_string())));
            }
            self.label_order.push(name.to_string());
            StmtKind::Label(name.to_string())
        } else if first == "ORG" {
            if rest.is_empty() {
                return Err(self.error(&line, AsmErrorKind::EmptyDirective("ORG")));
            }
            let addr = parse_literal(rest).map_err(|kind| self.error(&line, kind))?;
            if !(0..=ADDRESS_MAX).contains(&addr) {
                return Err(self.error(&line, AsmErrorKind::OutOfRange(addr)));
            }
            self.addr = addr as usize;
            StmtKind::Org(addr as u8)
        } else if first == "DB" {
            if rest.is_empty() {
                return Err(self.error(&line, AsmErrorKind::EmptyDirective("DB")));
            }
            let values = rest
                .split(',')
                .map(|value| match value.trim() {
                    name if is_label(name) => Ok(DbValue::Name(name.to_string())),
                    value => parse_byte(value).map(DbValue::Byte),
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|kind| self.error(&line, kind))?;
            self.advance(values.len());
            StmtKind::RawBytes(values)
        } else if let Some((info, operand)) = opcode::match_mnemonic(&code) {
            self.advance(info.len as usize);
            StmtKind::Instr {
                info,
                operand: operand.to_string(),
            }
        } else if looks_numeric(&code) {
            let value = parse_byte(&code).map_err(|kind| self.error(&line, kind))?;
            self.advance(1);
            StmtKind::Data(value)
        } else {
            // Whether this is a misused label is only known once every label is declared
            StmtKind::Unknown(code.clone())
        };

        self.stmts.push(AirStmt {
            kind,
            comment,
            line: line.number,
            span: line.span,
        });
        Ok(())
    }

    fn advance(&mut self, len: usize) {
        self.addr += len;
        self.end = self.end.max(self.addr);
    }

    fn error(&self, line: &SourceLine, kind: AsmErrorKind) -> AssemblyError {
        AssemblyError::new(kind, line.number, line.span.clone(), self.src)
    }
}

/// Split source into numbered lines, separating trailing comments.
///
/// Lines starting with `#` are ignored entirely.
fn lines(src: &str) -> impl Iterator<Item = SourceLine<'_>> {
    let mut offs = 0;
    src.split_inclusive('\n')
        .enumerate()
        .filter_map(move |(i, raw)| {
            let start = offs;
            offs += raw.len();
            let text = raw.trim_end_matches(['\n', '\r']);
            if text.trim_start().starts_with('#') {
                return None;
            }
            let (code, comment) = match text.split_once(';') {
                Some((code, comment)) => (code, Some(comment.trim()).filter(|c| !c.is_empty())),
                None => (text, None),
            };
            Some(SourceLine {
                number: i + 1,
                span: start..start + text.len(),
                code: code.trim(),
                comment,
            })
        })
}

pub(crate) fn is_label(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn looks_numeric(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+')
}

/// Parse a decimal, `0x` hex, `0b` binary or `0o` octal literal with an optional sign.
pub fn parse_literal(text: &str) -> Result<i64, AsmErrorKind> {
    let bad = || AsmErrorKind::BadLiteral(text.to_string());
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        Some("0b" | "0B") => (2, &unsigned[2..]),
        Some("0o" | "0O") => (8, &unsigned[2..]),
        _ => (10, unsigned),
    };
    // `from_str_radix` would accept a second sign
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(bad());
    }
    let value = i64::from_str_radix(digits, radix).map_err(|_| bad())?;
    Ok(if negative { -value } else { value })
}

/// Parse a literal that must fit in a single byte.
pub fn parse_byte(text: &str) -> Result<u8, AsmErrorKind> {
    to_byte(parse_literal(text)?)
}

pub(crate) fn to_byte(value: i64) -> Result<u8, AsmErrorKind> {
    u8::try_from(value).map_err(|_| AsmErrorKind::OutOfRange(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<StmtKind> {
        AsmParser::new(src)
            .parse()
            .unwrap()
            .stmts()
            .iter()
            .map(|stmt| stmt.kind.clone())
            .collect()
    }

    #[test]
    fn literals() {
        assert_eq!(parse_literal("42"), Ok(42));
        assert_eq!(parse_literal("0x2A"), Ok(42));
        assert_eq!(parse_literal("0X2a"), Ok(42));
        assert_eq!(parse_literal("0b101010"), Ok(42));
        assert_eq!(parse_literal("0o52"), Ok(42));
        assert_eq!(parse_literal("-1"), Ok(-1));
        assert!(parse_literal("0x").is_err());
        assert!(parse_literal("12ab").is_err());
        assert!(parse_literal("--1").is_err());
        assert!(parse_literal("0x-1").is_err());
        assert!(parse_literal("").is_err());
    }

    #[test]
    fn byte_range() {
        assert_eq!(parse_byte("255"), Ok(255));
        assert_eq!(parse_byte("256"), Err(AsmErrorKind::OutOfRange(256)));
        assert_eq!(parse_byte("-1"), Err(AsmErrorKind::OutOfRange(-1)));
    }

    #[test]
    fn label_names() {
        assert!(is_label("LOOP"));
        assert!(is_label("_end2"));
        assert!(!is_label("2LOOP"));
        assert!(!is_label("MY LABEL"));
        assert!(!is_label(""));
    }

    #[test]
    fn classify_lines() {
        let kinds = kinds(
            "start:\n\
             # full line comment\n\
             mvi a 0x05 ; load\n\
             ORG 0x80\n\
             DB 1, 2,3\n\
             7\n\
             bogus",
        );
        assert_eq!(
            kinds,
            vec![
                StmtKind::Label("START".to_string()),
                StmtKind::Instr {
                    info: opcode::lookup("MVI A").unwrap(),
                    operand: "0X05".to_string(),
                },
                StmtKind::Org(0x80),
                StmtKind::RawBytes(vec![DbValue::Byte(1), DbValue::Byte(2), DbValue::Byte(3)]),
                StmtKind::Data(7),
                StmtKind::Unknown("BOGUS".to_string()),
            ]
        );
    }

    #[test]
    fn db_names_wait_for_labels() {
        assert_eq!(
            kinds("DB 1, later"),
            vec![StmtKind::RawBytes(vec![
                DbValue::Byte(1),
                DbValue::Name("LATER".to_string())
            ])]
        );
        let air = AsmParser::new("DB x, 2\nafter:").parse().unwrap();
        assert_eq!(air.label("after"), Some(2));
    }

    #[test]
    fn labels_bind_current_address() {
        let air = AsmParser::new(
            "first:\n\
             MVI A 1\n\
             second: ; after two bytes\n\
             HLT\n\
             ORG 0x40\n\
             third:\n\
             DB 1,2\n\
             fourth:",
        )
        .parse()
        .unwrap();
        assert_eq!(air.label("FIRST"), Some(0));
        assert_eq!(air.label("second"), Some(2));
        assert_eq!(air.label("THIRD"), Some(0x40));
        assert_eq!(air.label("FOURTH"), Some(0x42));
    }

    #[test]
    fn parse_errors() {
        let err = |src| AsmParser::new(src).parse().err().map(|e| e.kind);
        assert_eq!(
            err("a:\nb:\na:"),
            Some(AsmErrorKind::DuplicateLabel("A".to_string()))
        );
        assert_eq!(
            err("1abc:"),
            Some(AsmErrorKind::InvalidLabel("1ABC".to_string()))
        );
        assert_eq!(err("ORG 0x100"), Some(AsmErrorKind::OutOfRange(0x100)));
        assert_eq!(err("ORG"), Some(AsmErrorKind::EmptyDirective("ORG")));
        assert_eq!(err("DB"), Some(AsmErrorKind::EmptyDirective("DB")));
        assert_eq!(err("DB 1,,2"), Some(AsmErrorKind::BadLiteral("".to_string())));
        assert_eq!(err("300"), Some(AsmErrorKind::OutOfRange(300)));
        assert_eq!(err("0xZZ"), Some(AsmErrorKind::BadLiteral("0XZZ".to_string())));
    }

    #[test]
    fn error_reports_line() {
        let err = AsmParser::new("NOP\n\nORG 999 ; too far\nHLT")
            .parse()
            .err()
            .unwrap();
        assert_eq!(err.line, 3);
        assert_eq!(err.text, "ORG 999 ; too far");
    }
}
