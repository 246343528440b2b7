use std::fmt;
use std::ops::Range;

use fxhash::FxHashMap;

use crate::error::{AsmErrorKind, AssemblyError};
use crate::opcode::{Mode, OpcodeInfo};
use crate::parser::{is_label, parse_literal, to_byte};

/// Assembly intermediate representation: classified lines plus the resolved label table.
pub struct Air<'a> {
    src: &'a str,
    stmts: Vec<AirStmt>,
    labels: FxHashMap<String, usize>,
    /// Label names in declaration order
    label_order: Vec<String>,
    /// Size of the emitted image
    end: usize,
}

/// Single classified source line.
#[derive(Clone, Debug)]
pub struct AirStmt {
    pub kind: StmtKind,
    pub comment: Option<String>,
    /// 1-based line number
    pub line: usize,
    pub span: Range<usize>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum StmtKind {
    /// `NAME:` binds the address of the next emitted byte.
    Label(String),
    /// `ORG addr` moves the emission cursor.
    Org(u8),
    /// `DB v1,v2,...`
    RawBytes(Vec<DbValue>),
    /// Bare numeric literal.
    Data(u8),
    /// Instruction with its unresolved operand text (empty when absent).
    Instr {
        info: &'static OpcodeInfo,
        operand: String,
    },
    /// Neither an instruction nor data. Always an error once labels are known.
    Unknown(String),
}

/// Single `DB` item.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DbValue {
    Byte(u8),
    /// A name where a literal belongs. Rejected once labels are known.
    Name(String),
}

/// Output of a successful assembly.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Assembly {
    /// Memory image from address 0 to the highest written address. Gaps are zero.
    ///
    /// An `ORG` past the last emitted byte does not extend the image, so trailing
    /// unwritten memory is absent rather than zero-filled.
    pub bytes: Vec<u8>,
    /// One entry per emitted byte, in emission order.
    pub listing: Vec<ListingLine>,
    /// Declared labels with their addresses, in declaration order.
    pub labels: Vec<(String, usize)>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ListingLine {
    pub address: usize,
    pub value: u8,
    pub comment: Option<String>,
}

impl fmt::Display for ListingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}: 0x{:02X}", self.address, self.value)?;
        if let Some(comment) = &self.comment {
            write!(f, " ; {}", comment)?;
        }
        Ok(())
    }
}

impl Assembly {
    /// Human-readable listing, one line per byte.
    pub fn listing_text(&self) -> String {
        self.listing
            .iter()
            .map(ListingLine::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(name))
            .map(|(_, addr)| *addr)
    }
}

impl<'a> Air<'a> {
    pub(crate) fn new(
        src: &'a str,
        stmts: Vec<AirStmt>,
        labels: FxHashMap<String, usize>,
        label_order: Vec<String>,
        end: usize,
    ) -> Self {
        Air {
            src,
            stmts,
            labels,
            label_order,
            end,
        }
    }

    pub fn stmts(&self) -> &[AirStmt] {
        &self.stmts
    }

    /// Address bound to a label. Names are case-insensitive.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(&name.to_ascii_uppercase()).copied()
    }

    /// Second pass: resolve operands and emit the memory image and listing.
    pub fn emit(&self) -> Result<Assembly, AssemblyError> {
        let mut emitter = Emitter {
            bytes: vec![0; self.end],
            listing: Vec::new(),
            addr: 0,
        };
        // A label's comment describes the data it names
        let mut label_comment: Option<&str> = None;

        for stmt in &self.stmts {
            match &stmt.kind {
                StmtKind::Label(_) => {
                    label_comment = stmt.comment.as_deref();
                }
                StmtKind::Org(addr) => {
                    emitter.addr = *addr as usize;
                }
                StmtKind::RawBytes(values) => {
                    for (i, value) in values.iter().enumerate() {
                        let byte = match value {
                            DbValue::Byte(byte) => *byte,
                            DbValue::Name(name) => {
                                return Err(self.error(stmt, self.misused_name(name)));
                            }
                        };
                        let comment = match (&stmt.comment, i) {
                            (Some(comment), _) => Some(comment.as_str()),
                            (None, 0) => label_comment,
                            (None, _) => None,
                        };
                        emitter.push(byte, comment);
                    }
                    label_comment = None;
                }
                StmtKind::Data(value) => {
                    let comment = stmt.comment.as_deref().or(label_comment);
                    emitter.push(*value, comment);
                    label_comment = None;
                }
                StmtKind::Instr { info, operand } => {
                    emitter.push(info.code, stmt.comment.as_deref());
                    match info.mode {
                        Mode::None if !operand.is_empty() => {
                            return Err(self.error(
                                stmt,
                                AsmErrorKind::UnexpectedOperand {
                                    mnemonic: info.mnemonic,
                                    operand: operand.clone(),
                                },
                            ));
                        }
                        Mode::None => {}
                        _ if operand.is_empty() => {
                            return Err(self.error(stmt, AsmErrorKind::MissingOperand(info.mnemonic)));
                        }
                        Mode::Immediate => {
                            let value = self.resolve_immediate(operand).map_err(|kind| self.error(stmt, kind))?;
                            emitter.push(value, None);
                        }
                        Mode::Address => {
                            let value = self.resolve_address(operand).map_err(|kind| self.error(stmt, kind))?;
                            emitter.push(value, None);
                        }
                    }
                    label_comment = None;
                }
                StmtKind::Unknown(text) => {
                    let kind = if self.labels.contains_key(text) {
                        AsmErrorKind::LabelAsData(text.clone())
                    } else {
                        let word = text.split_whitespace().next().unwrap_or(text);
                        AsmErrorKind::UnknownMnemonic(word.to_string())
                    };
                    return Err(self.error(stmt, kind));
                }
            }
        }

        Ok(Assembly {
            bytes: emitter.bytes,
            listing: emitter.listing,
            labels: self
                .label_order
                .iter()
                .map(|name| (name.clone(), self.labels[name]))
                .collect(),
        })
    }

    /// Error for a name used where a literal is required.
    fn misused_name(&self, name: &str) -> AsmErrorKind {
        if self.labels.contains_key(name) {
            AsmErrorKind::LabelAsData(name.to_string())
        } else {
            AsmErrorKind::BadLiteral(name.to_string())
        }
    }

    /// Immediate operands must be literals.
    fn resolve_immediate(&self, operand: &str) -> Result<u8, AsmErrorKind> {
        if self.labels.contains_key(operand) {
            return Err(AsmErrorKind::LabelAsData(operand.to_string()));
        }
        to_byte(parse_literal(operand)?)
    }

    /// Address operands are looked up as labels first, then parsed as literal addresses.
    fn resolve_address(&self, operand: &str) -> Result<u8, AsmErrorKind> {
        if let Some(addr) = self.labels.get(operand) {
            return to_byte(*addr as i64);
        }
        match parse_literal(operand) {
            Ok(value) => to_byte(value),
            Err(_) if is_label(operand) => Err(AsmErrorKind::UnresolvedLabel(operand.to_string())),
            Err(err) => Err(err),
        }
    }

    fn error(&self, stmt: &AirStmt, kind: AsmErrorKind) -> AssemblyError {
        AssemblyError::new(kind, stmt.line, stmt.span.clone(), self.src)
    }
}

/// Writes bytes at the cursor while recording the listing.
struct Emitter {
    bytes: Vec<u8>,
    listing: Vec<ListingLine>,
    addr: usize,
}

impl Emitter {
    fn push(&mut self, value: u8, comment: Option<&str>) {
        self.bytes[self.addr] = value;
        self.listing.push(ListingLine {
            address: self.addr,
            value,
            comment: comment.map(str::to_string),
        });
        self.addr += 1;
    }
}
