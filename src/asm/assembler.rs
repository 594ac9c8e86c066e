//! Two-pass assembler for 4004 programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! COUNT   EQU 3          ; Named constant
//!         ORG 0x000      ; Set origin address
//! START:  FIM P0, 0x2A   ; Pair as Pn, R0R1 or an even register
//!         SRC R0R1
//!         LDM COUNT
//!         JCN AZ, DONE   ; Named or numeric condition
//!         JMS SUB+2      ; Simple +/- expressions
//! DONE:   HLT
//! TABLE:  DB 1, 2, 'A'   ; Bytes
//!         DW 0x1234      ; Little-endian words
//! ```
//!
//! Console service calls expand to a `JMS` to the trap vector followed by
//! inline data for [`ConsoleTrap`]:
//! ```text
//!         SAY 'H'        ; JMS 0xFFF / DB 1, 'H'
//!         PUTN R3        ; JMS 0xFFF / DB 2, 3
//!         HALT           ; JMS 0xFFF / DB 0
//! ```
//!
//! Numbers may be decimal, `0x7F`, `$7F`, `7Fh` or `0b0111`.

use crate::asm::image::{LoadError, ProgramImage};
use crate::cpu::decode::{encode, Condition, Instruction};
use crate::cpu::trap::{ConsoleTrap, TRAP_VECTOR};
use crate::nibble::{Addr12, Nibble};
use std::collections::BTreeMap;
use thiserror::Error;

/// Named `JCN` conditions.
const CONDITIONS: [(&str, u8); 8] = [
    ("TZ", 0x1),
    ("C1", 0x2),
    ("AZ", 0x4),
    ("Z", 0x4),
    ("TN", 0x9),
    ("C0", 0xA),
    ("AN", 0xC),
    ("NZ", 0xC),
];

/// Result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Program image, byte N at address N. Gaps left by `ORG` are zero.
    pub bytes: Vec<u8>,
    /// Labels and `EQU` constants, upper-cased.
    pub symbols: BTreeMap<String, i64>,
    /// One listing line per source line.
    pub listing: Vec<String>,
}

impl Assembly {
    /// Wrap the bytes as a loadable image.
    pub fn into_image(self) -> Result<ProgramImage, LoadError> {
        ProgramImage::from_bytes(&self.bytes)
    }

    /// Full listing with a trailing symbol table.
    pub fn listing_text(&self) -> String {
        let mut out = String::from("; 4004 assembly listing\n\n");
        for line in &self.listing {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!("\n; {} bytes\n", self.bytes.len()));
        if !self.symbols.is_empty() {
            out.push_str("\n; Symbols\n");
            for (name, value) in &self.symbols {
                out.push_str(&format!(";   {name:<20} = 0x{value:04X}\n"));
            }
        }
        out
    }
}

/// Assemble source code to a program image.
pub fn assemble(source: &str) -> Result<Assembly, AssemblerError> {
    let lines = source
        .lines()
        .enumerate()
        .map(|(i, raw)| parse_line(i + 1, raw))
        .collect::<Vec<_>>();

    let mut asm = Assembler::default();
    asm.pass_one(&lines)?;
    let assembly = asm.pass_two(&lines)?;
    tracing::debug!(bytes = assembly.bytes.len(), symbols = assembly.symbols.len(), "assembled");
    Ok(assembly)
}

// ============================================================================
// Source lines
// ============================================================================

/// One source line split into its parts.
struct Line<'a> {
    number: usize,
    raw: &'a str,
    label: Option<String>,
    body: Body<'a>,
}

enum Body<'a> {
    Empty,
    /// `NAME EQU value`
    Equ { name: String, expr: &'a str },
    /// Mnemonic or directive with its raw operand text.
    Op { mnemonic: String, operands: &'a str },
}

fn parse_line(number: usize, raw: &str) -> Line<'_> {
    let mut text = strip_comment(raw).trim();

    let mut label = None;
    let ident_len = identifier_len(text);
    if ident_len > 0 && text[ident_len..].starts_with(':') {
        label = Some(text[..ident_len].to_uppercase());
        text = text[ident_len + 1..].trim();
    }

    let body = if text.is_empty() {
        Body::Empty
    } else {
        let (head, rest) = split_word(text);
        let (next, expr) = split_word(rest);
        if identifier_len(head) == head.len() && next.eq_ignore_ascii_case("EQU") {
            Body::Equ { name: head.to_uppercase(), expr }
        } else {
            Body::Op { mnemonic: head.to_uppercase(), operands: rest }
        }
    };

    Line { number, raw, label, body }
}

/// Cut a trailing `;` comment, ignoring semicolons inside character literals.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            ';' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Length of the identifier at the start of `s`, 0 if there is none.
fn identifier_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(s.len(), |(i, _)| i)
}

fn split_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

/// Split an operand list on commas outside character literals.
fn split_operands(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

/// Parse a numeric literal in any of the accepted radix notations.
fn parse_number(s: &str) -> Option<i64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(hex) = s.strip_prefix('$') {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(hex) = s.strip_suffix(['h', 'H']) {
        if let Ok(v) = i64::from_str_radix(hex, 16) {
            return Some(v);
        }
    }
    if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        return i64::from_str_radix(bin, 2).ok();
    }
    s.parse().ok()
}

/// Parse `Rn` into a register number.
fn parse_register(s: &str) -> Option<u8> {
    let n = s.strip_prefix(['R', 'r']).and_then(parse_number)?;
    u8::try_from(n).ok().filter(|r| usize::from(*r) < 16)
}

// ============================================================================
// Instruction forms
// ============================================================================

/// Operand shape of a mnemonic.
#[derive(Clone, Copy)]
enum Form {
    Implied(Instruction),
    Register(fn(u8) -> Instruction),
    Pair(fn(u8) -> Instruction),
    Data(fn(Nibble) -> Instruction),
    Long(fn(Addr12) -> Instruction),
    Fim,
    Jcn,
    Isz,
    /// Console trap call: `JMS` to the trap vector, service byte, argument.
    Service(u8),
}

impl Form {
    fn len(self) -> i64 {
        match self {
            Form::Long(_) | Form::Fim | Form::Jcn | Form::Isz => 2,
            Form::Service(ConsoleTrap::HALT) => 3,
            Form::Service(_) => 4,
            _ => 1,
        }
    }
}

fn lookup(mnemonic: &str) -> Option<Form> {
    use Instruction as I;
    let form = match mnemonic {
        "NOP" => Form::Implied(I::Nop),
        "HLT" => Form::Implied(I::Hlt),
        "WRM" => Form::Implied(I::Wrm),
        "WMP" => Form::Implied(I::Wmp),
        "WRR" => Form::Implied(I::Wrr),
        "WPM" => Form::Implied(I::Wpm),
        "WR0" => Form::Implied(I::Wr { index: 0 }),
        "WR1" => Form::Implied(I::Wr { index: 1 }),
        "WR2" => Form::Implied(I::Wr { index: 2 }),
        "WR3" => Form::Implied(I::Wr { index: 3 }),
        "SBM" => Form::Implied(I::Sbm),
        "RDM" => Form::Implied(I::Rdm),
        "RDR" => Form::Implied(I::Rdr),
        "ADM" => Form::Implied(I::Adm),
        "RD0" => Form::Implied(I::Rd { index: 0 }),
        "RD1" => Form::Implied(I::Rd { index: 1 }),
        "RD2" => Form::Implied(I::Rd { index: 2 }),
        "RD3" => Form::Implied(I::Rd { index: 3 }),
        "CLB" => Form::Implied(I::Clb),
        "CLC" => Form::Implied(I::Clc),
        "IAC" => Form::Implied(I::Iac),
        "CMC" => Form::Implied(I::Cmc),
        "CMA" => Form::Implied(I::Cma),
        "RAL" => Form::Implied(I::Ral),
        "RAR" => Form::Implied(I::Rar),
        "TCC" => Form::Implied(I::Tcc),
        "DAC" => Form::Implied(I::Dac),
        "TCS" => Form::Implied(I::Tcs),
        "STC" => Form::Implied(I::Stc),
        "DAA" => Form::Implied(I::Daa),
        "KBP" => Form::Implied(I::Kbp),
        "DCL" => Form::Implied(I::Dcl),
        "SRC" => Form::Pair(|pair| I::Src { pair }),
        "FIN" => Form::Pair(|pair| I::Fin { pair }),
        "JIN" => Form::Pair(|pair| I::Jin { pair }),
        "INC" => Form::Register(|reg| I::Inc { reg }),
        "ADD" => Form::Register(|reg| I::Add { reg }),
        "SUB" => Form::Register(|reg| I::Sub { reg }),
        "LD" => Form::Register(|reg| I::Ld { reg }),
        "XCH" => Form::Register(|reg| I::Xch { reg }),
        "BBL" => Form::Data(|data| I::Bbl { data }),
        "LDM" => Form::Data(|data| I::Ldm { data }),
        "JUN" => Form::Long(|target| I::Jun { target }),
        "JMS" => Form::Long(|target| I::Jms { target }),
        "FIM" => Form::Fim,
        "JCN" => Form::Jcn,
        "ISZ" => Form::Isz,
        "HALT" => Form::Service(ConsoleTrap::HALT),
        "SAY" => Form::Service(ConsoleTrap::SAY),
        "PUTN" => Form::Service(ConsoleTrap::PUTN),
        _ => return None,
    };
    Some(form)
}

// ============================================================================
// Assembler
// ============================================================================

/// The assembler state.
#[derive(Default)]
struct Assembler {
    /// Symbol table (label or constant -> value).
    symbols: BTreeMap<String, i64>,
}

impl Assembler {
    /// Pass 1: size every line and collect symbols.
    fn pass_one(&mut self, lines: &[Line<'_>]) -> Result<(), AssemblerError> {
        let mut addr: i64 = 0;
        let mut last_label: Option<String> = None;

        for line in lines {
            let n = line.number;
            if let Some(label) = &line.label {
                if self.symbols.insert(label.clone(), addr).is_some() {
                    return Err(AssemblerError::DuplicateSymbol { line: n, symbol: label.clone() });
                }
                last_label = Some(label.clone());
            }

            match &line.body {
                Body::Empty => {}
                Body::Equ { name, expr } => {
                    let value = self.eval(expr, n)?;
                    self.symbols.insert(name.clone(), value);
                    last_label = Some(name.clone());
                }
                Body::Op { mnemonic, operands } => match mnemonic.as_str() {
                    "ORG" => addr = self.origin(operands, n)?,
                    "EQU" => {
                        let name = last_label.clone().ok_or_else(|| AssemblerError::SyntaxError {
                            line: n,
                            message: "EQU without a name".into(),
                        })?;
                        let value = self.eval(operands, n)?;
                        self.symbols.insert(name, value);
                    }
                    "DB" | "BYTE" => addr += split_operands(operands).len() as i64,
                    "DW" | "WORD" => addr += 2 * split_operands(operands).len() as i64,
                    other => match lookup(other) {
                        Some(form) => addr += form.len(),
                        None => {
                            return Err(AssemblerError::UnknownMnemonic {
                                line: n,
                                mnemonic: other.to_string(),
                            })
                        }
                    },
                },
            }
        }
        Ok(())
    }

    /// Pass 2: emit bytes with every symbol known.
    fn pass_two(self, lines: &[Line<'_>]) -> Result<Assembly, AssemblerError> {
        let mut addr: i64 = 0;
        let mut bytes: Vec<u8> = Vec::new();
        let mut listing = Vec::with_capacity(lines.len());

        for line in lines {
            let n = line.number;
            let start = addr;
            let out = match &line.body {
                Body::Empty | Body::Equ { .. } => Vec::new(),
                Body::Op { mnemonic, operands } => match mnemonic.as_str() {
                    "ORG" => {
                        addr = self.origin(operands, n)?;
                        Vec::new()
                    }
                    "EQU" => Vec::new(),
                    "DB" | "BYTE" => self.data_bytes(operands, n)?,
                    "DW" | "WORD" => self.data_words(operands, n)?,
                    other => match lookup(other) {
                        Some(Form::Service(service)) => self.service_call(service, other, operands, n)?,
                        Some(form) => encode(&self.instruction(form, other, operands, addr, n)?),
                        None => {
                            return Err(AssemblerError::UnknownMnemonic {
                                line: n,
                                mnemonic: other.to_string(),
                            })
                        }
                    },
                },
            };

            if !out.is_empty() {
                let end = addr + out.len() as i64;
                if end > Addr12::SPACE as i64 {
                    return Err(AssemblerError::AddressOverflow { line: n, addr: end - 1 });
                }
                let (from, to) = (addr as usize, end as usize);
                if bytes.len() < to {
                    bytes.resize(to, 0);
                }
                bytes[from..to].copy_from_slice(&out);
                addr = end;
            }
            listing.push(listing_line(n, start, &out, line.raw));
        }

        Ok(Assembly { bytes, symbols: self.symbols, listing })
    }

    fn origin(&self, operands: &str, line: usize) -> Result<i64, AssemblerError> {
        let value = self.eval(operands, line)?;
        check_range(value, 0, Addr12::MASK as i64, line)
    }

    fn data_bytes(&self, operands: &str, line: usize) -> Result<Vec<u8>, AssemblerError> {
        split_operands(operands)
            .into_iter()
            .map(|op| {
                let v = check_range(self.eval(op, line)?, -128, 0xFF, line)?;
                Ok((v & 0xFF) as u8)
            })
            .collect()
    }

    fn data_words(&self, operands: &str, line: usize) -> Result<Vec<u8>, AssemblerError> {
        let mut out = Vec::new();
        for op in split_operands(operands) {
            let v = check_range(self.eval(op, line)?, -0x8000, 0xFFFF, line)?;
            out.extend(((v & 0xFFFF) as u16).to_le_bytes());
        }
        Ok(out)
    }

    /// Expand a console service mnemonic into the trap call and its inline data.
    fn service_call(
        &self,
        service: u8,
        mnemonic: &str,
        operands: &str,
        line: usize,
    ) -> Result<Vec<u8>, AssemblerError> {
        let ops = split_operands(operands);
        let wanted = usize::from(service != ConsoleTrap::HALT);
        if ops.len() != wanted {
            return Err(AssemblerError::SyntaxError {
                line,
                message: format!("{mnemonic} expects {wanted} operand(s), found {}", ops.len()),
            });
        }

        let mut out = encode(&Instruction::Jms { target: TRAP_VECTOR });
        out.push(service);
        match service {
            ConsoleTrap::SAY => out.push(check_range(self.eval(ops[0], line)?, 0, 0xFF, line)? as u8),
            ConsoleTrap::PUTN => out.push(self.register(ops[0], line)?),
            _ => {}
        }
        Ok(out)
    }

    fn instruction(
        &self,
        form: Form,
        mnemonic: &str,
        operands: &str,
        addr: i64,
        line: usize,
    ) -> Result<Instruction, AssemblerError> {
        let ops = split_operands(operands);
        let expect = |count: usize| {
            if ops.len() == count {
                Ok(())
            } else {
                Err(AssemblerError::SyntaxError {
                    line,
                    message: format!("{mnemonic} expects {count} operand(s), found {}", ops.len()),
                })
            }
        };
        // In-page targets are relative to the page of the following instruction.
        let next = (addr + form.len()) & Addr12::MASK as i64;

        let instr = match form {
            Form::Implied(instr) => {
                expect(0)?;
                instr
            }
            Form::Register(make) => {
                expect(1)?;
                make(self.register(ops[0], line)?)
            }
            Form::Pair(make) => {
                expect(1)?;
                make(self.pair(ops[0], line)?)
            }
            Form::Data(make) => {
                expect(1)?;
                make(self.nibble(ops[0], line)?)
            }
            Form::Long(make) => {
                expect(1)?;
                let target = check_range(self.eval(ops[0], line)?, 0, Addr12::MASK as i64, line)?;
                make(Addr12::new(target as u16))
            }
            Form::Fim => {
                let data = match ops.len() {
                    2 => check_range(self.eval(ops[1], line)?, -128, 0xFF, line)? as u8,
                    3 => Nibble::join(self.nibble(ops[1], line)?, self.nibble(ops[2], line)?),
                    found => {
                        return Err(AssemblerError::SyntaxError {
                            line,
                            message: format!("FIM expects pair,data or pair,hi,lo, found {found} operand(s)"),
                        })
                    }
                };
                Instruction::Fim { pair: self.pair(ops[0], line)?, data }
            }
            Form::Jcn => {
                expect(2)?;
                Instruction::Jcn {
                    cond: self.condition(ops[0], line)?,
                    target: self.in_page(ops[1], next, line)?,
                }
            }
            Form::Isz => {
                expect(2)?;
                Instruction::Isz {
                    reg: self.register(ops[0], line)?,
                    target: self.in_page(ops[1], next, line)?,
                }
            }
            Form::Service(_) => {
                return Err(AssemblerError::SyntaxError {
                    line,
                    message: format!("{mnemonic} is a service call, not an instruction"),
                })
            }
        };
        Ok(instr)
    }

    fn register(&self, token: &str, line: usize) -> Result<u8, AssemblerError> {
        if let Some(reg) = parse_register(token) {
            return Ok(reg);
        }
        match self.symbols.get(&token.to_uppercase()) {
            Some(&v) if (0..16).contains(&v) => Ok(v as u8),
            _ => Err(AssemblerError::SyntaxError {
                line,
                message: format!("invalid register '{token}'"),
            }),
        }
    }

    /// Register pair as `Pn`, `RnRm` or an even register.
    fn pair(&self, token: &str, line: usize) -> Result<u8, AssemblerError> {
        let upper = token.to_uppercase();
        if let Some(p) = upper.strip_prefix('P').and_then(|d| d.parse::<u8>().ok()) {
            if p < 8 {
                return Ok(p);
            }
        }
        if let Some(split) = upper.get(1..).and_then(|rest| rest.find('R')).map(|i| i + 1) {
            if let (Some(even), Some(odd)) = (parse_register(&upper[..split]), parse_register(&upper[split..])) {
                if even % 2 == 0 && odd == even + 1 {
                    return Ok(even / 2);
                }
            }
        }
        match self.register(token, line) {
            Ok(reg) if reg % 2 == 0 => Ok(reg / 2),
            _ => Err(AssemblerError::SyntaxError {
                line,
                message: format!("invalid register pair '{token}'"),
            }),
        }
    }

    fn nibble(&self, expr: &str, line: usize) -> Result<Nibble, AssemblerError> {
        let v = check_range(self.eval(expr, line)?, 0, 0xF, line)?;
        Ok(Nibble::new(v as u8))
    }

    fn condition(&self, token: &str, line: usize) -> Result<Condition, AssemblerError> {
        let upper = token.to_uppercase();
        if let Some((_, bits)) = CONDITIONS.iter().find(|(name, _)| *name == upper) {
            return Ok(Condition::new(*bits));
        }
        let v = check_range(self.eval(token, line)?, 0, 0xF, line)?;
        Ok(Condition::new(v as u8))
    }

    /// Low byte of a jump target that must lie in the page of `next`.
    ///
    /// Values below 0x100 are taken as a bare in-page offset.
    fn in_page(&self, expr: &str, next: i64, line: usize) -> Result<u8, AssemblerError> {
        let target = self.eval(expr, line)?;
        let same_page = (0..=Addr12::MASK as i64).contains(&target) && target >> 8 == next >> 8;
        if (0..=0xFF).contains(&target) || same_page {
            Ok((target & 0xFF) as u8)
        } else {
            Err(AssemblerError::OffPage { line, target })
        }
    }

    /// Evaluate `term (('+' | '-') term)*`.
    fn eval(&self, expr: &str, line: usize) -> Result<i64, AssemblerError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(AssemblerError::SyntaxError { line, message: "missing value".into() });
        }

        let mut total = 0i64;
        let mut sign = 1i64;
        let mut start = 0;
        let mut quoted = false;
        for (i, c) in expr.char_indices() {
            match c {
                '\'' => quoted = !quoted,
                '+' | '-' if !quoted => {
                    let term = expr[start..i].trim();
                    if !term.is_empty() {
                        total = accumulate(total, sign, self.term(term, line)?, line)?;
                    } else if i != 0 {
                        return Err(AssemblerError::SyntaxError {
                            line,
                            message: format!("malformed expression '{expr}'"),
                        });
                    }
                    sign = if c == '+' { 1 } else { -1 };
                    start = i + 1;
                }
                _ => {}
            }
        }
        let term = expr[start..].trim();
        if term.is_empty() {
            return Err(AssemblerError::SyntaxError {
                line,
                message: format!("malformed expression '{expr}'"),
            });
        }
        accumulate(total, sign, self.term(term, line)?, line)
    }

    fn term(&self, term: &str, line: usize) -> Result<i64, AssemblerError> {
        if let Some(inner) = term.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
            let mut chars = inner.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(i64::from(c as u8)),
                _ => Err(AssemblerError::SyntaxError {
                    line,
                    message: format!("invalid character literal {term}"),
                }),
            };
        }
        if let Some(v) = parse_number(term) {
            return Ok(v);
        }
        if let Some(reg) = parse_register(term) {
            return Ok(i64::from(reg));
        }
        if term.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(AssemblerError::SyntaxError {
                line,
                message: format!("invalid number '{term}'"),
            });
        }
        self.symbols
            .get(&term.to_uppercase())
            .copied()
            .ok_or_else(|| AssemblerError::UndefinedSymbol { line, symbol: term.to_uppercase() })
    }
}

fn check_range(value: i64, min: i64, max: i64, line: usize) -> Result<i64, AssemblerError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(AssemblerError::ValueOutOfRange { line, value })
    }
}

/// `total + sign * term`, or `ValueOutOfRange` when it leaves `i64`.
fn accumulate(total: i64, sign: i64, term: i64, line: usize) -> Result<i64, AssemblerError> {
    term.checked_mul(sign)
        .and_then(|t| total.checked_add(t))
        .ok_or(AssemblerError::ValueOutOfRange { line, value: term })
}

fn listing_line(number: usize, addr: i64, bytes: &[u8], raw: &str) -> String {
    if bytes.is_empty() {
        return format!("{number:4}: {:18}{}", "", raw.trim_end());
    }
    let hex: String = bytes.iter().take(4).map(|b| format!("{b:02X} ")).collect();
    format!("{number:4}: {addr:03X}  {hex:<12} {}", raw.trim_end())
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined symbol on line {line}: {symbol}")]
    UndefinedSymbol { line: usize, symbol: String },

    #[error("duplicate label on line {line}: {symbol}")]
    DuplicateSymbol { line: usize, symbol: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("jump target 0x{target:X} on line {line} is outside the current page")]
    OffPage { line: usize, target: i64 },

    #[error("code on line {line} runs past the end of program memory (0x{addr:X})")]
    AddressOverflow { line: usize, addr: i64 },
}

impl AssemblerError {
    /// Source line the error refers to (1-based).
    pub fn line(&self) -> usize {
        match self {
            AssemblerError::SyntaxError { line, .. }
            | AssemblerError::UnknownMnemonic { line, .. }
            | AssemblerError::UndefinedSymbol { line, .. }
            | AssemblerError::DuplicateSymbol { line, .. }
            | AssemblerError::ValueOutOfRange { line, .. }
            | AssemblerError::OffPage { line, .. }
            | AssemblerError::AddressOverflow { line, .. } => *line,
        }
    }
}
