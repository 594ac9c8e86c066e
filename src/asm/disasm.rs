//! Disassembler for 4004 program images.
//!
//! Converts program words back to assembly text the assembler accepts.

use crate::cpu::decode::{decode, Condition, Instruction};
use crate::nibble::Addr12;

/// Named `JCN` conditions, as printed.
const CONDITION_NAMES: [(u8, &str); 6] = [
    (0x1, "TZ"),
    (0x2, "C1"),
    (0x4, "AZ"),
    (0x9, "TN"),
    (0xA, "C0"),
    (0xC, "AN"),
];

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let m = instr.mnemonic();
    match *instr {
        Instruction::Jcn { cond, target } => format!("{m} {}, 0x{target:02X}", format_condition(cond)),
        Instruction::Fim { pair, data } => format!("{m} P{pair}, 0x{data:02X}"),
        Instruction::Src { pair } | Instruction::Fin { pair } | Instruction::Jin { pair } => {
            format!("{m} P{pair}")
        }
        Instruction::Jun { target } | Instruction::Jms { target } => format!("{m} 0x{target}"),
        Instruction::Isz { reg, target } => format!("{m} R{reg}, 0x{target:02X}"),
        Instruction::Inc { reg }
        | Instruction::Add { reg }
        | Instruction::Sub { reg }
        | Instruction::Ld { reg }
        | Instruction::Xch { reg } => format!("{m} R{reg}"),
        Instruction::Bbl { data } | Instruction::Ldm { data } => format!("{m} {}", data.value()),
        Instruction::Undefined { opcode } => format!("{m} 0x{opcode:02X}"),
        _ => m.to_string(),
    }
}

fn format_condition(cond: Condition) -> String {
    CONDITION_NAMES
        .iter()
        .find(|(bits, _)| *bits == cond.bits())
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| cond.bits().to_string())
}

/// Disassemble the instruction at `addr`.
///
/// Returns the text and the number of words consumed. A two-word form cut
/// off by the end of `bytes` is shown as a data byte.
pub fn disassemble_at(bytes: &[u8], addr: usize) -> (String, usize) {
    let Some(&first) = bytes.get(addr) else {
        return (String::new(), 0);
    };
    let len = usize::from(Instruction::word_count(first));
    if len == 2 {
        match bytes.get(addr + 1) {
            Some(&second) => (format_instruction(&decode(first, second)), 2),
            None => (format!("DB 0x{first:02X}"), 1),
        }
    } else {
        (format_instruction(&decode(first, 0)), 1)
    }
}

/// Disassemble a whole image as a listing.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; 4004 disassembly\n");
    output.push_str("; -----------------\n\n");

    let mut addr = 0;
    while addr < bytes.len() {
        let (text, len) = disassemble_at(bytes, addr);
        let raw = bytes[addr..addr + len]
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        output.push_str(&format!("{}: {:<6} {}\n", Addr12::new(addr as u16), raw, text));
        addr += len;
    }

    output
}
