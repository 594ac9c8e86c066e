//! WebAssembly bindings for the 4004 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::{Cpu, CpuState, ProgramImage};
use crate::asm::assembler::assemble;
use crate::asm::disasm::{disassemble_at, format_instruction};
use crate::cpu::RunOutcome;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self { cpu: Cpu::new() }
    }

    /// Load a program from assembly source code. Returns the image size.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let assembly = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
        self.load_bytes(&assembly.bytes)
    }

    /// Load a raw binary image. Returns the image size.
    #[wasm_bindgen]
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<usize, JsError> {
        let image = ProgramImage::from_bytes(bytes).map_err(|e| JsError::new(&e.to_string()))?;
        self.cpu = Cpu::with_image(&image);
        Ok(image.len())
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let instr = self.cpu.step().map_err(|e| JsError::new(&e.to_string()))?;
        Ok(format_instruction(&instr))
    }

    /// Run until halt or `max_steps`. Returns true if the CPU halted.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> Result<bool, JsError> {
        let outcome = self
            .cpu
            .run_limited(u64::from(max_steps))
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(matches!(outcome, RunOutcome::Halted(_)))
    }

    /// Reset CPU state, keeping the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Check if CPU is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Check if CPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Halt reason code, or -1 while running.
    #[wasm_bindgen]
    pub fn halt_code(&self) -> i32 {
        match self.cpu.state {
            CpuState::Running => -1,
            CpuState::Halted(reason) => i32::from(reason.code()),
        }
    }

    /// Get retired instruction count.
    #[wasm_bindgen]
    pub fn steps(&self) -> u64 {
        self.cpu.steps
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc.value()
    }

    /// Get accumulator value.
    #[wasm_bindgen]
    pub fn accumulator(&self) -> u8 {
        self.cpu.regs.acc.value()
    }

    /// Get carry flag.
    #[wasm_bindgen]
    pub fn carry(&self) -> bool {
        self.cpu.regs.carry
    }

    /// Get index register `r` (0-15).
    #[wasm_bindgen]
    pub fn register(&self, r: u8) -> u8 {
        self.cpu.regs.reg(r).value()
    }

    /// Get all 16 index registers.
    #[wasm_bindgen]
    pub fn registers(&self) -> Vec<u8> {
        self.cpu.regs.index_registers().iter().map(|n| n.value()).collect()
    }

    /// Get a main-memory character of `bank` at latch address `addr`.
    #[wasm_bindgen]
    pub fn ram_at(&self, bank: u8, addr: u8) -> u8 {
        self.cpu.ram.peek(bank, addr).value()
    }

    /// Get all 256 main characters of `bank` as a typed array.
    #[wasm_bindgen]
    pub fn ram_bank(&self, bank: u8) -> js_sys::Uint8Array {
        let chars: Vec<u8> = (0..=255u8).map(|addr| self.cpu.ram.peek(bank, addr).value()).collect();
        js_sys::Uint8Array::from(chars.as_slice())
    }

    /// Get the disassembly of the instruction at the PC.
    #[wasm_bindgen]
    pub fn current_instruction(&self) -> String {
        let pc = usize::from(self.cpu.regs.pc.value());
        disassemble_at(self.cpu.rom.as_slice(), pc).0
    }

    /// Get the full CPU state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the image bytes.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<Vec<u8>, JsError> {
    let assembly = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(assembly.bytes)
}

/// Disassemble an image to a listing.
#[wasm_bindgen]
pub fn wasm_disassemble(bytes: &[u8]) -> String {
    crate::asm::disasm::disassemble(bytes)
}
