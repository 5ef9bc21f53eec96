//! Per-instruction observation hook.
//!
//! The CPU takes the tracer as a generic parameter, so the disabled case
//! ([`NullTracer`]) monomorphises to an empty call that the optimiser
//! removes entirely. The enabled case drives both human trace dumps and
//! test assertions from the same hook.

use std::fmt;
use std::io::{self, Write};

use crate::cpu::Cpu8080;

/// Observer called exactly once per retired instruction, injected
/// interrupt opcodes included, before the instruction's effects are
/// visible.
pub trait Tracer {
    fn instruction(&mut self, cpu: &Cpu8080, disasm: fmt::Arguments<'_>);
}

/// Tracer that observes nothing.
#[derive(Default, Clone, Copy)]
pub struct NullTracer;

impl Tracer for NullTracer {
    #[inline(always)]
    fn instruction(&mut self, _cpu: &Cpu8080, _disasm: fmt::Arguments<'_>) {}
}

/// Tracer that writes one line per instruction: counters, registers, the
/// flag columns and the disassembly.
pub struct LineTracer<W: Write> {
    out: W,
}

impl LineTracer<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> LineTracer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Tracer for LineTracer<W> {
    fn instruction(&mut self, cpu: &Cpu8080, disasm: fmt::Arguments<'_>) {
        // A broken pipe mid-trace is not worth unwinding the emulator for.
        let _ = writeln!(
            self.out,
            "{:>8} {:>10}  {:04X}  A={:02X} B={:02X} C={:02X} D={:02X} E={:02X} \
             HL={:04X} SP={:04X} {}  {}",
            cpu.icount,
            cpu.cycle,
            cpu.pc,
            cpu.a,
            cpu.b,
            cpu.c,
            cpu.d,
            cpu.e,
            cpu.hl(),
            cpu.sp,
            cpu.flags,
            disasm,
        );
    }
}
