use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use arcadeboy_invaders::cpu::CLOCK_HZ;
use arcadeboy_invaders::{InvadersApp, InvadersMachine, LineTracer, NullTracer};
use arcadeboy_sdl2::{App, SdlContext, SdlInitInfo};

pub mod rom;

/// How the driver loop runs and when it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Windowed, paced to 60 frames per wall second.
    RealTime,
    /// Batch: retire this many instructions with the line tracer on.
    Trace(u64),
    /// Batch: retire this many instructions untraced, report throughput.
    Bench(u64),
}

pub fn run(mode: Mode, rom_path: &Path) -> Result<()> {
    let image = rom::load_rom_set(rom_path)?;
    let mut machine = InvadersMachine::new();
    machine.load_rom(&image);

    match mode {
        Mode::Trace(budget) => run_trace(machine, budget),
        Mode::Bench(budget) => run_bench(machine, budget),
        Mode::RealTime => run_realtime(machine),
    }
}

/// A halt is a normal outcome for the driver: report it and exit clean.
fn report_halt(result: Result<(), arcadeboy_invaders::Halt>) {
    if let Err(halt) = result {
        log::error!("emulation stopped: {halt}");
    }
}

fn run_trace(mut machine: InvadersMachine, budget: u64) -> Result<()> {
    let mut tracer = LineTracer::stdout();
    report_halt(machine.run_instructions(budget, &mut tracer));
    Ok(())
}

fn run_bench(mut machine: InvadersMachine, budget: u64) -> Result<()> {
    let start = Instant::now();
    let outcome = machine.run_instructions(budget, &mut NullTracer);
    let wall = start.elapsed().as_secs_f64();
    report_halt(outcome);

    let cpu = machine.cpu();
    let simulated = cpu.cycle as f64 / f64::from(CLOCK_HZ);
    println!(
        "{} instructions, {} cycles: {simulated:.3}s simulated in {wall:.3}s wall ({:.1}x real time)",
        cpu.icount,
        cpu.cycle,
        simulated / wall
    );
    Ok(())
}

fn run_realtime(machine: InvadersMachine) -> Result<()> {
    let app = InvadersApp::new(machine);
    let init = SdlInitInfo::builder()
        .width(app.width())
        .height(app.height())
        .scale(app.scale())
        .title(app.title().to_owned())
        .build();
    SdlContext::run(init, app)
}
