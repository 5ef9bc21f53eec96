use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use arcadeboy::Mode;

const DEFAULT_ROM_PATH: &str = "assets/roms/invaders";

const USAGE: &str = "\
usage: arcadeboy [MODE] [ROM]

  ROM          directory with invaders.{h,g,f,e}, or a combined image
               (default: assets/roms/invaders)

modes:
  --trace N    run N instructions with a per-instruction trace, then exit
  --bench N    run N instructions untraced and report throughput
  (default)    open a window and run at 60 fps

keys: C coin, 1/2 start, A/left and D/right move, S/space fire, P pause";

fn main() -> Result<()> {
    env_logger::init();

    let Some((mode, rom_path)) = parse_args(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };
    arcadeboy::run(mode, &rom_path)
}

/// Hand-rolled flag loop; `None` means help was requested.
fn parse_args(args: impl Iterator<Item = String>) -> Result<Option<(Mode, PathBuf)>> {
    let mut args = args;
    let mut mode = Mode::RealTime;
    let mut rom_path: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--trace" => {
                let n = args.next().context("--trace requires an instruction count")?;
                mode = Mode::Trace(n.parse().context("--trace count must be a number")?);
            }
            "--bench" => {
                let n = args.next().context("--bench requires an instruction count")?;
                mode = Mode::Bench(n.parse().context("--bench count must be a number")?);
            }
            "--help" | "-h" => return Ok(None),
            other if other.starts_with('-') => bail!("unknown option {other}\n{USAGE}"),
            other => {
                if rom_path.is_some() {
                    bail!("more than one ROM path given\n{USAGE}");
                }
                rom_path = Some(PathBuf::from(other));
            }
        }
    }

    let rom_path = rom_path.unwrap_or_else(|| {
        log::info!("no ROM path given, using {DEFAULT_ROM_PATH}");
        PathBuf::from(DEFAULT_ROM_PATH)
    });
    Ok(Some((mode, rom_path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<(Mode, PathBuf)>> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_realtime_with_the_stock_rom_dir() {
        let (mode, rom) = parse(&[]).unwrap().unwrap();
        assert_eq!(mode, Mode::RealTime);
        assert_eq!(rom, PathBuf::from(DEFAULT_ROM_PATH));
    }

    #[test]
    fn trace_and_bench_take_instruction_counts() {
        let (mode, rom) = parse(&["--trace", "50000", "roms"]).unwrap().unwrap();
        assert_eq!(mode, Mode::Trace(50_000));
        assert_eq!(rom, PathBuf::from("roms"));

        let (mode, _) = parse(&["--bench", "5000000"]).unwrap().unwrap();
        assert_eq!(mode, Mode::Bench(5_000_000));
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse(&["--help"]).unwrap().is_none());
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(parse(&["--trace"]).is_err());
        assert!(parse(&["--trace", "many"]).is_err());
        assert!(parse(&["--frames", "1"]).is_err());
        assert!(parse(&["a", "b"]).is_err());
    }
}
