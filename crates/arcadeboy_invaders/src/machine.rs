use crate::cpu::{Bus8080, Cpu8080, Halt, CLOCK_HZ};
use crate::trace::Tracer;

/// Addressable memory on the board: 8 KiB ROM, 1 KiB work RAM, 7 KiB
/// video RAM. The 8080's upper address bits are not decoded.
pub const MEMORY_SIZE: usize = 0x4000;

/// Every access is masked into the 14 decoded address bits. This is also
/// what mirrors the RAM window above 0x3FFF, which the game ROM relies on.
const ADDR_MASK: u16 = 0x3fff;

/// End of the ROM region; `load_rom` refuses to write past it.
const ROM_SIZE: usize = 0x2000;

/// Start of video RAM.
const VRAM_START: usize = 0x2400;
/// Size of video RAM in bytes (0x1c00 = 7168 bytes = 224x256 bits).
const VRAM_SIZE: usize = 0x1c00;

/// Frame timing: 60 Hz display on the 2 MHz CPU.
pub const FRAME_RATE_HZ: u32 = 60;
pub const CYCLES_PER_FRAME: u32 = CLOCK_HZ / FRAME_RATE_HZ;

/// Bit positions for input port 1 (IN 1).
const IN1_BIT_COIN: u8 = 0;
const IN1_BIT_P2_START: u8 = 1;
const IN1_BIT_P1_START: u8 = 2;
const IN1_BIT_ALWAYS_ONE: u8 = 3;
const IN1_BIT_P1_FIRE: u8 = 4;
const IN1_BIT_P1_LEFT: u8 = 5;
const IN1_BIT_P1_RIGHT: u8 = 6;

/// The external 16-bit shift chip the ROM uses to rotate sprites.
///
/// OUT 4 pushes a byte in from the top (`lo` takes the old `hi`); OUT 2
/// picks a 3-bit window offset; IN 3 reads eight bits starting `offset`
/// bits below the top of the `hi:lo` word.
#[derive(Default, Clone, Copy)]
struct ShiftRegister {
    hi: u8,
    lo: u8,
    offset: u8,
}

impl ShiftRegister {
    fn load(&mut self, value: u8) {
        self.lo = self.hi;
        self.hi = value;
    }

    fn set_offset(&mut self, value: u8) {
        self.offset = value & 0x07;
    }

    fn window(self) -> u8 {
        let word = (u16::from(self.hi) << 8) | u16::from(self.lo);
        (word >> (8 - u32::from(self.offset))) as u8
    }
}

/// Player controls and the coin switch, written by the host between
/// steps and sampled by the ROM through IN 1.
#[derive(Default, Clone, Copy)]
pub struct Buttons {
    pub coin: bool,
    pub p1_start: bool,
    pub p2_start: bool,
    pub p1_left: bool,
    pub p1_right: bool,
    pub p1_fire: bool,
}

/// One physical input, for the host-facing `set_button` API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Coin,
    P1Start,
    P2Start,
    P1Left,
    P1Right,
    P1Fire,
}

impl Buttons {
    /// Pack into the IN 1 byte. The coin switch reads inverted (0 when a
    /// coin is in the slot); bit 3 is tied high on the board.
    fn port1(self) -> u8 {
        let mut v = 1 << IN1_BIT_ALWAYS_ONE;
        if !self.coin {
            v |= 1 << IN1_BIT_COIN;
        }
        if self.p2_start {
            v |= 1 << IN1_BIT_P2_START;
        }
        if self.p1_start {
            v |= 1 << IN1_BIT_P1_START;
        }
        if self.p1_fire {
            v |= 1 << IN1_BIT_P1_FIRE;
        }
        if self.p1_left {
            v |= 1 << IN1_BIT_P1_LEFT;
        }
        if self.p1_right {
            v |= 1 << IN1_BIT_P1_RIGHT;
        }
        v
    }
}

/// Bus state for the Space Invaders board: memory, the shift chip, input
/// latches and the two sound output latches.
struct InvadersBus {
    mem: Box<[u8; MEMORY_SIZE]>,
    shifter: ShiftRegister,
    buttons: Buttons,
    out_port3: u8,
    out_port5: u8,
}

impl Default for InvadersBus {
    fn default() -> Self {
        Self {
            mem: Box::new([0; MEMORY_SIZE]),
            shifter: ShiftRegister::default(),
            buttons: Buttons::default(),
            out_port3: 0,
            out_port5: 0,
        }
    }
}

impl Bus8080 for InvadersBus {
    fn mem_read(&mut self, addr: u16) -> u8 {
        self.mem[usize::from(addr & ADDR_MASK)]
    }

    fn mem_write(&mut self, addr: u16, value: u8) {
        self.mem[usize::from(addr & ADDR_MASK)] = value;
    }

    fn io_read(&mut self, port: u8) -> Option<u8> {
        match port {
            1 => Some(self.buttons.port1()),
            // DIP switches: all off (3 ships, coin info shown).
            2 => Some(0),
            3 => Some(self.shifter.window()),
            _ => None,
        }
    }

    fn io_write(&mut self, port: u8, value: u8) -> Option<()> {
        match port {
            // Port 1 writes are a test-harness convention; discard.
            1 => Some(()),
            2 => {
                self.shifter.set_offset(value);
                Some(())
            }
            3 => {
                self.out_port3 = value;
                Some(())
            }
            4 => {
                self.shifter.load(value);
                Some(())
            }
            5 => {
                self.out_port5 = value;
                Some(())
            }
            // Watchdog; the emulator never bites.
            6 => Some(()),
            _ => None,
        }
    }
}

/// The Space Invaders machine: the 8080 core plus the board around it.
#[derive(Default)]
pub struct InvadersMachine {
    cpu: Cpu8080,
    bus: InvadersBus,
}

impl InvadersMachine {
    /// Construct a machine in a powered-up but reset state. Memory is
    /// zero until a ROM image is loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the CPU and IO latches, preserving memory contents.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.shifter = ShiftRegister::default();
        self.bus.buttons = Buttons::default();
        self.bus.out_port3 = 0;
        self.bus.out_port5 = 0;
    }

    /// Load a ROM image at 0x0000. The image is the four 2 KiB ROM files
    /// concatenated in address order (H, G, F, E); a shorter image leaves
    /// the remainder zeroed. Bytes past the 8 KiB ROM region are ignored.
    pub fn load_rom(&mut self, image: &[u8]) {
        let len = image.len().min(ROM_SIZE);
        self.bus.mem[..len].copy_from_slice(&image[..len]);
    }

    /// Run until `budget` more instructions have retired. Batch/test mode.
    pub fn run_instructions<T: Tracer>(&mut self, budget: u64, tracer: &mut T) -> Result<(), Halt> {
        let target = self.cpu.icount.saturating_add(budget);
        while self.cpu.icount < target {
            self.cpu.step(&mut self.bus, tracer)?;
        }
        Ok(())
    }

    /// Run one display frame's worth of cycles. Real-time mode calls this
    /// once per frame; pacing to the wall clock is the frontend's job.
    pub fn run_frame<T: Tracer>(&mut self, tracer: &mut T) -> Result<(), Halt> {
        let target = self.cpu.cycle.saturating_add(u64::from(CYCLES_PER_FRAME));
        while self.cpu.cycle < target {
            self.cpu.step(&mut self.bus, tracer)?;
        }
        Ok(())
    }

    /// Update one input between steps.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let b = &mut self.bus.buttons;
        match button {
            Button::Coin => b.coin = pressed,
            Button::P1Start => b.p1_start = pressed,
            Button::P2Start => b.p2_start = pressed,
            Button::P1Left => b.p1_left = pressed,
            Button::P1Right => b.p1_right = pressed,
            Button::P1Fire => b.p1_fire = pressed,
        }
    }

    /// The raw video RAM window used by the renderer: 0x1c00 bytes from
    /// 0x2400, one pixel per bit in the rotated layout.
    pub fn video_ram(&self) -> &[u8] {
        &self.bus.mem[VRAM_START..VRAM_START + VRAM_SIZE]
    }

    /// Last values written to the sound latches (OUT 3, OUT 5). The host
    /// plays a sample for each bit it sees go high between frames.
    pub fn outputs(&self) -> (u8, u8) {
        (self.bus.out_port3, self.bus.out_port5)
    }

    pub fn cpu(&self) -> &Cpu8080 {
        &self.cpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Halt;
    use crate::trace::NullTracer;

    fn machine_with(program: &[u8]) -> InvadersMachine {
        let mut machine = InvadersMachine::new();
        machine.load_rom(program);
        machine
    }

    #[test]
    fn shifter_returns_the_offset_window() {
        // OUT 4,$AB; OUT 4,$CD; OUT 2,3; IN 3
        let mut machine = machine_with(&[
            0x3e, 0xab, 0xd3, 0x04, // MVI A,$AB; OUT 4
            0x3e, 0xcd, 0xd3, 0x04, // MVI A,$CD; OUT 4
            0x3e, 0x03, 0xd3, 0x02, // MVI A,3;   OUT 2
            0xdb, 0x03, // IN 3
        ]);
        machine.run_instructions(7, &mut NullTracer).unwrap();
        assert_eq!(machine.cpu.a, ((0xcd << 3) | (0xab >> 5)) as u8);
        assert_eq!(machine.cpu.a, 0x6d);
    }

    #[test]
    fn shifter_offset_zero_reads_the_newest_byte() {
        let mut machine = machine_with(&[
            0x3e, 0xab, 0xd3, 0x04, // MVI A,$AB; OUT 4
            0x3e, 0xcd, 0xd3, 0x04, // MVI A,$CD; OUT 4
            0xdb, 0x03, // IN 3 with offset 0
        ]);
        machine.run_instructions(5, &mut NullTracer).unwrap();
        assert_eq!(machine.cpu.a, 0xcd);
    }

    #[test]
    fn shifter_offset_keeps_only_three_bits() {
        let mut shifter = ShiftRegister::default();
        shifter.set_offset(0xfd);
        assert_eq!(shifter.offset, 5);
    }

    #[test]
    fn port1_packs_buttons_with_inverted_coin() {
        let mut machine = machine_with(&[0xdb, 0x01]); // IN 1
        machine.run_instructions(1, &mut NullTracer).unwrap();
        // Idle: no coin reads as 1, bit 3 tied high.
        assert_eq!(machine.cpu.a, 0b0000_1001);

        let mut machine = machine_with(&[0xdb, 0x01]);
        machine.set_button(Button::Coin, true);
        machine.set_button(Button::P1Start, true);
        machine.set_button(Button::P1Fire, true);
        machine.set_button(Button::P1Left, true);
        machine.run_instructions(1, &mut NullTracer).unwrap();
        assert_eq!(machine.cpu.a, 0b0011_1100);
    }

    #[test]
    fn dip_switch_port_reads_zero() {
        let mut machine = machine_with(&[0xdb, 0x02]);
        machine.run_instructions(1, &mut NullTracer).unwrap();
        assert_eq!(machine.cpu.a, 0);
    }

    #[test]
    fn writes_above_the_decoded_space_mirror_down() {
        let mut machine = InvadersMachine::new();
        machine.bus.mem_write(0x6123, 0x42);
        assert_eq!(machine.bus.mem_read(0x2123), 0x42);
        machine.bus.mem_write(0xa001, 0x77);
        assert_eq!(machine.bus.mem[0x2001], 0x77);
    }

    #[test]
    fn undecoded_ports_halt_the_machine() {
        let mut machine = machine_with(&[0xd3, 0x07]); // OUT 7
        let err = machine.run_instructions(1, &mut NullTracer).unwrap_err();
        assert!(matches!(err, Halt::UnknownOutPort { port: 7, .. }));

        let mut machine = machine_with(&[0xdb, 0x00]); // IN 0
        let err = machine.run_instructions(1, &mut NullTracer).unwrap_err();
        assert!(matches!(err, Halt::UnknownInPort { port: 0, .. }));
    }

    #[test]
    fn watchdog_and_harness_ports_are_ignored() {
        let mut machine = machine_with(&[0x3e, 0x55, 0xd3, 0x06, 0xd3, 0x01]);
        machine.run_instructions(3, &mut NullTracer).unwrap();
        assert_eq!(machine.outputs(), (0, 0));
    }

    #[test]
    fn sound_latches_mirror_the_last_write() {
        let mut machine = machine_with(&[
            0x3e, 0x0a, 0xd3, 0x03, // OUT 3,$0A
            0x3e, 0x11, 0xd3, 0x05, // OUT 5,$11
        ]);
        machine.run_instructions(4, &mut NullTracer).unwrap();
        assert_eq!(machine.outputs(), (0x0a, 0x11));
    }

    #[test]
    fn rom_region_is_capped_on_load() {
        let image = vec![0xeeu8; 0x3000];
        let mut machine = InvadersMachine::new();
        machine.load_rom(&image);
        assert_eq!(machine.bus.mem[ROM_SIZE - 1], 0xee);
        assert_eq!(machine.bus.mem[ROM_SIZE], 0x00);
    }

    #[test]
    fn run_frame_consumes_one_frame_of_cycles() {
        let mut machine = machine_with(&[0xc3, 0x00, 0x00]); // JMP $0000
        machine.run_frame(&mut NullTracer).unwrap();
        let cycle = machine.cpu().cycle;
        assert!(cycle >= u64::from(CYCLES_PER_FRAME));
        assert!(cycle < u64::from(CYCLES_PER_FRAME) + 11);
    }

    // Scenario test against the real ROM set; needs assets/roms/invaders
    // in the workspace, so it is ignored by default. Run with:
    // `cargo test -p arcadeboy_invaders -- --ignored attract_mode`.
    #[test]
    #[ignore]
    fn attract_mode_boots_from_the_rom_set() {
        use once_cell::sync::OnceCell;
        use std::path::PathBuf;

        static ROM: OnceCell<Vec<u8>> = OnceCell::new();
        let image = ROM.get_or_init(|| {
            let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/roms/invaders");
            let mut image = Vec::new();
            for part in ["invaders.h", "invaders.g", "invaders.f", "invaders.e"] {
                let bytes = std::fs::read(dir.join(part)).expect("ROM set not present");
                assert_eq!(bytes.len(), 0x800, "{part} has the wrong size");
                image.extend_from_slice(&bytes);
            }
            image
        });

        let mut machine = InvadersMachine::new();
        machine.load_rom(image);
        machine.run_instructions(50_000, &mut NullTracer).unwrap();

        let cpu = machine.cpu();
        assert!(cpu.pc < 0x2000, "PC left the ROM: {:04X}", cpu.pc);
        assert!(
            (0x2300..0x2400).contains(&cpu.sp),
            "SP outside the stack area: {:04X}",
            cpu.sp
        );
        // Attract mode has started drawing into video RAM by now.
        assert!(machine.video_ram().iter().any(|&b| b != 0));
    }
}
