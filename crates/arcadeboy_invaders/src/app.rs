use crate::machine::{Button, InvadersMachine};
use crate::sound::SoundPlayer;
use crate::trace::NullTracer;
use crate::{SCREEN_HEIGHT, SCREEN_SCALE, SCREEN_WIDTH};
use arcadeboy_common::app::App;
use arcadeboy_common::color::Color;
use arcadeboy_common::key::Key;

/// Frontend wrapper that runs the machine one frame per display frame.
///
/// A halt (unknown opcode or undecoded port) is logged once and freezes
/// the video; the frontend then shuts down normally.
#[derive(Default)]
pub struct InvadersApp {
    pub machine: InvadersMachine,
    sound: Option<SoundPlayer>,
    paused: bool,
    halted: bool,
}

impl InvadersApp {
    pub fn new(machine: InvadersMachine) -> Self {
        Self {
            machine,
            ..Self::default()
        }
    }
}

impl App for InvadersApp {
    fn init(&mut self) {
        log::info!("Space Invaders init");
        if self.sound.is_none() {
            self.sound = SoundPlayer::new();
        }
    }

    fn update(&mut self, screen: &mut [u8]) {
        if !self.paused && !self.halted {
            if let Err(halt) = self.machine.run_frame(&mut NullTracer) {
                log::error!("emulation stopped: {halt}");
                self.halted = true;
            }

            if let Some(sound) = &mut self.sound {
                let (out3, out5) = self.machine.outputs();
                sound.update(out3, out5);
            }
        }

        render_video(self.machine.video_ram(), screen);
    }

    fn handle_key_event(&mut self, key: Key, is_down: bool) {
        if is_down && key == Key::P {
            self.paused = !self.paused;
            return;
        }

        let button = match key {
            Key::C => Button::Coin,
            Key::Num1 => Button::P1Start,
            Key::Num2 => Button::P2Start,
            Key::A | Key::Left => Button::P1Left,
            Key::D | Key::Right => Button::P1Right,
            Key::S | Key::Space => Button::P1Fire,
            _ => return,
        };
        self.machine.set_button(button, is_down);
    }

    fn should_exit(&self) -> bool {
        self.halted
    }

    fn exit(&mut self) {
        log::info!("Space Invaders exit");
    }

    fn width(&self) -> u32 {
        SCREEN_WIDTH as u32
    }

    fn height(&self) -> u32 {
        SCREEN_HEIGHT as u32
    }

    fn scale(&self) -> u32 {
        SCREEN_SCALE
    }

    fn title(&self) -> &str {
        "arcadeboy Space Invaders"
    }
}

/// The cabinet's colour gels, by display row: red across the UFO strip
/// near the top, green over the player's strip at the bottom.
fn gel_color(y: usize) -> Color {
    if (36..56).contains(&y) {
        Color::RED
    } else if y >= 176 {
        Color::GREEN
    } else {
        Color::WHITE
    }
}

/// Expand the 1-bit video RAM into RGB24.
///
/// The tube is mounted rotated 90 degrees: VRAM walks display columns
/// left to right, and each byte covers eight pixels running up the
/// screen, bit 0 lowest.
fn render_video(vram: &[u8], screen: &mut [u8]) {
    debug_assert_eq!(vram.len(), SCREEN_WIDTH * SCREEN_HEIGHT / 8);
    debug_assert_eq!(screen.len(), SCREEN_WIDTH * SCREEN_HEIGHT * 3);

    for (k, &byte) in vram.iter().enumerate() {
        let x = k / (SCREEN_HEIGHT / 8);
        let y_base = (k % (SCREEN_HEIGHT / 8)) * 8;

        for bit in 0..8 {
            let y = SCREEN_HEIGHT - 1 - (y_base + bit);
            let color = if byte & (1 << bit) != 0 {
                gel_color(y)
            } else {
                Color::BLACK
            };

            let idx = (y * SCREEN_WIDTH + x) * 3;
            let (r, g, b) = color.rgb();
            screen[idx] = r;
            screen[idx + 1] = g;
            screen[idx + 2] = b;
        }
    }
}
