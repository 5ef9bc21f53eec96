//! Discrete sound effects driven by the OUT 3 / OUT 5 latches.
//!
//! The board has no sound chip: each latch bit gates an analog circuit,
//! so the emulator plays a pre-recorded sample whenever a bit goes high.
//! Edge detection runs on the main thread between frames; decoding and
//! playback happen on a dedicated audio thread fed through a channel.

use std::fs;
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{error, warn};
use rodio::{Decoder, OutputStream, Sink};

/// The nine analog circuits of the cabinet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SoundEffect {
    Ufo,
    Shot,
    PlayerDies,
    InvaderDies,
    ExtraLife,
    FleetStep1,
    FleetStep2,
    FleetStep3,
    FleetStep4,
    UfoHit,
}

impl SoundEffect {
    /// Sample file for this circuit, relative to the workspace root.
    fn sample_path(self) -> &'static str {
        match self {
            SoundEffect::Ufo => "assets/sounds/ufo_lowpitch.wav",
            SoundEffect::Shot => "assets/sounds/shoot.wav",
            SoundEffect::PlayerDies => "assets/sounds/explosion.wav",
            SoundEffect::InvaderDies => "assets/sounds/invaderkilled.wav",
            SoundEffect::ExtraLife => "assets/sounds/extendedplay.wav",
            SoundEffect::FleetStep1 => "assets/sounds/fastinvader1.wav",
            SoundEffect::FleetStep2 => "assets/sounds/fastinvader2.wav",
            SoundEffect::FleetStep3 => "assets/sounds/fastinvader3.wav",
            SoundEffect::FleetStep4 => "assets/sounds/fastinvader4.wav",
            SoundEffect::UfoHit => "assets/sounds/ufo_highpitch.wav",
        }
    }

    fn index(self) -> usize {
        match self {
            SoundEffect::Ufo => 0,
            SoundEffect::Shot => 1,
            SoundEffect::PlayerDies => 2,
            SoundEffect::InvaderDies => 3,
            SoundEffect::ExtraLife => 4,
            SoundEffect::FleetStep1 => 5,
            SoundEffect::FleetStep2 => 6,
            SoundEffect::FleetStep3 => 7,
            SoundEffect::FleetStep4 => 8,
            SoundEffect::UfoHit => 9,
        }
    }
}

const EFFECT_COUNT: usize = 10;

/// Bits 0-4 of OUT 3, in bit order.
const PORT3_EFFECTS: [SoundEffect; 5] = [
    SoundEffect::Ufo,
    SoundEffect::Shot,
    SoundEffect::PlayerDies,
    SoundEffect::InvaderDies,
    SoundEffect::ExtraLife,
];

/// Bits 0-4 of OUT 5, in bit order.
const PORT5_EFFECTS: [SoundEffect; 5] = [
    SoundEffect::FleetStep1,
    SoundEffect::FleetStep2,
    SoundEffect::FleetStep3,
    SoundEffect::FleetStep4,
    SoundEffect::UfoHit,
];

/// Compares the sound latches against their previous values and reports
/// each bit that went 0 to 1. Pure state machine, no audio dependency.
#[derive(Default)]
pub struct EdgeDetector {
    prev3: u8,
    prev5: u8,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the latches captured after a batch of steps, invoking `play`
    /// once per rising bit, then remember the values for the next scan.
    pub fn scan(&mut self, out3: u8, out5: u8, mut play: impl FnMut(SoundEffect)) {
        let rising3 = out3 & !self.prev3;
        let rising5 = out5 & !self.prev5;

        for (bit, effect) in PORT3_EFFECTS.into_iter().enumerate() {
            if rising3 & (1 << bit) != 0 {
                play(effect);
            }
        }
        for (bit, effect) in PORT5_EFFECTS.into_iter().enumerate() {
            if rising5 & (1 << bit) != 0 {
                play(effect);
            }
        }

        self.prev3 = out3;
        self.prev5 = out5;
    }
}

struct AudioThread {
    receiver: Receiver<SoundEffect>,
    samples: [Option<Vec<u8>>; EFFECT_COUNT],
}

impl AudioThread {
    fn new(receiver: Receiver<SoundEffect>) -> Option<Self> {
        let mut samples: [Option<Vec<u8>>; EFFECT_COUNT] = Default::default();
        let mut loaded = 0usize;

        for effect in PORT3_EFFECTS.into_iter().chain(PORT5_EFFECTS) {
            match fs::read(effect.sample_path()) {
                Ok(bytes) => {
                    samples[effect.index()] = Some(bytes);
                    loaded += 1;
                }
                Err(e) => {
                    warn!("no sample for {:?} at {}: {e}", effect, effect.sample_path());
                }
            }
        }

        if loaded == 0 {
            warn!("no sound samples found, running silent");
            return None;
        }
        Some(Self { receiver, samples })
    }

    fn run(self) {
        // The stream must outlive every sink playing into it.
        let Ok((_stream, handle)) = OutputStream::try_default() else {
            error!("no audio output device, running silent");
            return;
        };

        while let Ok(effect) = self.receiver.recv() {
            let Some(bytes) = &self.samples[effect.index()] else {
                continue;
            };
            let source = match Decoder::new(Cursor::new(bytes.clone())) {
                Ok(source) => source,
                Err(e) => {
                    error!("failed to decode sample for {effect:?}: {e}");
                    continue;
                }
            };
            // One detached sink per trigger so effects overlap naturally.
            match Sink::try_new(&handle) {
                Ok(sink) => {
                    sink.append(source);
                    sink.detach();
                }
                Err(e) => error!("failed to open audio sink: {e}"),
            }
        }
    }
}

/// Main-thread handle: detects latch edges each frame and queues the
/// corresponding samples for the audio thread.
pub struct SoundPlayer {
    sender: Sender<SoundEffect>,
    edges: EdgeDetector,
}

impl SoundPlayer {
    /// Start the audio thread. Returns `None` when no samples can be
    /// loaded; the emulator then runs without sound.
    pub fn new() -> Option<Self> {
        let (sender, receiver) = mpsc::channel();
        let audio = AudioThread::new(receiver)?;

        if let Err(e) = thread::Builder::new()
            .name("invaders_sound".into())
            .spawn(move || audio.run())
        {
            error!("failed to spawn audio thread: {e}");
            return None;
        }

        Some(Self {
            sender,
            edges: EdgeDetector::new(),
        })
    }

    /// Feed the latch values captured after this frame's batch of steps.
    pub fn update(&mut self, out3: u8, out5: u8) {
        let sender = &self.sender;
        self.edges.scan(out3, out5, |effect| {
            // If the audio thread is gone we simply stop queueing.
            let _ = sender.send(effect);
        });
    }
}
