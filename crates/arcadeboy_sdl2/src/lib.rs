//! SDL2 frontend: window, texture streaming and keyboard events for any
//! [`App`] implementation.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use typed_builder::TypedBuilder;

pub use arcadeboy_common::app::App;
use arcadeboy_common::key::Key;
pub use sdl2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    RGB24,
}

#[derive(TypedBuilder)]
pub struct SdlInitInfo {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub title: String,
    #[builder(default = PixelFormat::RGB24)]
    pub pixel_format: PixelFormat,
    /// Frames per wall second; the loop sleeps out the remainder of each
    /// frame on top of vsync so machines run at their native rate.
    #[builder(default = 60)]
    pub frame_rate: u32,
}

pub struct SdlContext;

impl SdlContext {
    /// Run the app until it asks to exit or the window is closed.
    pub fn run(info: SdlInitInfo, mut app: impl App) -> Result<()> {
        let SdlInitInfo {
            width,
            height,
            scale,
            title,
            pixel_format,
            frame_rate,
        } = info;

        let sdl = sdl2::init().map_err(|e| anyhow!(e))?;
        let video = sdl.video().map_err(|e| anyhow!(e))?;
        let window = video
            .window(&title, width * scale, height * scale)
            .position_centered()
            .build()?;
        let mut canvas = window.into_canvas().present_vsync().build()?;
        canvas
            .set_scale(scale as f32, scale as f32)
            .map_err(|e| anyhow!(e))?;

        let creator = canvas.texture_creator();
        let mut texture =
            creator.create_texture_target(map_pixel_format(pixel_format), width, height)?;

        let mut event_pump = sdl.event_pump().map_err(|e| anyhow!(e))?;
        let bytes_per_pixel = map_pixel_format_size(pixel_format);
        let mut screen = vec![0u8; (width * height * bytes_per_pixel) as usize];
        let frame_budget = Duration::from_secs(1) / frame_rate;

        app.init();
        loop {
            let frame_start = Instant::now();

            if app.should_exit() {
                app.exit();
                return Ok(());
            }

            while let Some(event) = event_pump.poll_event() {
                match event {
                    Event::Quit { .. }
                    | Event::KeyDown {
                        keycode: Some(Keycode::Escape),
                        ..
                    } => {
                        app.exit();
                        return Ok(());
                    }
                    Event::KeyDown {
                        keycode: Some(keycode),
                        ..
                    } => app.handle_key_event(map_keycode(keycode), true),
                    Event::KeyUp {
                        keycode: Some(keycode),
                        ..
                    } => app.handle_key_event(map_keycode(keycode), false),
                    _ => {}
                }
            }

            app.update(&mut screen);

            texture.update(None, &screen, (width * bytes_per_pixel) as usize)?;
            canvas.copy(&texture, None, None).map_err(|e| anyhow!(e))?;
            canvas.present();

            // Vsync usually covers this; the sleep keeps the pace on
            // displays running faster than the target rate.
            if let Some(remaining) = frame_budget.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }
}

pub fn map_pixel_format(pixel_format: PixelFormat) -> PixelFormatEnum {
    match pixel_format {
        PixelFormat::RGB24 => PixelFormatEnum::RGB24,
    }
}

pub fn map_pixel_format_size(pixel_format: PixelFormat) -> u32 {
    match pixel_format {
        PixelFormat::RGB24 => 3,
    }
}

pub fn map_keycode(keycode: Keycode) -> Key {
    match keycode {
        Keycode::Num1 => Key::Num1,
        Keycode::Num2 => Key::Num2,
        Keycode::A => Key::A,
        Keycode::C => Key::C,
        Keycode::D => Key::D,
        Keycode::P => Key::P,
        Keycode::S => Key::S,
        Keycode::Space => Key::Space,
        Keycode::Left => Key::Left,
        Keycode::Right => Key::Right,
        _ => Key::None,
    }
}
