use crate::key::Key;

/// The seam between a machine wrapper and a frontend.
///
/// The frontend owns the window and the event loop; the app owns the
/// emulation. Once per display frame the frontend hands the app an RGB24
/// buffer of `width() * height() * 3` bytes, row-major from the top-left
/// pixel, and the app paints the machine's screen into it. For the Space
/// Invaders cabinet that is the rotated 224x256 monochrome tube with its
/// colour gels applied.
pub trait App {
    /// One-time setup after the window exists; the invaders app brings
    /// up its audio thread here.
    fn init(&mut self);

    /// Advance the machine by one display frame and repaint `screen`.
    /// Called at the frontend's frame rate, 60 Hz for the arcade board.
    fn update(&mut self, screen: &mut [u8]);

    /// A logical key changed state. Mapping keys onto the machine's
    /// buttons is the app's business; the frontend only translates its
    /// native keycodes into [`Key`]s.
    fn handle_key_event(&mut self, key: Key, is_down: bool);

    /// True once the app wants the frontend to wind down, either on user
    /// request or because the emulated machine halted.
    fn should_exit(&self) -> bool;

    /// Teardown hook, called once before the window closes.
    fn exit(&mut self);

    /// Native screen size in pixels, before scaling.
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Integer upscaling factor for the window. Arcade-era resolutions
    /// are small enough that apps usually override this.
    fn scale(&self) -> u32 {
        1
    }

    /// Window title.
    fn title(&self) -> &str;
}
