//! Collaborators the evaluator drives: drawing surface, asset loader, log sink.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::AssetError;
use crate::runtime::value::ImageHandle;
use crate::syntax::ast::Align;

// ─── Palette ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    White,
    Black,
    Gray,
}

impl Color {
    pub const ALL: [Color; 9] = [
        Color::Red, Color::Green, Color::Blue, Color::Yellow, Color::Cyan,
        Color::Magenta, Color::White, Color::Black, Color::Gray,
    ];

    /// Case-insensitive palette lookup. Anything unrecognised is black.
    pub fn from_name(name: &str) -> Color {
        match name.to_lowercase().as_str() {
            "red"            => Color::Red,
            "green"          => Color::Green,
            "blue"           => Color::Blue,
            "yellow"         => Color::Yellow,
            "cyan"           => Color::Cyan,
            "magenta"        => Color::Magenta,
            "white"          => Color::White,
            "gray" | "grey"  => Color::Gray,
            _                => Color::Black,
        }
    }

    /// CSS color keyword.
    pub fn name(&self) -> &'static str {
        match self {
            Color::Red     => "red",
            Color::Green   => "green",
            Color::Blue    => "blue",
            Color::Yellow  => "yellow",
            Color::Cyan    => "cyan",
            Color::Magenta => "magenta",
            Color::White   => "white",
            Color::Black   => "black",
            Color::Gray    => "gray",
        }
    }

    /// sRGB value of the CSS keyword, so a canvas and a native surface agree.
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Color::Red     => (255, 0, 0),
            Color::Green   => (0, 128, 0),
            Color::Blue    => (0, 0, 255),
            Color::Yellow  => (255, 255, 0),
            Color::Cyan    => (0, 255, 255),
            Color::Magenta => (255, 0, 255),
            Color::White   => (255, 255, 255),
            Color::Black   => (0, 0, 0),
            Color::Gray    => (128, 128, 128),
        }
    }
}

// ─── Collaborator traits ──────────────────────────────────────────────────────

/// 2-D drawing surface. Single writer; coordinates are pixels, y down.
pub trait Surface {
    /// Fill the whole surface with black.
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color);
    fn fill_circle(&mut self, x: f64, y: f64, r: f64, color: Color);
    /// Two pixels wide.
    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Color);
    #[allow(clippy::too_many_arguments)]
    fn fill_triangle(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64, color: Color);
    /// White 16px sans-serif; `y` is the baseline.
    fn draw_text(&mut self, text: &str, x: f64, y: f64, align: Align);
    fn draw_image(&mut self, image: &ImageHandle, x: f64, y: f64);
}

pub trait AssetLoader {
    fn load_image(&mut self, path: &str) -> Result<ImageHandle, AssetError>;
    /// Fire and forget.
    fn play_sound(&mut self, path: &str) -> Result<(), AssetError>;
}

/// Receives `print` output.
pub trait LogSink {
    fn log(&mut self, line: &str);
}

/// Everything one interpreter run talks to.
pub trait Host: Surface + AssetLoader + LogSink {
    /// `key` is upper-case: `"A"`, `"SPACE"`, `"ARROWLEFT"`.
    fn is_key_pressed(&self, _key: &str) -> bool {
        false
    }

    /// Blocks the calling thread.
    fn wait(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ─── Recorded draw calls ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    FillRect { x: f64, y: f64, w: f64, h: f64, color: Color },
    FillCircle { x: f64, y: f64, r: f64, color: Color },
    Line { x1: f64, y1: f64, x2: f64, y2: f64, color: Color },
    FillTriangle { points: [(f64, f64); 3], color: Color },
    Text { text: String, x: f64, y: f64, align: Align },
    Image { image: ImageHandle, x: f64, y: f64 },
}

impl DrawCommand {
    /// Name of the matching primitive in the generated script preamble.
    pub fn primitive(&self) -> &'static str {
        match self {
            DrawCommand::Clear             => "__clear",
            DrawCommand::FillRect { .. }   => "__fillRect",
            DrawCommand::FillCircle { .. } => "__fillCircle",
            DrawCommand::Line { .. }       => "__drawLine",
            DrawCommand::FillTriangle { .. } => "__fillTriangle",
            DrawCommand::Text { .. }       => "__drawText",
            DrawCommand::Image { .. }      => "__drawImage",
        }
    }

    /// Replays this command against a surface.
    pub fn apply(&self, surface: &mut dyn Surface) {
        match self {
            DrawCommand::Clear => surface.clear(),
            DrawCommand::FillRect { x, y, w, h, color } => surface.fill_rect(*x, *y, *w, *h, *color),
            DrawCommand::FillCircle { x, y, r, color } => surface.fill_circle(*x, *y, *r, *color),
            DrawCommand::Line { x1, y1, x2, y2, color } => surface.draw_line(*x1, *y1, *x2, *y2, *color),
            DrawCommand::FillTriangle { points: [a, b, c], color } => {
                surface.fill_triangle(a.0, a.1, b.0, b.1, c.0, c.1, *color)
            }
            DrawCommand::Text { text, x, y, align } => surface.draw_text(text, *x, *y, *align),
            DrawCommand::Image { image, x, y } => surface.draw_image(image, *x, *y),
        }
    }
}

/// Forwards every surface call as a [`DrawCommand`].
pub trait CommandSink {
    fn push(&mut self, cmd: DrawCommand);
}

impl<T: CommandSink> Surface for T {
    fn clear(&mut self) {
        self.push(DrawCommand::Clear);
    }
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color) {
        self.push(DrawCommand::FillRect { x, y, w, h, color });
    }
    fn fill_circle(&mut self, x: f64, y: f64, r: f64, color: Color) {
        self.push(DrawCommand::FillCircle { x, y, r, color });
    }
    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Color) {
        self.push(DrawCommand::Line { x1, y1, x2, y2, color });
    }
    fn fill_triangle(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64, color: Color) {
        self.push(DrawCommand::FillTriangle { points: [(x1, y1), (x2, y2), (x3, y3)], color });
    }
    fn draw_text(&mut self, text: &str, x: f64, y: f64, align: Align) {
        self.push(DrawCommand::Text { text: text.to_string(), x, y, align });
    }
    fn draw_image(&mut self, image: &ImageHandle, x: f64, y: f64) {
        self.push(DrawCommand::Image { image: image.clone(), x, y });
    }
}

// ─── Recorder ─────────────────────────────────────────────────────────────────

/// In-memory host. Records draw calls, output lines and waits; images load
/// without touching disk unless their path was marked missing.
#[derive(Debug, Default)]
pub struct Recorder {
    pub commands: Vec<DrawCommand>,
    pub output: Vec<String>,
    pub sounds: Vec<String>,
    pub waited: Duration,
    pub keys: HashSet<String>,
    missing: HashSet<String>,
    next_image: u32,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.keys.insert(key.to_uppercase());
        self
    }

    /// Makes `load_image(path)` fail.
    pub fn with_missing_asset(mut self, path: &str) -> Self {
        self.missing.insert(path.to_string());
        self
    }

    pub fn primitives(&self) -> Vec<&'static str> {
        self.commands.iter().map(DrawCommand::primitive).collect()
    }
}

impl CommandSink for Recorder {
    fn push(&mut self, cmd: DrawCommand) {
        self.commands.push(cmd);
    }
}

impl AssetLoader for Recorder {
    fn load_image(&mut self, path: &str) -> Result<ImageHandle, AssetError> {
        if self.missing.contains(path) {
            return Err(AssetError::NotFound { path: path.to_string() });
        }
        self.next_image += 1;
        Ok(ImageHandle { id: self.next_image, path: path.to_string(), width: 0, height: 0 })
    }

    fn play_sound(&mut self, path: &str) -> Result<(), AssetError> {
        self.sounds.push(path.to_string());
        Ok(())
    }
}

impl LogSink for Recorder {
    fn log(&mut self, line: &str) {
        self.output.push(line.to_string());
    }
}

impl Host for Recorder {
    fn is_key_pressed(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn wait(&mut self, duration: Duration) {
        self.waited += duration;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_lookup() {
        assert_eq!(Color::from_name("red"), Color::Red);
        assert_eq!(Color::from_name("MAGENTA"), Color::Magenta);
        assert_eq!(Color::from_name("grey"), Color::Gray);
        assert_eq!(Color::from_name("chartreuse"), Color::Black);
        assert_eq!(Color::from_name(""), Color::Black);
    }

    #[test]
    fn palette_names_round_trip() {
        for color in Color::ALL {
            assert_eq!(Color::from_name(color.name()), color);
        }
    }

    #[test]
    fn recorder_records_in_order() {
        let mut r = Recorder::new();
        r.clear();
        r.fill_circle(1.0, 2.0, 3.0, Color::Red);
        r.draw_text("hi", 0.0, 0.0, Align::Center);
        assert_eq!(r.primitives(), vec!["__clear", "__fillCircle", "__drawText"]);
    }

    #[test]
    fn recorder_missing_asset() {
        let mut r = Recorder::new().with_missing_asset("gone.bmp");
        assert!(r.load_image("gone.bmp").is_err());
        let a = r.load_image("a.bmp").expect("load");
        let b = r.load_image("b.bmp").expect("load");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn replay_onto_another_surface() {
        let mut source = Recorder::new();
        source.fill_triangle(0.0, 0.0, 1.0, 0.0, 0.0, 1.0, Color::Blue);
        source.draw_line(0.0, 0.0, 5.0, 5.0, Color::White);
        let mut copy = Recorder::new();
        for cmd in &source.commands {
            cmd.apply(&mut copy);
        }
        assert_eq!(source.commands, copy.commands);
    }
}
