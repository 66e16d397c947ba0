//! Host implementations for the native runner.
//!
//! `ChannelHost` lives on the evaluation thread and forwards everything to the
//! viewer over a channel. `HeadlessHost` runs without a window.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use eframe::egui;
use kuromi_lang::{AssetError, AssetLoader, CommandSink, DrawCommand, Host, ImageHandle, LogSink};
use tracing::debug;

use crate::assets::{load_bmp, DecodedImage};

/// Native stack for the evaluation thread.
pub const EVAL_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Runs `job` on the named evaluation thread, which has room for the
/// deepest nesting the interpreter allows.
pub fn spawn_eval<F, T>(job: F) -> std::io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::Builder::new()
        .name("kuromi-eval".into())
        .stack_size(EVAL_STACK_SIZE)
        .spawn(job)
}

// ─── Events ───────────────────────────────────────────────────────────────────

pub enum HostEvent {
    Draw(DrawCommand),
    Image { id: u32, size: [usize; 2], rgba: Vec<u8> },
    Log(String),
    Finished(Result<(), String>),
}

/// Keys currently held in the viewer, by upper-cased name.
pub type KeyState = Arc<Mutex<HashSet<String>>>;

// ─── Assets ──────────────────────────────────────────────────────────────────

struct Assets {
    dir: PathBuf,
    next_id: u32,
}

impl Assets {
    fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf(), next_id: 0 }
    }

    fn load(&mut self, path: &str) -> Result<(ImageHandle, DecodedImage), AssetError> {
        let decoded = load_bmp(&self.dir.join(path))?;
        self.next_id += 1;
        let handle = ImageHandle {
            id: self.next_id,
            path: path.to_string(),
            width: decoded.width,
            height: decoded.height,
        };
        Ok((handle, decoded))
    }

    fn sound(&self, path: &str) -> Result<(), AssetError> {
        if !self.dir.join(path).exists() {
            return Err(AssetError::NotFound { path: path.to_string() });
        }
        Err(AssetError::Unsupported(format!("no audio output for `{path}`")))
    }
}

// ─── Windowed ────────────────────────────────────────────────────────────────

pub struct ChannelHost {
    tx: Sender<HostEvent>,
    keys: KeyState,
    ctx: egui::Context,
    assets: Assets,
}

impl ChannelHost {
    pub fn new(tx: Sender<HostEvent>, keys: KeyState, ctx: egui::Context, asset_dir: &Path) -> Self {
        Self { tx, keys, ctx, assets: Assets::new(asset_dir) }
    }

    pub fn finish(&self, result: Result<(), String>) {
        self.send(HostEvent::Finished(result));
    }

    fn send(&self, event: HostEvent) {
        // the viewer may already be closed
        if self.tx.send(event).is_ok() {
            self.ctx.request_repaint();
        }
    }
}

impl CommandSink for ChannelHost {
    fn push(&mut self, cmd: DrawCommand) {
        self.send(HostEvent::Draw(cmd));
    }
}

impl AssetLoader for ChannelHost {
    fn load_image(&mut self, path: &str) -> Result<ImageHandle, AssetError> {
        let (handle, decoded) = self.assets.load(path)?;
        self.send(HostEvent::Image {
            id: handle.id,
            size: [decoded.width as usize, decoded.height as usize],
            rgba: decoded.rgba,
        });
        Ok(handle)
    }

    fn play_sound(&mut self, path: &str) -> Result<(), AssetError> {
        self.assets.sound(path)
    }
}

impl LogSink for ChannelHost {
    fn log(&mut self, line: &str) {
        println!("{line}");
        self.send(HostEvent::Log(line.to_string()));
    }
}

impl Host for ChannelHost {
    fn is_key_pressed(&self, key: &str) -> bool {
        self.keys.lock().map(|keys| keys.contains(key)).unwrap_or(false)
    }
}

// ─── Headless ────────────────────────────────────────────────────────────────

/// Prints output, loads real images and never sleeps.
pub struct HeadlessHost {
    pub commands: Vec<DrawCommand>,
    assets: Assets,
}

impl HeadlessHost {
    pub fn new(asset_dir: &Path) -> Self {
        Self { commands: Vec::new(), assets: Assets::new(asset_dir) }
    }
}

impl CommandSink for HeadlessHost {
    fn push(&mut self, cmd: DrawCommand) {
        debug!(primitive = cmd.primitive(), "draw");
        self.commands.push(cmd);
    }
}

impl AssetLoader for HeadlessHost {
    fn load_image(&mut self, path: &str) -> Result<ImageHandle, AssetError> {
        self.assets.load(path).map(|(handle, _)| handle)
    }

    fn play_sound(&mut self, path: &str) -> Result<(), AssetError> {
        self.assets.sound(path)
    }
}

impl LogSink for HeadlessHost {
    fn log(&mut self, line: &str) {
        println!("{line}");
    }
}

impl Host for HeadlessHost {
    fn wait(&mut self, duration: Duration) {
        debug!(?duration, "wait skipped");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kuromi_lang::{compile, RunConfig};

    #[test]
    fn headless_records_and_skips_waits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prog = compile("game 10 10 { draw rect 0 0 1 1 \"red\"\nwait 100000 }").expect("compile");
        let mut host = HeadlessHost::new(dir.path());
        kuromi_lang::run(&prog, &mut host, &RunConfig::default()).expect("run");
        let names: Vec<_> = host.commands.iter().map(DrawCommand::primitive).collect();
        assert_eq!(names, vec!["__clear", "__fillRect"]);
    }

    #[test]
    fn missing_image_is_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prog = compile("load hero \"hero.bmp\"\ndraw rect 0 0 1 1 \"red\"").expect("compile");
        let mut host = HeadlessHost::new(dir.path());
        kuromi_lang::run(&prog, &mut host, &RunConfig::default()).expect("run");
        assert_eq!(host.commands.len(), 1);
    }

    #[test]
    fn sound_reports_missing_then_unsupported() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("jump.wav"), b"RIFF").expect("write");
        let assets = Assets::new(dir.path());
        assert!(matches!(assets.sound("nope.wav"), Err(AssetError::NotFound { .. })));
        assert!(matches!(assets.sound("jump.wav"), Err(AssetError::Unsupported(_))));
    }

    #[test]
    fn channel_host_forwards_draws_and_logs() {
        let (tx, rx) = std::sync::mpsc::channel();
        let dir = tempfile::tempdir().expect("tempdir");
        let keys: KeyState = Arc::new(Mutex::new(HashSet::from(["SPACE".to_string()])));
        let mut host = ChannelHost::new(tx, keys, egui::Context::default(), dir.path());
        let prog = compile("if isKeyPressed(\"space\") { print \"jump\" }\ndraw circle 1 2 3 \"blue\"")
            .expect("compile");
        kuromi_lang::run(&prog, &mut host, &RunConfig::default()).expect("run");
        host.finish(Ok(()));

        let events: Vec<HostEvent> = rx.try_iter().collect();
        assert!(matches!(&events[0], HostEvent::Log(line) if line == "jump"));
        assert!(matches!(&events[1], HostEvent::Draw(DrawCommand::FillCircle { .. })));
        assert!(matches!(&events[2], HostEvent::Finished(Ok(()))));
    }
}
