use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, RichText, Stroke};
use kuromi_lang::{Align, Color, DrawCommand, Program, RunConfig};
use tracing::{error, info};

use crate::host::{spawn_eval, ChannelHost, HostEvent, KeyState};

const DEFAULT_SIZE: (f64, f64) = (800.0, 600.0);

fn color32(c: Color) -> Color32 {
    let (r, g, b) = c.rgb();
    Color32::from_rgb(r, g, b)
}

fn mono_row(ui: &mut egui::Ui, label: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(label).monospace().color(Color32::from_rgb(140, 140, 140)));
        ui.label(RichText::new(value).monospace().color(Color32::from_rgb(210, 210, 170)));
    });
}

// ─── Launch ───────────────────────────────────────────────────────────────────

pub struct Launch {
    pub file: PathBuf,
    pub program: Program,
    /// Diagnostics already reported for `program`.
    pub errors: Vec<String>,
    pub asset_dir: PathBuf,
    pub config: RunConfig,
}

pub fn open(mut launch: Launch) -> eframe::Result {
    let (w, h) = launch.program.scene().unwrap_or(DEFAULT_SIZE);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([(w as f32 + 40.0).max(480.0), h as f32 + 120.0]),
        ..Default::default()
    };
    let title = format!("Kuromi: {}", launch.file.display());
    let ast = format!("{:#?}", launch.program);
    let errors = std::mem::take(&mut launch.errors);
    eframe::run_native(&title, options, Box::new(move |cc| {
        Ok(Box::new(Viewer::start(cc.egui_ctx.clone(), launch, (w, h), errors, ast)))
    }))
}

// ─── App state ────────────────────────────────────────────────────────────────

#[derive(PartialEq)]
enum Tab { Canvas, Output, Errors, Ast }

struct Viewer {
    rx: Receiver<HostEvent>,
    keys: KeyState,
    size: (f64, f64),
    display: Vec<DrawCommand>,
    textures: HashMap<u32, egui::TextureHandle>,
    output: Vec<String>,
    errors: Vec<String>,
    ast: String,
    status: Option<Result<(), String>>,
    tab: Tab,
}

impl Viewer {
    fn start(ctx: egui::Context, launch: Launch, size: (f64, f64), errors: Vec<String>, ast: String) -> Self {
        let (tx, rx) = mpsc::channel();
        let keys: KeyState = Arc::new(Mutex::new(HashSet::new()));
        let mut host = ChannelHost::new(tx, keys.clone(), ctx, &launch.asset_dir);
        let Launch { program, config, .. } = launch;

        let spawned = spawn_eval(move || {
            let result = kuromi_lang::run(&program, &mut host, &config).map_err(|e| e.to_string());
            match &result {
                Ok(()) => info!("program finished"),
                Err(e) => error!("{e}"),
            }
            host.finish(result);
        });

        let status = match spawned {
            Ok(_) => None,
            Err(e) => Some(Err(format!("cannot start evaluation thread: {e}"))),
        };

        let tab = if errors.is_empty() { Tab::Canvas } else { Tab::Errors };
        Self {
            rx,
            keys,
            size,
            display: Vec::new(),
            textures: HashMap::new(),
            output: Vec::new(),
            errors,
            ast,
            status,
            tab,
        }
    }

    fn drain(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                HostEvent::Draw(DrawCommand::Clear) => self.display.clear(),
                HostEvent::Draw(cmd) => self.display.push(cmd),
                HostEvent::Image { id, size, rgba } => {
                    let image = egui::ColorImage::from_rgba_unmultiplied(size, &rgba);
                    let texture = ctx.load_texture(format!("image-{id}"), image, egui::TextureOptions::NEAREST);
                    self.textures.insert(id, texture);
                }
                HostEvent::Log(line) => self.output.push(line),
                HostEvent::Finished(result) => {
                    if let Err(e) = &result {
                        self.errors.push(e.clone());
                    }
                    self.status = Some(result);
                }
            }
        }
    }

    fn sync_keys(&self, ctx: &egui::Context) {
        let down: HashSet<String> = ctx.input(|i| {
            i.keys_down.iter().map(|k| k.name().to_uppercase()).collect()
        });
        if let Ok(mut keys) = self.keys.lock() {
            *keys = down;
        }
    }
}

// ─── UI ───────────────────────────────────────────────────────────────────────

impl eframe::App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain(ctx);
        self.sync_keys(ctx);
        if self.status.is_none() {
            // keep polling key state while the program may be waiting on it
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            // ── Status bar ────────────────────────────────────────────────────
            ui.horizontal(|ui| {
                match &self.status {
                    None => ui.label(RichText::new("●  running").color(Color32::from_rgb(120, 180, 255))),
                    Some(Ok(())) => ui.label(RichText::new("✓  finished").color(Color32::from_rgb(80, 200, 80))),
                    Some(Err(_)) => ui.label(RichText::new("✗  stopped").color(Color32::from_rgb(220, 80, 80))),
                };
            });

            ui.separator();

            // ── Tab bar ───────────────────────────────────────────────────────
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.tab, Tab::Canvas, "Canvas");
                ui.selectable_value(&mut self.tab, Tab::Output, "Output");
                let err_label = if self.errors.is_empty() {
                    "Errors".into()
                } else {
                    format!("Errors ({})", self.errors.len())
                };
                ui.selectable_value(&mut self.tab, Tab::Errors, err_label);
                ui.selectable_value(&mut self.tab, Tab::Ast, "AST");
            });

            ui.separator();

            egui::ScrollArea::both().show(ui, |ui| {
                match self.tab {
                    Tab::Canvas => self.show_canvas(ui),
                    Tab::Output => self.show_output(ui),
                    Tab::Errors => self.show_errors(ui),
                    Tab::Ast    => self.show_ast(ui),
                }
            });
        });
    }
}

impl Viewer {
    fn show_canvas(&self, ui: &mut egui::Ui) {
        let desired = egui::vec2(self.size.0 as f32, self.size.1 as f32);
        let (canvas_rect, _response) = ui.allocate_exact_size(desired, egui::Sense::hover());
        let painter = ui.painter_at(canvas_rect);
        painter.rect_filled(canvas_rect, 0.0, Color32::BLACK);

        let origin = canvas_rect.min;
        let at = |x: f64, y: f64| Pos2::new(origin.x + x as f32, origin.y + y as f32);

        for cmd in &self.display {
            match cmd {
                DrawCommand::Clear => {}
                DrawCommand::FillRect { x, y, w, h, color } => {
                    painter.rect_filled(Rect::from_two_pos(at(*x, *y), at(x + w, y + h)), 0.0, color32(*color));
                }
                DrawCommand::FillCircle { x, y, r, color } => {
                    painter.circle_filled(at(*x, *y), r.max(0.0) as f32, color32(*color));
                }
                DrawCommand::Line { x1, y1, x2, y2, color } => {
                    painter.line_segment([at(*x1, *y1), at(*x2, *y2)], Stroke::new(2.0, color32(*color)));
                }
                DrawCommand::FillTriangle { points, color } => {
                    let pts = points.iter().map(|(x, y)| at(*x, *y)).collect();
                    painter.add(egui::Shape::convex_polygon(pts, color32(*color), Stroke::NONE));
                }
                DrawCommand::Text { text, x, y, align } => {
                    let anchor = match align {
                        Align::Left => Align2::LEFT_BOTTOM,
                        Align::Center => Align2::CENTER_BOTTOM,
                        Align::Right => Align2::RIGHT_BOTTOM,
                    };
                    painter.text(at(*x, *y), anchor, text, FontId::proportional(16.0), Color32::WHITE);
                }
                DrawCommand::Image { image, x, y } => {
                    let Some(texture) = self.textures.get(&image.id) else { continue };
                    let [w, h] = texture.size();
                    let rect = Rect::from_min_size(at(*x, *y), egui::vec2(w as f32, h as f32));
                    let uv = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0));
                    painter.image(texture.id(), rect, uv, Color32::WHITE);
                }
            }
        }
    }

    fn show_output(&self, ui: &mut egui::Ui) {
        if self.output.is_empty() {
            ui.label(RichText::new("Nothing printed.").color(Color32::GRAY));
            return;
        }
        for (i, line) in self.output.iter().enumerate() {
            mono_row(ui, &format!("[{}]", i + 1), line);
        }
    }

    fn show_errors(&self, ui: &mut egui::Ui) {
        if self.errors.is_empty() {
            ui.label(RichText::new("No errors.").color(Color32::GRAY));
            return;
        }
        for msg in &self.errors {
            ui.label(RichText::new(msg).monospace().color(Color32::from_rgb(220, 80, 80)));
        }
    }

    fn show_ast(&self, ui: &mut egui::Ui) {
        ui.add(
            egui::TextEdit::multiline(&mut self.ast.clone())
                .font(egui::TextStyle::Monospace)
                .desired_width(f32::INFINITY)
                .interactive(false),
        );
    }
}
