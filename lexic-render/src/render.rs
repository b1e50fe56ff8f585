use ab_glyph::{point, Font, FontRef, Glyph, PxScale, ScaleFont};
use anyhow::{ensure, Result};
use lexic_cache::{get_text, Atom};
use lexic_core::{CircleRegion, Scene};
use lexic_timing::Timer;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Rect,
    Transform,
};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const RED: [u8; 4] = [255, 0, 0, 255];

const LABEL_SIZE: f32 = 32.0;
const STIMULUS_SIZE: f32 = 48.0;
const LINE_SPACING: f32 = 48.0;
const CIRCLE_RADIUS: f32 = 50.0;
const CIRCLE_OFFSET: f32 = 100.0;

#[repr(usize)]
#[derive(Debug, Clone, Copy)]
enum Label {
    Welcome = 0,
    Instructions1 = 1,
    Instructions2 = 2,
    Instructions3 = 3,
    Instructions4 = 4,
    Correct = 5,
    Incorrect = 6,
    Farewell = 7,
    RatingPrompt = 8,
    Yay = 9,
    Nay = 10,
}

impl Label {
    const COUNT: usize = 11;

    fn texts() -> [(Label, &'static str, [u8; 4]); Label::COUNT] {
        [
            (Label::Welcome, "Welcome to this experiment!", WHITE),
            (
                Label::Instructions1,
                "In this experiment, you will see a string of letters.",
                WHITE,
            ),
            (
                Label::Instructions2,
                "If the string forms a word, press LEFT.",
                WHITE,
            ),
            (
                Label::Instructions3,
                "If the string does not form a word, press RIGHT.",
                WHITE,
            ),
            (
                Label::Instructions4,
                "(Press Enter to start the experiment!)",
                WHITE,
            ),
            (Label::Correct, "correct", GREEN),
            (Label::Incorrect, "incorrect", RED),
            (Label::Farewell, "thank you for participating", WHITE),
            (
                Label::RatingPrompt,
                "Click green if you enjoyed the experiment and red if you didn't!",
                WHITE,
            ),
            (Label::Yay, ":)", WHITE),
            (Label::Nay, ":(", WHITE),
        ]
    }
}

/// Per-frame render timings, recorded into the session timer so the final
/// frame report reflects actual drawing cost.
pub struct FrameStats {
    pub clear: Duration,
    pub scene: Duration,
    pub copy: Duration,
    pub total: Duration,
}

struct TextCache {
    font: FontRef<'static>,
    size_px: f32,
    map: HashMap<Atom, Arc<Pixmap>>,
}

impl TextCache {
    fn new(font: FontRef<'static>, size_px: f32) -> Self {
        Self {
            font,
            size_px,
            map: HashMap::new(),
        }
    }

    fn get_or_render(&mut self, atom: Atom) -> Arc<Pixmap> {
        if let Some(pm) = self.map.get(&atom) {
            return Arc::clone(pm);
        }
        let pm = Arc::new(render_text_pixmap(
            atom.as_ref(),
            self.size_px,
            &self.font,
            WHITE,
        ));
        self.map.insert(atom, Arc::clone(&pm));
        pm
    }
}

/// Rasterize one line of text into a tight transparent pixmap.
pub fn render_text_pixmap(text: &str, font_size: f32, font: &FontRef<'static>, rgba: [u8; 4]) -> Pixmap {
    let scale = PxScale::from(font_size);
    let scaled = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += scaled.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, scaled.ascent()),
        });
        pen_x += scaled.h_advance(id);
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for g in &glyphs {
        if let Some(outline) = font.outline_glyph(g.clone()) {
            let b = outline.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }
    if min_x == f32::INFINITY {
        return Pixmap::new(1, 1).expect("pixmap");
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h).expect("pixmap");

    let stride = w as usize;
    let dst = pm.pixels_mut();

    for g in &glyphs {
        if let Some(outline) = font.outline_glyph(g.clone()) {
            let b = outline.px_bounds();
            outline.draw(|x, y, cov| {
                let ix = (x as f32 + b.min.x - min_x).floor() as i32;
                let iy = (y as f32 + b.min.y - min_y).floor() as i32;
                if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                    return;
                }

                // Source premultiplied by coverage, then Porter-Duff over.
                let sa = (cov.clamp(0.0, 1.0) * rgba[3] as f32) as u32;
                if sa == 0 {
                    return;
                }
                let sr = (rgba[0] as u32 * sa + 127) / 255;
                let sg = (rgba[1] as u32 * sa + 127) / 255;
                let sb = (rgba[2] as u32 * sa + 127) / 255;

                let i = iy as usize * stride + ix as usize;
                let bg = dst[i];
                let inv = 255 - sa;
                let a = sa + (bg.alpha() as u32 * inv + 127) / 255;
                let r = (sr + (bg.red() as u32 * inv + 127) / 255).min(a);
                let g2 = (sg + (bg.green() as u32 * inv + 127) / 255).min(a);
                let b2 = (sb + (bg.blue() as u32 * inv + 127) / 255).min(a);

                if let Some(px) =
                    PremultipliedColorU8::from_rgba(r as u8, g2 as u8, b2 as u8, a as u8)
                {
                    dst[i] = px;
                }
            });
        }
    }

    pm
}

fn circle_pixmap(rgba: [u8; 4]) -> Pixmap {
    let size = (CIRCLE_RADIUS * 2.0).ceil() as u32;
    let mut pm = Pixmap::new(size, size).expect("pixmap");
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
    let mut pb = PathBuilder::new();
    pb.push_circle(CIRCLE_RADIUS, CIRCLE_RADIUS, CIRCLE_RADIUS);
    pm.fill_path(
        &pb.finish().expect("circle path"),
        &paint,
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    pm
}

fn fixation_pixmap() -> Pixmap {
    let size = 40u32;
    let mut pm = Pixmap::new(size, size).expect("pixmap");
    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color(Color::from_rgba8(255, 255, 255, 255));

    let horizontal = Rect::from_xywh(0.0, (size as f32 - 2.0) * 0.5, size as f32, 2.0).unwrap();
    pm.fill_rect(horizontal, &paint, Transform::identity(), None);
    let vertical = Rect::from_xywh((size as f32 - 2.0) * 0.5, 0.0, 2.0, size as f32).unwrap();
    pm.fill_rect(vertical, &paint, Transform::identity(), None);
    pm
}

/// Software presentation surface: rasterizes scenes into an offscreen
/// canvas and copies it to the window frame buffer on every flip.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    labels: Vec<Pixmap>,
    fixation: Pixmap,
    green_circle: Pixmap,
    red_circle: Pixmap,
    text_cache: TextCache,
    canvas: Pixmap,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: FontRef<'static>) -> Result<Self> {
        ensure!(width > 0 && height > 0, "zero-sized surface");

        let mut labels = Vec::with_capacity(Label::COUNT);
        for (_, text, color) in Label::texts() {
            labels.push(render_text_pixmap(text, LABEL_SIZE, &font, color));
        }

        let mut canvas = Pixmap::new(width, height).expect("canvas pixmap");
        canvas.fill(Color::from_rgba8(0, 0, 0, 255));

        Ok(Self {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            labels,
            fixation: fixation_pixmap(),
            green_circle: circle_pixmap(GREEN),
            red_circle: circle_pixmap(RED),
            text_cache: TextCache::new(font, STIMULUS_SIZE),
            canvas,
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width == 0 || new_height == 0 {
            return;
        }
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        self.canvas = Pixmap::new(new_width, new_height).expect("canvas pixmap");
        self.canvas.fill(Color::from_rgba8(0, 0, 0, 255));
    }

    /// Clickable rating targets, in surface coordinates: (green, red).
    pub fn rating_regions(&self) -> (CircleRegion, CircleRegion) {
        let (cx, cy) = self.center;
        (
            CircleRegion::new((cx + CIRCLE_OFFSET, cy), CIRCLE_RADIUS),
            CircleRegion::new((cx - CIRCLE_OFFSET, cy), CIRCLE_RADIUS),
        )
    }

    pub fn render_frame<T: Timer>(
        &mut self,
        scene: &Scene,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats> {
        let t_clear = {
            let t = timer.now();
            self.canvas.fill(Color::from_rgba8(0, 0, 0, 255));
            timer.elapsed(t)
        };

        let t_scene = {
            let t = timer.now();
            self.draw_scene(scene);
            timer.elapsed(t)
        };

        let t_copy = {
            let t = timer.now();
            ensure!(
                frame_buffer.len() == self.canvas.data().len(),
                "frame buffer size mismatch"
            );
            frame_buffer.copy_from_slice(self.canvas.data());
            timer.elapsed(t)
        };

        let total = t_clear + t_scene + t_copy;
        timer.record_frame(total);

        Ok(FrameStats {
            clear: t_clear,
            scene: t_scene,
            copy: t_copy,
            total,
        })
    }

    fn draw_scene(&mut self, scene: &Scene) {
        let (cx, cy) = self.center;
        match scene {
            Scene::Welcome => self.blit_label(Label::Welcome, (cx, cy)),
            Scene::Instructions => {
                let lines = [
                    Label::Instructions1,
                    Label::Instructions2,
                    Label::Instructions3,
                    Label::Instructions4,
                ];
                let top = cy - LINE_SPACING * (lines.len() as f32 - 1.0) / 2.0;
                for (i, label) in lines.into_iter().enumerate() {
                    self.blit_label(label, (cx, top + i as f32 * LINE_SPACING));
                }
            }
            Scene::Fixation => {
                Self::blit(&mut self.canvas, &self.fixation, (cx, cy));
            }
            Scene::Stimulus { text_id } => {
                // Stimulus sits a little above center.
                let pos = (cx, cy - self.height as f32 * 0.15);
                self.blit_text(*text_id, pos);
            }
            Scene::Feedback { correct } => {
                let label = if *correct {
                    Label::Correct
                } else {
                    Label::Incorrect
                };
                self.blit_label(label, (cx, cy));
            }
            Scene::Results { line_ids } => {
                let top = cy - LINE_SPACING * (line_ids.len() as f32 - 1.0) / 2.0;
                for (i, id) in line_ids.iter().enumerate() {
                    self.blit_text(*id, (cx, top + i as f32 * LINE_SPACING));
                }
            }
            Scene::Farewell => self.blit_label(Label::Farewell, (cx, cy)),
            Scene::Rating => {
                self.blit_label(Label::RatingPrompt, (cx, cy - self.height as f32 * 0.25));
                let (green, red) = self.rating_regions();
                Self::blit(&mut self.canvas, &self.green_circle, green.center);
                Self::blit(&mut self.canvas, &self.red_circle, red.center);
            }
            Scene::RatingThanks { liked } => {
                let label = if *liked { Label::Yay } else { Label::Nay };
                self.blit_label(label, (cx, cy));
            }
            Scene::Blank => {}
        }
    }

    fn blit_label(&mut self, label: Label, pos: (f32, f32)) {
        Self::blit(&mut self.canvas, &self.labels[label as usize], pos);
    }

    fn blit_text(&mut self, text_id: usize, pos: (f32, f32)) {
        let Some(atom) = get_text(text_id) else {
            return;
        };
        let pm = self.text_cache.get_or_render(atom);
        Self::blit(&mut self.canvas, &pm, pos);
    }

    /// Centered draw onto the canvas; tiny-skia clips for us.
    fn blit(canvas: &mut Pixmap, pm: &Pixmap, pos: (f32, f32)) {
        let x = (pos.0 - pm.width() as f32 * 0.5).round() as i32;
        let y = (pos.1 - pm.height() as f32 * 0.5).round() as i32;
        canvas.draw_pixmap(
            x,
            y,
            pm.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}
