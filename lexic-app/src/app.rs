use std::sync::Arc;

use anyhow::Result;
use lexic_core::{ConditionRow, Phase, ResponseKey, Scene, SessionPhase};
use lexic_experiment::{SessionConfig, SessionEvent, SessionStateMachine};
use lexic_render::{load_system_font, FontRef, SkiaRenderer};
use lexic_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    session: SessionStateMachine<SessionPhase, HighPrecisionTimer>,
    renderer: Option<SkiaRenderer>,
    font: FontRef<'static>,
    cursor: (f32, f32),
    cursor_visible: bool,
    current_size: Option<PhysicalSize<u32>>,
    scale_factor: f64,
    refresh_rate: Option<f64>,
    last_flip_ns: Option<u64>,
    error: Option<anyhow::Error>,
    should_exit: bool,
}

impl App {
    pub fn new(config: SessionConfig, conditions: Vec<ConditionRow>) -> Result<Self> {
        // Font loading can fail, so do it before any window exists.
        let font = load_system_font()?;
        let timer = HighPrecisionTimer::new();
        let session = SessionStateMachine::new(config, conditions, timer);

        Ok(Self {
            window: None,
            pixels: None,
            session,
            renderer: None,
            font,
            cursor: (0.0, 0.0),
            cursor_visible: false,
            current_size: None,
            scale_factor: 1.0,
            refresh_rate: None,
            last_flip_ns: None,
            error: None,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        tracing::info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting lexical decision session"
        );

        event_loop.run_app(&mut self)?;

        if let Some(err) = self.error.take() {
            return Err(err);
        }
        if self.session.is_aborted() {
            tracing::warn!("session aborted, no results written");
            return Ok(());
        }
        if let Some(path) = self.session.write_results()? {
            tracing::info!(path = %path.display(), "results saved");
        }

        let report = self.session.timer.frame_report();
        tracing::info!(
            avg_frame_ms = report.average_frame_time_ns / 1e6,
            jitter_ms = report.jitter_ns / 1e6,
            fps = report.effective_fps,
            "frame timing, bounds reaction time precision"
        );
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("No monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("Lexic")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor.clone()))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        self.scale_factor = window.scale_factor();
        self.current_size = Some(physical_size);

        tracing::info!(
            width = physical_size.width,
            height = physical_size.height,
            scale = self.scale_factor,
            refresh_hz = self.refresh_rate,
            "display configured"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);

        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            self.font.clone(),
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let pix = self.pixels.as_mut().unwrap();
        let renderer = self.renderer.as_mut().unwrap();

        let scene = self.session.scene();
        let frame = pix.frame_mut();
        let stats = renderer.render_frame(&scene, frame, &mut self.session.timer)?;
        tracing::trace!(
            clear_us = stats.clear.as_micros() as u64,
            scene_us = stats.scene.as_micros() as u64,
            copy_us = stats.copy.as_micros() as u64,
            total_us = stats.total.as_micros() as u64,
            "frame rendered"
        );
        // The flip below is the wall-clock reference for the tick that
        // follows in `update`.
        pix.render()?;
        Ok(())
    }

    /// Holds the redraw loop to the display interval. Without this the
    /// loop spins when the surface does not block on vsync.
    fn pace_next_frame(&mut self) {
        let interval_ns = (1e9 / self.refresh_rate.unwrap_or(60.0)) as u64;
        if let Some(last) = self.last_flip_ns {
            let elapsed = self.session.timer.now().saturating_sub(last);
            if elapsed < interval_ns {
                self.session
                    .timer
                    .sleep(std::time::Duration::from_nanos(interval_ns - elapsed));
            }
        }
        self.last_flip_ns = Some(self.session.timer.now());
    }

    fn update(&mut self) {
        for event in self.session.tick() {
            self.dispatch(event);
        }

        // The pointer only matters during the rating screen.
        let rating = self.session.phase.is_rating();
        if rating != self.cursor_visible {
            if let Some(window) = &self.window {
                window.set_cursor_visible(rating);
            }
            self.cursor_visible = rating;
        }

        if self.session.is_finished() || self.session.is_aborted() {
            self.should_exit = true;
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        if let Err(e) = self.session.handle_event(event) {
            self.error = Some(e.into());
            self.should_exit = true;
        }
    }

    fn handle_input(&mut self, event: KeyEvent) {
        if let PhysicalKey::Code(KeyCode::KeyQ | KeyCode::Escape) = event.physical_key {
            self.dispatch(SessionEvent::QuitRequested);
            return;
        }

        if self.session.phase.is_trials() {
            // Every key ends response collection; only the arrows can
            // score a hit, the rest are recorded under their own name.
            let key = match event.physical_key {
                PhysicalKey::Code(KeyCode::ArrowLeft) => ResponseKey::Left,
                PhysicalKey::Code(KeyCode::ArrowRight) => ResponseKey::Right,
                _ => ResponseKey::Other(key_name(&event.logical_key)),
            };
            self.dispatch(SessionEvent::Response(key));
            return;
        }

        if let PhysicalKey::Code(KeyCode::Enter) = event.physical_key {
            self.dispatch(SessionEvent::EnterPressed);
        }
    }

    fn handle_click(&mut self) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        if !matches!(self.session.scene(), Scene::Rating) {
            return;
        }
        let (green, red) = renderer.rating_regions();
        if green.contains(self.cursor) {
            self.dispatch(SessionEvent::RatingClicked { liked: true });
        } else if red.contains(self.cursor) {
            self.dispatch(SessionEvent::RatingClicked { liked: false });
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        self.current_size = Some(new_size);
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                tracing::error!("failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                tracing::error!("failed to resize buffer: {e}");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height);
        }
    }
}

/// Lowercase key name for the results file, e.g. "a", "space", "enter".
fn key_name(key: &Key) -> String {
    match key {
        Key::Character(text) => text.to_lowercase(),
        Key::Named(named) => format!("{named:?}").to_lowercase(),
        _ => "unidentified".to_string(),
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                tracing::error!("failed to create window and surface: {e}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                // Closing the window mid-session counts as an abort.
                self.dispatch(SessionEvent::QuitRequested);
                self.should_exit = true;
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    self.error = Some(e);
                    self.should_exit = true;
                }
                self.update();
                self.pace_next_frame();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(event);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.handle_click(),
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }

        if self.should_exit {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
