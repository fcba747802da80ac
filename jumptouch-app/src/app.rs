use crate::session::{ResultSink, TrialQueue, host_environment};
use anyhow::{Result, anyhow};
use jumptouch_render::SkiaSurface;
use jumptouch_timing::{HighPrecisionTimer, Timer};
use jumptouch_trial::{ScreenInfo, Trial, TrialEvent, check_screen};
use pixels::{Pixels, SurfaceTexture};
use std::io::Stdout;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

/// Fullscreen host running the queued trials one after another.
pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    surface: Option<SkiaSurface>,
    timer: HighPrecisionTimer,
    queue: TrialQueue,
    sink: ResultSink<Stdout>,
    trial: Option<Trial>,
    cursor: PhysicalPosition<f64>,
    current_size: Option<PhysicalSize<u32>>,
    refresh_rate: Option<f64>,
    failure: Option<anyhow::Error>,
}

impl App {
    pub fn new(queue: TrialQueue, sink: ResultSink<Stdout>) -> Self {
        Self {
            window: None,
            pixels: None,
            surface: None,
            timer: HighPrecisionTimer::new(),
            queue,
            sink,
            trial: None,
            cursor: PhysicalPosition::new(0.0, 0.0),
            current_size: None,
            refresh_rate: None,
            failure: None,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            trials = self.queue.len(),
            "session_started"
        );
        event_loop.run_app(&mut self)?;

        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        info!(completed = self.sink.written(), "session_finished");
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let attributes = Window::default_attributes()
            .with_title("jumptouch")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor.clone()))))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        self.current_size = Some(size);

        info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_hz = self.refresh_rate,
            "display_configured"
        );

        let screen = monitor.size();
        check_screen(&ScreenInfo {
            screen_width: screen.width,
            screen_height: screen.height,
            viewport_width: size.width,
            viewport_height: size.height,
            coarse_pointer: cfg!(any(target_os = "android", target_os = "ios")),
            platform: std::env::consts::OS.to_string(),
            user_agent: host_environment(size.width, size.height).user_agent,
        });

        let texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, texture)?);
        self.surface = Some(SkiaSurface::new(size.width, size.height)?);
        self.window = Some(window);
        Ok(())
    }

    fn start_next_trial(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let size = self.current_size.unwrap_or(PhysicalSize::new(1, 1));
        let env = host_environment(size.width, size.height);
        self.trial = self.queue.start_next(env, self.timer.now())?;
        match &self.window {
            Some(window) if self.trial.is_some() => window.request_redraw(),
            _ => event_loop.exit(),
        }
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let now = self.timer.now();
        let Self {
            trial: Some(trial),
            surface: Some(surface),
            pixels: Some(pixels),
            timer,
            ..
        } = self
        else {
            return Ok(());
        };

        let mut events = trial.poll_timers(now);
        if trial.wants_frame() {
            let stats = surface.render_frame(
                |s| events.extend(trial.on_frame(now, s)),
                pixels.frame_mut(),
                timer,
            )?;
            pixels.render()?;
            trace!(
                draw_ms = stats.draw.as_secs_f64() * 1e3,
                copy_ms = stats.copy.as_secs_f64() * 1e3,
                total_ms = stats.total.as_secs_f64() * 1e3,
                "frame"
            );
        }
        self.handle_events(events, event_loop)
    }

    fn poll_timers(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let now = self.timer.now();
        let events = match self.trial.as_mut() {
            Some(trial) => trial.poll_timers(now),
            None => return Ok(()),
        };
        self.handle_events(events, event_loop)
    }

    fn handle_events(&mut self, events: Vec<TrialEvent>, event_loop: &ActiveEventLoop) -> Result<()> {
        for event in events {
            match event {
                TrialEvent::Running { at } => debug!(at, "running"),
                TrialEvent::Ended { at, result } => {
                    debug!(at, touches = result.touch_on.len(), "ended")
                }
                TrialEvent::Completed(result) => {
                    self.sink.write(&result)?;
                    let stats = self.timer.calibration_stats();
                    debug!(
                        frames = stats.samples,
                        avg_frame_ms = stats.average_frame_time_ms,
                        jitter_ms = stats.jitter_ms,
                        effective_fps = stats.effective_fps,
                        "frame_timing"
                    );
                    self.start_next_trial(event_loop)?;
                }
            }
        }
        Ok(())
    }

    fn touch_start(&mut self, position: PhysicalPosition<f64>) {
        let now = self.timer.now();
        if let Some(trial) = &mut self.trial {
            if trial.on_touch_start(position.x as f32, position.y as f32, now) {
                trace!(x = position.x, y = position.y, at = now, "touch_start");
            }
        }
    }

    fn touch_end(&mut self) {
        let now = self.timer.now();
        if let Some(trial) = &mut self.trial {
            trial.on_touch_end(now);
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        self.current_size = Some(size);
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(size.width, size.height) {
                warn!(error = %e, "resize_surface_failed");
            }
            if let Err(e) = pixels.resize_buffer(size.width, size.height) {
                warn!(error = %e, "resize_buffer_failed");
            }
        }
        if let Some(surface) = &mut self.surface {
            if let Err(e) = surface.resize(size.width, size.height) {
                warn!(error = %e, "resize_canvas_failed");
            }
        }
        info!(width = size.width, height = size.height, "display_resized");
    }

    fn fail(&mut self, err: anyhow::Error, event_loop: &ActiveEventLoop) {
        error!(error = %err, "session_aborted");
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let started = self
            .create_window_and_surface(event_loop)
            .and_then(|()| self.start_next_trial(event_loop));
        if let Err(e) = started {
            self.fail(e, event_loop);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                info!("escape_pressed");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw(event_loop) {
                    self.fail(e, event_loop);
                }
            }
            WindowEvent::Touch(touch) => match touch.phase {
                TouchPhase::Started => self.touch_start(touch.location),
                TouchPhase::Ended | TouchPhase::Cancelled => self.touch_end(),
                TouchPhase::Moved => {}
            },
            WindowEvent::CursorMoved { position, .. } => self.cursor = position,
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.touch_start(self.cursor),
                ElementState::Released => self.touch_end(),
            },
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.poll_timers(event_loop) {
            self.fail(e, event_loop);
            return;
        }
        let Some(trial) = &self.trial else {
            return;
        };
        if trial.wants_frame() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            event_loop.set_control_flow(ControlFlow::Wait);
        } else if let Some(deadline) = trial.next_deadline() {
            let flow = match self.timer.instant_at(deadline) {
                Some(at) => ControlFlow::WaitUntil(at),
                None => {
                    warn!(deadline, "deadline_out_of_range");
                    ControlFlow::Wait
                }
            };
            event_loop.set_control_flow(flow);
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}
