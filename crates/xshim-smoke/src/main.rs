//! XShim Smoke Harness
//!
//! Opens a single XCB window through the shim, logs every notification it
//! emits, and prints a JSON frame-timing summary once the window closes.
//! Escape closes the window; so does `--duration-ms` when given.

use anyhow::Context;
use serde_json::json;
use std::cell::{OnceCell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use xshim_common::{init_logging, ShimConfig};
use xshim_viewhost::{CloseHandle, KeyId, PresentCallback, WindowEvent, XcbWindow};

/// Intervals between consecutive present callbacks.
#[derive(Default)]
struct FrameStats {
    intervals: Vec<Duration>,
}

fn round_ms(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100_000.0).round() / 100.0
}

impl FrameStats {
    fn push(&mut self, interval: Duration) {
        self.intervals.push(interval);
    }

    fn summary(&self) -> serde_json::Value {
        let (Some(min), Some(max)) = (self.intervals.iter().min(), self.intervals.iter().max())
        else {
            return json!({ "count": 0 });
        };
        let total: Duration = self.intervals.iter().sum();
        let avg = total / self.intervals.len() as u32;
        json!({
            "count": self.intervals.len(),
            "avg_ms": round_ms(avg),
            "min_ms": round_ms(*min),
            "max_ms": round_ms(*max),
        })
    }
}

/// Parse command line arguments
struct Args {
    config: Option<PathBuf>,
    duration_ms: Option<u64>,
    title: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    hidden: bool,
    perf_output: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut parsed = Self {
            config: None,
            duration_ms: None,
            title: None,
            width: None,
            height: None,
            hidden: false,
            perf_output: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    parsed.config = args.next().map(PathBuf::from);
                }
                "--duration-ms" => {
                    parsed.duration_ms = args.next().and_then(|val| val.parse().ok());
                }
                "--title" => {
                    parsed.title = args.next();
                }
                "--width" => {
                    parsed.width = args.next().and_then(|val| val.parse().ok());
                }
                "--height" => {
                    parsed.height = args.next().and_then(|val| val.parse().ok());
                }
                "--hidden" => {
                    parsed.hidden = true;
                }
                "--perf-output" => {
                    parsed.perf_output = args.next();
                }
                _ => {}
            }
        }

        parsed
    }

    /// Command line flags win over the configuration file.
    fn apply(&self, config: &mut ShimConfig) {
        if let Some(title) = &self.title {
            config.window.title = title.clone();
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.hidden {
            config.window.visible = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(ShimConfig::default_path);
    let mut config = ShimConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    args.apply(&mut config);
    config.window.validate()?;

    init_logging(&config.logging);
    info!(
        config = %config_path.display(),
        title = %config.window.title,
        width = config.window.width,
        height = config.window.height,
        duration_ms = ?args.duration_ms,
        "Starting XShim Smoke Harness"
    );

    let frames = Rc::new(RefCell::new(FrameStats::default()));
    let close_slot: Rc<OnceCell<CloseHandle>> = Rc::new(OnceCell::new());
    let start = Instant::now();
    let deadline = args.duration_ms.map(Duration::from_millis);

    let present: PresentCallback = {
        let frames = Rc::clone(&frames);
        let close_slot = Rc::clone(&close_slot);
        let mut last_frame: Option<Instant> = None;
        Box::new(move || {
            let now = Instant::now();
            if let Some(last) = last_frame {
                frames.borrow_mut().push(now.duration_since(last));
            }
            last_frame = Some(now);

            if deadline.is_some_and(|deadline| start.elapsed() >= deadline) {
                if let Some(handle) = close_slot.get() {
                    handle.request_close();
                }
            }
        })
    };

    let init_start = Instant::now();
    let mut window = XcbWindow::create(&config.window, Some(present)).context("creating window")?;
    let window_init = init_start.elapsed();
    let _ = close_slot.set(window.close_handle());

    let close = window.close_handle();
    let moved = Rc::new(RefCell::new((0i64, 0i64)));
    let moved_sink = Rc::clone(&moved);
    window.add_event_callback(Box::new(move |event| {
        match event {
            WindowEvent::KeypressPressed { key, .. } if *key == KeyId::ESCAPE => {
                info!("Escape pressed, closing");
                close.request_close();
            }
            WindowEvent::MouseMoved { dx, dy, .. } => {
                let mut total = moved_sink.borrow_mut();
                total.0 += i64::from(*dx);
                total.1 += i64::from(*dy);
            }
            _ => {}
        }
        debug!(?event, "Window notification");
    }));

    let run_start = Instant::now();
    if let Err(e) = window.run() {
        error!(?e, "Event loop failed");
        return Err(e.into());
    }
    let event_loop = run_start.elapsed();

    let (moved_x, moved_y) = *moved.borrow();
    let result = json!({
        "status": "pass",
        "elapsed_ms": start.elapsed().as_millis(),
        "window_init_ms": round_ms(window_init),
        "event_loop_ms": round_ms(event_loop),
        "frames": frames.borrow().summary(),
        "pointer_travel": { "dx": moved_x, "dy": moved_y }
    });

    if let Some(ref perf_path) = args.perf_output {
        if let Err(e) = std::fs::write(perf_path, result.to_string()) {
            error!(?e, "Failed to write perf output");
        } else {
            info!(?perf_path, "Perf summary written");
        }
    }

    println!("{}", result);
    Ok(())
}
