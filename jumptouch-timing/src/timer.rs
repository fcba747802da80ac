use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Monotonic millisecond clock shared by frame callbacks and input events.
pub trait Timer {
    /// Milliseconds since the timer was created.
    fn now(&self) -> f64;
    fn elapsed(&self, since: f64) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn calibration_stats(&self) -> CalibrationStats;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationStats {
    pub samples: usize,
    pub average_frame_time_ms: f64,
    pub jitter_ms: f64,
    pub min_frame_time_ms: f64,
    pub max_frame_time_ms: f64,
    pub effective_fps: f64,
}

#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
    frame_times: VecDeque<Duration>,
    max_samples: usize,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1e3
    }

    fn elapsed(&self, since: f64) -> Duration {
        Duration::from_secs_f64(((self.now() - since) / 1e3).max(0.0))
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }

    fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(d);
    }

    fn calibration_stats(&self) -> CalibrationStats {
        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_secs_f64() * 1e3)
            .collect();
        if times.is_empty() {
            return CalibrationStats {
                samples: 0,
                average_frame_time_ms: 0.0,
                jitter_ms: 0.0,
                min_frame_time_ms: 0.0,
                max_frame_time_ms: 0.0,
                effective_fps: 0.0,
            };
        }
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            samples: times.len(),
            average_frame_time_ms: avg,
            jitter_ms: var.sqrt(),
            min_frame_time_ms: min,
            max_frame_time_ms: max,
            effective_fps: if avg > 0.0 { 1e3 / avg } else { 0.0 },
        }
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            start: Instant::now(),
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    /// Wall-clock instant corresponding to a timestamp returned by [`Timer::now`],
    /// `None` when it lies beyond what `Instant` can represent.
    pub fn instant_at(&self, ms: f64) -> Option<Instant> {
        let offset = Duration::try_from_secs_f64(ms.max(0.0) / 1e3).ok()?;
        self.start.checked_add(offset)
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "windows")]
        self.windows_sleep(duration);
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(target_os = "macos")]
        self.macos_sleep(duration);
        #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "windows")]
    fn windows_sleep(&self, duration: Duration) {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{
            CreateWaitableTimerW, INFINITE, SetWaitableTimer, WaitForSingleObject,
        };

        unsafe {
            let Ok(timer) = CreateWaitableTimerW(None, true, None) else {
                std::thread::sleep(duration);
                return;
            };
            // Negative due time is relative, in 100 ns intervals.
            let due = -(duration.as_nanos() as i64 / 100);
            if SetWaitableTimer(timer, &due, 0, None, None, false).is_ok() {
                WaitForSingleObject(timer, INFINITE);
            }
            let _ = CloseHandle(timer);
        }
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(target_os = "macos")]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};

        if duration.as_nanos() < 100_000 {
            unsafe {
                let start = mach_absolute_time();
                let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
                mach_timebase_info(&mut timebase);

                let target_ticks =
                    duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;

                while mach_absolute_time() - start < target_ticks {
                    std::hint::spin_loop();
                }
            }
        } else {
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}
