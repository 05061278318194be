//! Readiness detection for a freshly started process.
//!
//! A process counts as ready once its main window is visible or has a
//! non-empty title. Each poll sleeps one interval before probing. When the
//! poll budget runs out the process is treated as ready anyway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

pub const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const READINESS_MAX_POLLS: u32 = 100;

/// Snapshot of a process's main window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainWindow {
    pub visible: bool,
    /// Window title, or why it could not be read.
    pub title: Result<String, String>,
}

/// Looks up the main window of a process.
pub trait ReadinessProbe: Send + Sync {
    /// `None` while the process has no window, or when the platform has no probe.
    fn main_window(&self, pid: u32) -> Option<MainWindow>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: READINESS_POLL_INTERVAL,
            max_polls: READINESS_MAX_POLLS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The probe reported a ready window on poll `polls`.
    Ready { polls: u32 },
    /// Budget exhausted; treated as ready.
    TimedOut,
    /// The process exited before becoming ready.
    Exited,
}

/// Poll `probe` for `pid` until ready, timed out, or `exited` turns true.
pub async fn wait_for_ready(
    probe: &dyn ReadinessProbe,
    pid: u32,
    policy: ReadinessPolicy,
    exited: &mut watch::Receiver<bool>,
) -> Readiness {
    for poll in 1..=policy.max_polls {
        tokio::select! {
            _ = tokio::time::sleep(policy.interval) => {}
            _ = has_exited(exited) => {
                tracing::info!(pid, poll, "process exited while waiting for readiness");
                return Readiness::Exited;
            }
        }

        if let Some(window) = probe.main_window(pid) {
            if is_ready(pid, &window) {
                tracing::info!(pid, polls = poll, "process is ready");
                return Readiness::Ready { polls: poll };
            }
        }
    }

    tracing::warn!(
        pid,
        polls = policy.max_polls,
        "process did not show a window in time; assuming it is ready",
    );
    Readiness::TimedOut
}

/// Resolves once the exit flag is set or its sender is gone.
async fn has_exited(exited: &mut watch::Receiver<bool>) {
    loop {
        let flag = *exited.borrow_and_update();
        if flag || exited.changed().await.is_err() {
            return;
        }
    }
}

fn is_ready(pid: u32, window: &MainWindow) -> bool {
    if window.visible {
        return true;
    }
    match &window.title {
        Ok(title) => !title.is_empty(),
        Err(err) => {
            tracing::error!(pid, error = %err, "failed to read main window title");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Platform probes
// ---------------------------------------------------------------------------

/// The probe for the current platform.
pub fn default_probe() -> Arc<dyn ReadinessProbe> {
    #[cfg(windows)]
    {
        Arc::new(win32::WindowProbe)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnsupportedProbe)
    }
}

/// Never finds a window; readiness falls back to the poll budget.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedProbe;

impl ReadinessProbe for UnsupportedProbe {
    fn main_window(&self, _pid: u32) -> Option<MainWindow> {
        None
    }
}

#[cfg(windows)]
pub mod win32 {
    use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowTextW, GetWindowThreadProcessId, IsWindowVisible,
    };

    use super::{MainWindow, ReadinessProbe};

    /// Top-level window lookup through `EnumWindows`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct WindowProbe;

    struct Search {
        pid: u32,
        found: Vec<HWND>,
    }

    unsafe extern "system" fn collect(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let search = &mut *(lparam.0 as *mut Search);
        let mut owner = 0u32;
        GetWindowThreadProcessId(hwnd, Some(&mut owner));
        if owner == search.pid {
            search.found.push(hwnd);
        }
        BOOL::from(true)
    }

    impl ReadinessProbe for WindowProbe {
        fn main_window(&self, pid: u32) -> Option<MainWindow> {
            let mut search = Search {
                pid,
                found: Vec::new(),
            };
            unsafe {
                let _ = EnumWindows(Some(collect), LPARAM(&mut search as *mut Search as isize));
            }

            let visible = |hwnd: &HWND| unsafe { IsWindowVisible(*hwnd).as_bool() };
            let hwnd = search
                .found
                .iter()
                .find(|h| visible(h))
                .or_else(|| search.found.first())
                .copied()?;

            let mut buffer = [0u16; 512];
            let len = unsafe { GetWindowTextW(hwnd, &mut buffer) };
            let title = if len > 0 {
                Ok(String::from_utf16_lossy(&buffer[..len as usize]))
            } else {
                let err = windows::core::Error::from_win32();
                if err.code().is_ok() {
                    Ok(String::new())
                } else {
                    Err(err.to_string())
                }
            };

            Some(MainWindow {
                visible: visible(&hwnd),
                title,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Reports a window state chosen by poll number.
    struct ScriptedProbe {
        calls: AtomicU32,
        ready_on: u32,
        window: MainWindow,
    }

    impl ScriptedProbe {
        fn new(ready_on: u32, window: MainWindow) -> Self {
            Self {
                calls: AtomicU32::new(0),
                ready_on,
                window,
            }
        }
    }

    impl ReadinessProbe for ScriptedProbe {
        fn main_window(&self, _pid: u32) -> Option<MainWindow> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            (call >= self.ready_on).then(|| self.window.clone())
        }
    }

    fn visible() -> MainWindow {
        MainWindow {
            visible: true,
            title: Ok(String::new()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn visible_on_third_poll_takes_three_intervals() {
        let probe = ScriptedProbe::new(3, visible());
        let (_tx, mut exited) = watch::channel(false);
        let started = Instant::now();

        let readiness = wait_for_ready(&probe, 42, ReadinessPolicy::default(), &mut exited).await;

        assert_eq!(readiness, Readiness::Ready { polls: 3 });
        assert_eq!(started.elapsed(), READINESS_POLL_INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn titled_hidden_window_counts_as_ready() {
        let window = MainWindow {
            visible: false,
            title: Ok("Contoso Viewer".into()),
        };
        let probe = ScriptedProbe::new(1, window);
        let (_tx, mut exited) = watch::channel(false);

        let readiness = wait_for_ready(&probe, 42, ReadinessPolicy::default(), &mut exited).await;
        assert_eq!(readiness, Readiness::Ready { polls: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn title_errors_are_not_ready_and_budget_runs_out() {
        let window = MainWindow {
            visible: false,
            title: Err("access denied".into()),
        };
        let probe = ScriptedProbe::new(1, window);
        let (_tx, mut exited) = watch::channel(false);
        let policy = ReadinessPolicy {
            interval: Duration::from_millis(100),
            max_polls: 5,
        };
        let started = Instant::now();

        let readiness = wait_for_ready(&probe, 42, policy, &mut exited).await;

        assert_eq!(readiness, Readiness::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_millis(500));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 5);
    }

    /// Collects formatted log lines in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn title_failures_are_logged_as_errors() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let window = MainWindow {
            visible: false,
            title: Err("access denied".into()),
        };

        let ready = tracing::subscriber::with_default(subscriber, || is_ready(42, &window));

        assert!(!ready);
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("ERROR"), "got: {output}");
        assert!(output.contains("failed to read main window title"), "got: {output}");
    }

    #[tokio::test(start_paused = true)]
    async fn exit_stops_polling() {
        let probe = UnsupportedProbe;
        let (tx, mut exited) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            let _ = tx.send(true);
        });
        let started = Instant::now();

        let readiness = wait_for_ready(&probe, 42, ReadinessPolicy::default(), &mut exited).await;

        assert_eq!(readiness, Readiness::Exited);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
