//! Status reporting and process lifecycle events.

/// One status notification for the front end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub text: String,
    pub has_crashed: bool,
    pub is_ready: bool,
    pub app_has_closed: bool,
    /// The front end should wait for the user instead of closing itself.
    pub manual_close: bool,
    pub is_first_launch: bool,
}

impl StatusUpdate {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn crashed(text: impl Into<String>) -> Self {
        Self {
            has_crashed: true,
            ..Self::message(text)
        }
    }

    pub fn ready() -> Self {
        Self {
            is_ready: true,
            ..Self::message("Ready")
        }
    }

    pub fn exiting() -> Self {
        Self {
            app_has_closed: true,
            ..Self::message("Exiting")
        }
    }

    pub fn first_launch(mut self, is_first_launch: bool) -> Self {
        self.is_first_launch = is_first_launch;
        self
    }

    pub fn manual_close(mut self) -> Self {
        self.manual_close = true;
        self
    }
}

/// Fire-and-forget status receiver.
pub trait StatusSink: Send + Sync {
    fn update(&self, update: StatusUpdate);
}

/// Discards every update; used when no launcher UI is shown.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatus;

impl StatusSink for NoopStatus {
    fn update(&self, update: StatusUpdate) {
        tracing::debug!(text = %update.text, "status update (not shown)");
    }
}

/// What the supervisor observed about the launched process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Ready,
    Exited { code: Option<i32> },
    /// Waiting on the process failed.
    Crashed { message: String },
}
