//! Single-slot render coalescing and the idle pause timer.
//!
//! At most one render is pending at a time: a request made while one is
//! already queued is dropped in favour of the queued one. The host drives
//! the loop by calling `EditorContext::tick` once per frame; stopping those
//! calls stops rendering.

/// Length of one idle tick in seconds
pub const IDLE_TICK_SECS: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    /// A render is queued for the next frame
    pending: bool,
    /// Camera, tool or layer state changed since the last frame
    needs_redraw: bool,
    idle_elapsed: f32,
    idle_ticks: u32,
    idle_pause_ticks: u32,
    paused: bool,
    frames: u64,
    dropped: u64,
}

impl FrameScheduler {
    pub fn new(idle_pause_ticks: u32) -> Self {
        Self {
            pending: false,
            needs_redraw: true,
            idle_elapsed: 0.0,
            idle_ticks: 0,
            idle_pause_ticks: idle_pause_ticks.max(1),
            paused: false,
            frames: 0,
            dropped: 0,
        }
    }

    /// Queues a render for the next frame. Returns false when one was
    /// already queued and this request was coalesced into it.
    pub fn request_render(&mut self) -> bool {
        if self.pending {
            self.dropped += 1;
            log::trace!("render already queued, dropping request");
            return false;
        }
        self.pending = true;
        true
    }

    /// Marks state as changed and queues a render.
    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
        self.request_render();
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Any input event resets the idle timer and resumes rendering.
    pub fn note_input(&mut self) {
        self.idle_elapsed = 0.0;
        self.idle_ticks = 0;
        if self.paused {
            self.paused = false;
            log::debug!("render loop resumed");
        }
    }

    /// Advances the idle timer by `dt` seconds.
    pub fn advance_idle(&mut self, dt: f32) {
        if self.paused {
            return;
        }
        self.idle_elapsed += dt.max(0.0);
        while self.idle_elapsed >= IDLE_TICK_SECS {
            self.idle_elapsed -= IDLE_TICK_SECS;
            self.idle_ticks += 1;
        }
        if self.idle_ticks >= self.idle_pause_ticks && !self.pending && !self.needs_redraw {
            self.paused = true;
            log::debug!("render loop paused after {} idle ticks", self.idle_ticks);
        }
    }

    pub fn set_idle_pause_ticks(&mut self, ticks: u32) {
        self.idle_pause_ticks = ticks.max(1);
    }

    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Consumes the queued render. Returns true when this frame should
    /// redraw.
    pub fn take_frame(&mut self) -> bool {
        let run = self.pending || self.needs_redraw;
        self.pending = false;
        self.needs_redraw = false;
        if run {
            self.frames += 1;
        }
        run
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Requests coalesced into an already queued render
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(20)
    }
}
