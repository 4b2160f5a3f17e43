//! Scripted text slideshow. Entirely local, no gateway calls.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const MAX_SLIDES: usize = 6;
pub const SLIDE_DURATION: Duration = Duration::from_secs(3);

/// Non-blank trimmed lines, at most [`MAX_SLIDES`] of them.
pub fn split_slides(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_SLIDES)
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

#[derive(Debug, Default)]
pub struct Slideshow {
    slides: Vec<String>,
    index: usize,
    state: PlaybackState,
    /// Bumped on every restart or stop; ticks carry the value they started with.
    generation: u64,
}

impl Slideshow {
    pub fn slides(&self) -> &[String] {
        &self.slides
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The slide on screen, if playing.
    pub fn current(&self) -> Option<&str> {
        match self.state {
            PlaybackState::Playing => self.slides.get(self.index).map(String::as_str),
            PlaybackState::Idle => None,
        }
    }

    /// Build slides from `text` and start at the first one.
    /// Returns false (and stays idle) when the text has no usable lines.
    pub fn generate(&mut self, text: &str) -> bool {
        self.slides = split_slides(text);
        self.replay()
    }

    pub fn replay(&mut self) -> bool {
        self.generation += 1;
        self.index = 0;
        self.state = if self.slides.is_empty() {
            PlaybackState::Idle
        } else {
            PlaybackState::Playing
        };
        self.state == PlaybackState::Playing
    }

    /// One timer tick. Past the last slide playback ends and the index resets.
    pub fn advance(&mut self) -> PlaybackState {
        if self.state == PlaybackState::Playing {
            self.index += 1;
            if self.index >= self.slides.len() {
                self.stop();
            }
        }
        self.state
    }

    /// Advance only if no restart or stop happened since `generation` was read.
    /// A stale tick returns `None` and leaves the show untouched.
    pub fn advance_from(&mut self, generation: u64) -> Option<PlaybackState> {
        (self.generation == generation).then(|| self.advance())
    }

    pub fn stop(&mut self) {
        self.generation += 1;
        self.state = PlaybackState::Idle;
        self.index = 0;
    }

    pub fn clear(&mut self) {
        self.stop();
        self.slides.clear();
    }
}

/// Drives a [`Slideshow`] with a single tokio timer task.
///
/// Every start, replay, stop or clear aborts the previous task first, so at
/// most one pending tick exists. The slide on screen is published on a
/// watch channel (`None` while idle).
pub struct SlideshowPlayer {
    show: Arc<Mutex<Slideshow>>,
    tick: Duration,
    timer: Option<JoinHandle<()>>,
    frames: watch::Sender<Option<String>>,
}

impl SlideshowPlayer {
    pub fn new(tick: Duration) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            show: Arc::new(Mutex::new(Slideshow::default())),
            tick,
            timer: None,
            frames,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.frames.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.show.lock().state()
    }

    pub fn index(&self) -> usize {
        self.show.lock().index()
    }

    pub fn slides(&self) -> Vec<String> {
        self.show.lock().slides().to_vec()
    }

    /// Returns the number of slides; zero means nothing to play.
    pub fn play(&mut self, text: &str) -> usize {
        self.cancel_timer();
        let started = self.show.lock().generate(text);
        self.publish();
        if started {
            self.start_timer();
        }
        self.show.lock().slides().len()
    }

    pub fn replay(&mut self) -> bool {
        self.cancel_timer();
        let started = self.show.lock().replay();
        self.publish();
        if started {
            self.start_timer();
        }
        started
    }

    pub fn stop(&mut self) {
        self.cancel_timer();
        self.show.lock().stop();
        self.publish();
    }

    pub fn clear(&mut self) {
        self.cancel_timer();
        self.show.lock().clear();
        self.publish();
    }

    fn publish(&self) {
        let frame = self.show.lock().current().map(str::to_string);
        self.frames.send_replace(frame);
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    fn start_timer(&mut self) {
        let show = Arc::clone(&self.show);
        let frames = self.frames.clone();
        let tick = self.tick;
        let generation = self.show.lock().generation();
        self.timer = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick).await;
                let (state, frame) = {
                    let mut show = show.lock();
                    let Some(state) = show.advance_from(generation) else {
                        tracing::debug!("stale slideshow tick dropped");
                        break;
                    };
                    (state, show.current().map(str::to_string))
                };
                frames.send_replace(frame);
                if state == PlaybackState::Idle {
                    tracing::debug!("slideshow finished");
                    break;
                }
            }
        }));
    }
}

impl Drop for SlideshowPlayer {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_are_dropped() {
        assert_eq!(split_slides("A\nB\n\nC"), vec!["A", "B", "C"]);
        assert_eq!(split_slides("  padded  \r\n\t\n"), vec!["padded"]);
    }

    #[test]
    fn test_slides_are_capped() {
        let text = (1..=8).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let slides = split_slides(&text);
        assert_eq!(slides.len(), MAX_SLIDES);
        assert_eq!(slides.first().map(String::as_str), Some("line 1"));
        assert_eq!(slides.last().map(String::as_str), Some("line 6"));
    }

    #[test]
    fn test_blank_input_stays_idle() {
        let mut show = Slideshow::default();
        assert!(!show.generate(" \n\n "));
        assert_eq!(show.state(), PlaybackState::Idle);
        assert!(show.current().is_none());
    }

    #[test]
    fn test_n_advances_return_to_idle() {
        let mut show = Slideshow::default();
        assert!(show.generate("one\ntwo\nthree"));
        assert_eq!(show.current(), Some("one"));

        assert_eq!(show.advance(), PlaybackState::Playing);
        assert_eq!(show.current(), Some("two"));
        assert_eq!(show.advance(), PlaybackState::Playing);
        assert_eq!(show.advance(), PlaybackState::Idle);
        assert_eq!(show.index(), 0);
        assert_eq!(show.slides().len(), 3);

        // ticks after the end change nothing
        assert_eq!(show.advance(), PlaybackState::Idle);
        assert_eq!(show.index(), 0);
    }

    #[test]
    fn test_tick_from_before_replay_is_ignored() {
        let mut show = Slideshow::default();
        show.generate("a\nb\nc");
        let first_run = show.generation();
        assert_eq!(show.advance_from(first_run), Some(PlaybackState::Playing));
        assert_eq!(show.index(), 1);

        show.replay();
        assert_eq!(show.advance_from(first_run), None);
        assert_eq!(show.index(), 0);
        assert_eq!(show.current(), Some("a"));

        let second_run = show.generation();
        show.stop();
        assert_eq!(show.advance_from(second_run), None);
        assert_eq!(show.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_clear_drops_slides() {
        let mut show = Slideshow::default();
        show.generate("a\nb");
        show.advance();
        show.clear();
        assert!(show.slides().is_empty());
        assert_eq!(show.index(), 0);
        assert!(!show.replay());
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_runs_to_completion() {
        let mut player = SlideshowPlayer::new(SLIDE_DURATION);
        let frames = player.subscribe();
        assert_eq!(player.play("A\nB\n\nC"), 3);
        assert_eq!(frames.borrow().as_deref(), Some("A"));

        tokio::time::sleep(SLIDE_DURATION + Duration::from_millis(10)).await;
        assert_eq!(player.index(), 1);
        assert_eq!(frames.borrow().as_deref(), Some("B"));

        tokio::time::sleep(SLIDE_DURATION * 2).await;
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.index(), 0);
        assert!(frames.borrow().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_tick() {
        let mut player = SlideshowPlayer::new(SLIDE_DURATION);
        player.play("A\nB\nC");
        tokio::time::sleep(SLIDE_DURATION / 2).await;
        player.stop();

        tokio::time::sleep(SLIDE_DURATION * 4).await;
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_replaces_previous_timer() {
        let mut player = SlideshowPlayer::new(SLIDE_DURATION);
        player.play("A\nB\nC\nD");
        tokio::time::sleep(SLIDE_DURATION + SLIDE_DURATION / 2).await;
        assert_eq!(player.index(), 1);

        assert!(player.replay());
        assert_eq!(player.index(), 0);

        // the old timer would have ticked at 2 * SLIDE_DURATION
        tokio::time::sleep(SLIDE_DURATION - Duration::from_millis(500)).await;
        assert_eq!(player.index(), 0);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(player.index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_to_play() {
        let mut player = SlideshowPlayer::new(SLIDE_DURATION);
        assert_eq!(player.play("\n\n"), 0);
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(player.slides().is_empty());
    }
}
