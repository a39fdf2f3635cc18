use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Frame interval of the terminal loop; the session clock is fed from it
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub enum HexaEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Channel of terminal events. Production reads crossterm on a background
/// thread; tests push events through their own sender.
pub struct EventSource {
    rx: Receiver<HexaEvent>,
}

impl EventSource {
    pub fn crossterm() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let event = match event::read() {
                // Windows reports releases too
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => HexaEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => HexaEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(event).is_err() {
                break;
            }
        });

        Self { rx }
    }

    pub fn from_receiver(rx: Receiver<HexaEvent>) -> Self {
        Self { rx }
    }
}

/// Advances the application one event or frame at a time
pub struct Runner {
    events: EventSource,
    interval: Duration,
}

impl Runner {
    pub fn new(events: EventSource, interval: Duration) -> Self {
        Self { events, interval }
    }

    /// Time a `Tick` from [`Runner::step`] stands for
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Blocks up to one frame and returns the next event, or Tick on timeout.
    /// A closed channel also yields Tick so the clock keeps running.
    pub fn step(&self) -> HexaEvent {
        match self.events.rx.recv_timeout(self.interval) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => HexaEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(EventSource::from_receiver(rx), Duration::from_millis(1));

        assert!(matches!(runner.step(), HexaEvent::Tick));
    }

    #[test]
    fn step_passes_through_events_in_order() {
        let (tx, rx) = mpsc::channel();
        tx.send(HexaEvent::Resize).unwrap();
        tx.send(HexaEvent::Key(KeyEvent::new(
            KeyCode::Char('t'),
            KeyModifiers::NONE,
        )))
        .unwrap();
        let runner = Runner::new(EventSource::from_receiver(rx), Duration::from_millis(10));

        assert!(matches!(runner.step(), HexaEvent::Resize));
        assert!(matches!(
            runner.step(),
            HexaEvent::Key(KeyEvent {
                code: KeyCode::Char('t'),
                ..
            })
        ));
    }

    #[test]
    fn closed_channel_keeps_ticking() {
        let (tx, rx) = mpsc::channel();
        drop(tx);
        let runner = Runner::new(EventSource::from_receiver(rx), FRAME_INTERVAL);

        assert!(matches!(runner.step(), HexaEvent::Tick));
        assert_eq!(runner.interval(), FRAME_INTERVAL);
    }
}
