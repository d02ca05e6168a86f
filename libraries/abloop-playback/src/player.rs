//! Threaded player
//!
//! Runs a [`Session`] on its own thread and exposes it through a handle.
//! Every operation is sent as a [`Command`] with a reply channel; poller
//! ticks arrive on a second channel. The owning thread handles one message
//! at a time, so control calls and ticks never race.

use crate::{
    error::{PlaybackError, Result},
    events::PlaybackListener,
    looping::{LoopStage, LoopUpdate},
    poller::PositionPoller,
    primitive::PrimitiveFactory,
    session::Session,
    speed::{SpeedDirection, SpeedFactor},
    types::{MediaSource, PlaybackSnapshot, PlaybackState, PlayerConfig, Ready},
};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

type Reply<T> = Sender<T>;

/// Commands handled by the player thread
enum Command {
    Load(MediaSource, Reply<Result<Ready>>),
    Play(Reply<Result<PlaybackState>>),
    Pause(Reply<Result<PlaybackState>>),
    Toggle(Reply<Result<PlaybackState>>),
    Stop(Reply<Result<PlaybackState>>),
    SeekTo(u64, Reply<Result<()>>),
    AdjustSpeed(SpeedDirection, Reply<SpeedFactor>),
    SkipForward(Reply<Result<u64>>),
    SkipBackward(Reply<Result<u64>>),
    SetLoop(Option<LoopStage>, Reply<Result<LoopUpdate>>),
    Snapshot(Reply<PlaybackSnapshot>),
    Release(Reply<()>),
    Shutdown,
}

/// Marker sent by the position poller
struct Tick;

/// Queue a tick unless one is already waiting
///
/// Returns false once the player thread is gone, which stops the poller.
fn forward_tick(tick_tx: &Sender<Tick>) -> bool {
    !matches!(tick_tx.try_send(Tick), Err(TrySendError::Disconnected(_)))
}

/// Handle to a player running on its own thread
///
/// Dropping the handle shuts the player down and releases the primitive.
pub struct Player {
    command_tx: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl Player {
    /// Start the player thread
    pub fn spawn(
        factory: Box<dyn PrimitiveFactory>,
        listener: Arc<dyn PlaybackListener>,
        config: PlayerConfig,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        let (command_tx, command_rx) = unbounded();
        let session = Session::new(factory, listener, &config);
        let poller = PositionPoller::new(config.poll_interval());

        let thread = thread::Builder::new()
            .name("abloop-player".into())
            .spawn(move || run(session, poller, command_rx))?;

        info!("Player started (poll interval {} ms)", config.poll_interval_ms);

        Ok(Self {
            command_tx,
            thread: Some(thread),
        })
    }

    fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = bounded(1);
        self.command_tx
            .send(command(reply_tx))
            .map_err(|_| PlaybackError::PlayerStopped)?;
        reply_rx.recv().map_err(|_| PlaybackError::PlayerStopped)
    }

    pub fn load(&self, source: impl Into<MediaSource>) -> Result<Ready> {
        let source = source.into();
        self.request(|reply| Command::Load(source, reply))?
    }

    pub fn play(&self) -> Result<PlaybackState> {
        self.request(Command::Play)?
    }

    pub fn pause(&self) -> Result<PlaybackState> {
        self.request(Command::Pause)?
    }

    /// Play/pause toggle for single-button UIs
    pub fn toggle(&self) -> Result<PlaybackState> {
        self.request(Command::Toggle)?
    }

    pub fn stop(&self) -> Result<PlaybackState> {
        self.request(Command::Stop)?
    }

    pub fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.request(|reply| Command::SeekTo(position_ms, reply))?
    }

    pub fn adjust_speed(&self, direction: SpeedDirection) -> Result<SpeedFactor> {
        self.request(|reply| Command::AdjustSpeed(direction, reply))
    }

    pub fn skip_forward(&self) -> Result<u64> {
        self.request(Command::SkipForward)?
    }

    pub fn skip_backward(&self) -> Result<u64> {
        self.request(Command::SkipBackward)?
    }

    /// Advance the loop capture protocol by one press
    pub fn set_loop(&self) -> Result<LoopUpdate> {
        self.request(|reply| Command::SetLoop(None, reply))?
    }

    /// Loop press at an explicit stage
    pub fn set_loop_at(&self, stage: LoopStage) -> Result<LoopUpdate> {
        self.request(|reply| Command::SetLoop(Some(stage), reply))?
    }

    pub fn snapshot(&self) -> Result<PlaybackSnapshot> {
        self.request(Command::Snapshot)
    }

    /// Release the primitive and stop polling; `load` brings it back
    pub fn release(&self) -> Result<()> {
        self.request(Command::Release)
    }

    /// Stop the player thread and wait for it to exit
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.command_tx.send(Command::Shutdown).ok();
            if thread.join().is_err() {
                warn!("Player thread panicked");
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.join();
    }
}

/// Player thread main loop
fn run(mut session: Session, mut poller: PositionPoller, command_rx: Receiver<Command>) {
    // At most one tick waits at a time
    let (tick_tx, tick_rx) = bounded::<Tick>(1);

    loop {
        let keep_running = select! {
            recv(command_rx) -> command => match command {
                Ok(command) => handle_command(&mut session, &mut poller, command),
                // Every handle is gone
                Err(_) => false,
            },
            recv(tick_rx) -> _ => {
                session.on_tick();
                true
            }
        };
        if !keep_running {
            break;
        }

        if session.wants_polling() && !poller.is_scheduled() {
            let tick_tx = tick_tx.clone();
            if let Err(e) = poller.start(move || forward_tick(&tick_tx)) {
                warn!("Failed to start position poller: {}", e);
            }
        }
    }

    poller.stop();
    session.release();
    debug!("Player thread exiting");
}

/// Apply one command; returns false on shutdown
fn handle_command(session: &mut Session, poller: &mut PositionPoller, command: Command) -> bool {
    // A dropped reply receiver just means the caller stopped waiting
    match command {
        Command::Load(source, reply) => {
            reply.send(session.load(&source)).ok();
        }
        Command::Play(reply) => {
            reply.send(session.play()).ok();
        }
        Command::Pause(reply) => {
            reply.send(session.pause()).ok();
        }
        Command::Toggle(reply) => {
            reply.send(session.toggle()).ok();
        }
        Command::Stop(reply) => {
            reply.send(session.stop()).ok();
        }
        Command::SeekTo(position_ms, reply) => {
            reply.send(session.seek_to(position_ms)).ok();
        }
        Command::AdjustSpeed(direction, reply) => {
            reply.send(session.adjust_speed(direction)).ok();
        }
        Command::SkipForward(reply) => {
            reply.send(session.skip_forward()).ok();
        }
        Command::SkipBackward(reply) => {
            reply.send(session.skip_backward()).ok();
        }
        Command::SetLoop(stage, reply) => {
            let update = match stage {
                Some(stage) => session.set_loop_at(stage),
                None => session.set_loop(),
            };
            reply.send(update).ok();
        }
        Command::Snapshot(reply) => {
            reply.send(session.snapshot()).ok();
        }
        Command::Release(reply) => {
            poller.stop();
            session.release();
            reply.send(()).ok();
        }
        Command::Shutdown => return false,
    }
    true
}
