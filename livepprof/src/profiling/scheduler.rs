//! Per-signal scheduling loop
//!
//! One OS thread per signal type. Every wait point (tick wait, capture
//! window, report delivery) also listens on the shared [`ExitSignal`], so a
//! fired signal ends the loop within one wake-up.

use crossbeam_channel::{select, Sender};
use log::{debug, trace};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Instant, SystemTime};

use crate::analysis::build_data;
use crate::collector::{Collector, ExitSignal};
use crate::domain::{Data, ProfilerError, Result, Signal};
use crate::options::Options;

/// What the loop does after a tick
#[derive(Debug, PartialEq, Eq)]
enum Tick {
    Continue,
    Exit,
}

pub(crate) struct SignalLoop {
    pub(crate) signal: Signal,
    pub(crate) collector: Arc<dyn Collector>,
    pub(crate) options: Arc<Options>,
    pub(crate) tx: Sender<Data>,
    pub(crate) exit: ExitSignal,
}

impl SignalLoop {
    /// Run the loop on its own named thread.
    pub(crate) fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("livepprof-{}", self.signal))
            .spawn(move || self.run())
            .map_err(ProfilerError::Spawn)
    }

    fn run(self) {
        debug!("{} loop started", self.signal);
        let mut rng = rand::rng();
        // Periods run from tick start to tick start; time spent collecting
        // and delivering is taken out of the next wait.
        let mut last_tick = Instant::now();
        loop {
            let wait = self.options.jittered_delay(&mut rng).saturating_sub(last_tick.elapsed());
            if self.exit.wait_timeout(wait) {
                break;
            }
            last_tick = Instant::now();
            if self.tick() == Tick::Exit {
                break;
            }
        }
        debug!("{} loop exited", self.signal);
    }

    fn tick(&self) -> Tick {
        if !self.options.enabled() {
            trace!("{} profiling disabled, skipping tick", self.signal);
            return Tick::Continue;
        }

        let raw = match self.collector.collect(&self.exit) {
            Ok(raw) => raw,
            Err(err) => {
                self.options.report_error(err);
                return Tick::Continue;
            }
        };
        if self.exit.is_fired() {
            return Tick::Exit;
        }

        let data = build_data(SystemTime::now(), raw, self.options.limit());
        self.deliver(data)
    }

    /// Hand `data` to a consumer, giving up after one tick period.
    fn deliver(&self, data: Data) -> Tick {
        let timeout = self.options.delay();
        select! {
            send(self.tx, data) -> sent => {
                if sent.is_err() {
                    // Every receiver is gone, nobody will ever read again
                    debug!("{} stream has no receiver", self.signal);
                    return Tick::Exit;
                }
                trace!("{} report delivered", self.signal);
                Tick::Continue
            }
            recv(self.exit.rx) -> _ => Tick::Exit,
            default(timeout) => {
                debug!("{} report not received within {timeout:?}, dropping it", self.signal);
                self.options.report_error(ProfilerError::SendTimeout { signal: self.signal, timeout });
                Tick::Continue
            }
        }
    }
}
