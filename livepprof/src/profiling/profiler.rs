//! Profiler lifecycle
//!
//! ```text
//!   new ──▶ Idle ──start──▶ Running ──stop──▶ Idle
//!            │                 │
//!            └──────close──────┴──────close──────▶ Closed (terminal)
//! ```
//!
//! Output streams are created once, with the profiler, and survive
//! `stop`/`start` cycles. They are rendezvous channels: a report is handed
//! over only to a consumer that is receiving at that moment, and dropped
//! after one tick period otherwise.

use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::JoinHandle;

use super::scheduler::SignalLoop;
use crate::collector::{exit_signal, Collector, CpuBackend, CpuCollector, ExitHandle, HeapBackend, HeapCollector};
use crate::domain::{Data, Result, Signal};
use crate::options::Options;
use crate::symbolization::SymbolResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerState {
    Idle,
    Running,
    Closed,
}

/// One signal type: its collector and output stream
struct Stream {
    signal: Signal,
    collector: Arc<dyn Collector>,
    tx: Sender<Data>,
    rx: Receiver<Data>,
}

/// Scheduling loops of one `start`
struct Running {
    exit: ExitHandle,
    loops: Vec<JoinHandle<()>>,
}

#[derive(Default)]
struct State {
    streams: Vec<Stream>,
    running: Option<Running>,
    closed: bool,
}

pub struct Profiler {
    options: Arc<Options>,
    state: RwLock<State>,
}

impl Profiler {
    /// Profiler reporting CPU and heap usage.
    ///
    /// `resolver` may be shared with other profilers so that every address is
    /// symbolized once per process.
    #[must_use]
    pub fn new(
        options: Options,
        resolver: Arc<SymbolResolver>,
        cpu: Arc<dyn CpuBackend>,
        heap: Arc<dyn HeapBackend>,
    ) -> Self {
        let cpu = CpuCollector::new(Arc::clone(&resolver), cpu, options.filter(), options.delay());
        let heap = HeapCollector::new(resolver, heap, options.filter());
        Self::with_collectors(
            options,
            vec![
                (Signal::Cpu, Arc::new(cpu) as Arc<dyn Collector>),
                (Signal::Heap, Arc::new(heap) as Arc<dyn Collector>),
            ],
        )
    }

    /// Profiler driving arbitrary collectors, one loop each.
    #[must_use]
    pub fn with_collectors(options: Options, collectors: Vec<(Signal, Arc<dyn Collector>)>) -> Self {
        let streams = collectors
            .into_iter()
            .map(|(signal, collector)| {
                let (tx, rx) = crossbeam_channel::bounded(0);
                Stream { signal, collector, tx, rx }
            })
            .collect();
        Self {
            options: Arc::new(options),
            state: RwLock::new(State { streams, ..State::default() }),
        }
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn state(&self) -> ProfilerState {
        let state = self.state.read();
        if state.closed {
            ProfilerState::Closed
        } else if state.running.is_some() {
            ProfilerState::Running
        } else {
            ProfilerState::Idle
        }
    }

    /// Start one scheduling loop per signal type.
    ///
    /// No-op when already running, closed, or without collectors.
    ///
    /// # Errors
    /// [`ProfilerError::Spawn`](crate::ProfilerError::Spawn) if a loop thread
    /// cannot be created; loops already spawned are stopped again.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.closed || state.running.is_some() || state.streams.is_empty() {
            return Ok(());
        }

        let (handle, exit) = exit_signal();
        let mut loops = Vec::with_capacity(state.streams.len());
        for stream in &state.streams {
            let signal_loop = SignalLoop {
                signal: stream.signal,
                collector: Arc::clone(&stream.collector),
                options: Arc::clone(&self.options),
                tx: stream.tx.clone(),
                exit: exit.clone(),
            };
            match signal_loop.spawn() {
                Ok(thread) => loops.push(thread),
                Err(err) => {
                    shutdown(Running { exit: handle, loops });
                    return Err(err);
                }
            }
        }

        info!("profiler started: {} loops, delay {:?}", loops.len(), self.options.delay());
        state.running = Some(Running { exit: handle, loops });
        Ok(())
    }

    /// Cancel the loops and wait for them. No-op unless running.
    pub fn stop(&self) {
        let running = self.state.write().running.take();
        if let Some(running) = running {
            shutdown(running);
            info!("profiler stopped");
        }
    }

    /// Stop and release everything; the streams end once drained.
    ///
    /// Terminal: a closed profiler cannot be started again.
    pub fn close(&self) {
        let (running, streams) = {
            let mut state = self.state.write();
            if state.closed {
                return;
            }
            state.closed = true;
            (state.running.take(), std::mem::take(&mut state.streams))
        };
        if let Some(running) = running {
            shutdown(running);
        }
        // Last senders go with the streams, disconnecting every receiver
        drop(streams);
        info!("profiler closed");
    }

    /// CPU report stream, `None` once closed.
    #[must_use]
    pub fn cpu(&self) -> Option<Receiver<Data>> {
        self.stream(Signal::Cpu)
    }

    /// Heap report stream, `None` once closed.
    #[must_use]
    pub fn heap(&self) -> Option<Receiver<Data>> {
        self.stream(Signal::Heap)
    }

    #[must_use]
    pub fn stream(&self, signal: Signal) -> Option<Receiver<Data>> {
        self.state
            .read()
            .streams
            .iter()
            .find(|stream| stream.signal == signal)
            .map(|stream| stream.rx.clone())
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        self.close();
    }
}

fn shutdown(running: Running) {
    let Running { exit, loops } = running;
    exit.fire();
    for thread in loops {
        let name = thread.thread().name().unwrap_or("livepprof").to_string();
        if thread.join().is_err() {
            warn!("{name} panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ExitSignal, RawData};
    use crate::domain::Location;
    use std::time::{Duration, Instant};

    struct Constant;

    impl Collector for Constant {
        fn collect(&self, _exit: &ExitSignal) -> Result<RawData> {
            Ok(RawData::from([(Location::new("hot", "src/hot.rs", "main"), 3.0)]))
        }
    }

    fn profiler(delay: Duration) -> Profiler {
        let options = Options::default().with_delay(delay).unwrap();
        Profiler::with_collectors(options, vec![(Signal::Cpu, Arc::new(Constant) as Arc<dyn Collector>)])
    }

    #[test]
    fn test_state_transitions() {
        let p = profiler(Duration::from_millis(10));
        assert_eq!(p.state(), ProfilerState::Idle);
        p.start().unwrap();
        assert_eq!(p.state(), ProfilerState::Running);
        p.stop();
        assert_eq!(p.state(), ProfilerState::Idle);
        p.start().unwrap();
        assert_eq!(p.state(), ProfilerState::Running);
        p.close();
        assert_eq!(p.state(), ProfilerState::Closed);
        p.start().unwrap();
        assert_eq!(p.state(), ProfilerState::Closed);
    }

    #[test]
    fn test_reports_reach_consumer() {
        let p = profiler(Duration::from_millis(10));
        let rx = p.cpu().unwrap();
        assert!(p.heap().is_none());
        p.start().unwrap();

        let data = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(data.entries.len(), 1);
        assert_eq!(data.entries[0].key.function, "hot");
        assert!((data.entries[0].value - 3.0).abs() < f64::EPSILON);
        p.close();
    }

    #[test]
    fn test_stream_survives_restart() {
        let p = profiler(Duration::from_millis(10));
        let rx = p.cpu().unwrap();
        p.start().unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        p.stop();
        p.start().unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        p.close();
    }

    #[test]
    fn test_close_disconnects_streams() {
        let p = profiler(Duration::from_millis(10));
        let rx = p.cpu().unwrap();
        p.start().unwrap();
        p.close();
        assert!(p.cpu().is_none());

        let started = Instant::now();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_without_collectors_never_runs() {
        let p = Profiler::with_collectors(Options::default(), Vec::new());
        p.start().unwrap();
        assert_eq!(p.state(), ProfilerState::Idle);
    }

    #[test]
    fn test_drop_closes() {
        let p = profiler(Duration::from_millis(10));
        let rx = p.cpu().unwrap();
        p.start().unwrap();
        drop(p);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
    }
}
