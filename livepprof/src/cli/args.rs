//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::Result;
use crate::options::Options;

#[derive(Parser)]
#[command(
    name = "livepprof",
    about = "Rank the hottest functions of a recorded profile, live",
    after_help = "\
EXAMPLES:
    livepprof --samples samples.json --target ./myapp
    livepprof --samples samples.json --target ./myapp --filter myapp/src --delay-ms 500
    livepprof --samples samples.json --target ./myapp --json --duration 10"
)]
pub struct Args {
    /// Recorded raw samples (JSON) to replay on every tick
    #[arg(short, long, value_name = "FILE")]
    pub samples: PathBuf,

    /// Binary the sample addresses belong to (defaults to this executable)
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// Attribute samples to the first frame whose source file contains this
    #[arg(short, long, default_value = "")]
    pub filter: String,

    /// Tick period in milliseconds
    #[arg(long, default_value = "1000")]
    pub delay_ms: u64,

    /// Random spread of the tick period, as a fraction of it (0..=1)
    #[arg(long, default_value = "0")]
    pub jitter: f64,

    /// Entries printed per report
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Stop after N seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Print one JSON object per report instead of a table
    #[arg(long)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Profiler options described by the arguments.
    ///
    /// # Errors
    /// [`ProfilerError::InvalidOption`](crate::ProfilerError::InvalidOption)
    /// for an out-of-range value.
    pub fn to_options(&self) -> Result<Options> {
        Options::default()
            .with_filter(self.filter.as_str())
            .with_delay(Duration::from_millis(self.delay_ms))?
            .with_jitter(self.jitter)?
            .with_limit(self.limit)
    }
}
