use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use std::path::PathBuf;

/// Longest accepted simulated delay, one day.
pub const MAX_DELAY_SECS: u64 = 86_400;

/// Runtime configuration for the `relay-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults that reproduce the demo
/// behavior: a two second simulated delay and a one second liveness tick.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "relay-server",
    version,
    about = "Acknowledges submissions immediately and pushes delayed answers over SSE"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:1313"))]
    pub server_addr: String,

    /// Simulated processing time for each submission, in seconds.
    ///
    /// Result streams give up `delay + 1` seconds after they are opened.
    /// Must not exceed one day.
    ///
    /// Environment variable: `PROCESS_DELAY_SECS`
    #[arg(long, env = "PROCESS_DELAY_SECS", default_value_t = 2)]
    pub delay_secs: u64,

    /// How long a finished worker waits for a result stream to claim its
    /// answer before dropping it, in seconds.
    ///
    /// Environment variable: `HANDOFF_TIMEOUT_SECS`
    #[arg(long, env = "HANDOFF_TIMEOUT_SECS", default_value_t = 30)]
    pub handoff_timeout_secs: u64,

    /// Interval between liveness counter frames, in milliseconds.
    ///
    /// Environment variable: `COUNTER_INTERVAL_MS`
    #[arg(long, env = "COUNTER_INTERVAL_MS", default_value_t = 1000)]
    pub counter_interval_ms: u64,

    /// Directory served under `/dist`.
    ///
    /// Environment variable: `STATIC_DIR`
    #[arg(long, env = "STATIC_DIR", default_value = "dist")]
    pub static_dir: PathBuf,

    /// Upper bound on how long shutdown waits for in-flight workers, in
    /// seconds.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 3)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub delay: Duration,
    pub handoff_timeout: Duration,
    pub counter_interval: Duration,
    pub static_dir: PathBuf,
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// How long a result stream waits for an answer: one second more than
    /// the simulated delay.
    pub fn stream_deadline(&self) -> Duration {
        self.delay + Duration::from_secs(1)
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.delay_secs > MAX_DELAY_SECS {
            bail!("PROCESS_DELAY_SECS must be at most {MAX_DELAY_SECS}");
        }

        if args.handoff_timeout_secs == 0 {
            bail!("HANDOFF_TIMEOUT_SECS must be greater than 0");
        }

        if args.counter_interval_ms == 0 {
            bail!("COUNTER_INTERVAL_MS must be greater than 0");
        }

        Ok(Self {
            server_addr: args.server_addr,
            delay: Duration::from_secs(args.delay_secs),
            handoff_timeout: Duration::from_secs(args.handoff_timeout_secs),
            counter_interval: Duration::from_millis(args.counter_interval_ms),
            static_dir: args.static_dir,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        })
    }
}
