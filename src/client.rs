//! High-level client over the bondlink CLI.
//!
//! Every method here is a thin translation from named parameters to a CLI
//! argument vector: the daemon does the real work. Single-shot methods
//! run the CLI to completion and parse the trailing JSON record of its
//! output; the `stats`/`safebrowsing errors` family goes through the
//! streaming reader in [`crate::stream`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::command::CliCommandBuilder;
use crate::error::CliError;
use crate::locate;
use crate::runner::{ExitStatus, ProcessRunner, TokioProcessRunner};
use crate::stream::{RecordHandler, StreamingReader};
use crate::types::{ConnectMethod, ListOp, Mode, Priority, State, Transport};

/// Default wall-clock cap for single-shot commands.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// The speed test legitimately runs for tens of seconds per leg.
const SPEEDTEST_TIMEOUT: Duration = Duration::from_secs(600);

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Handle to the daemon, bound to one resolved CLI path.
///
/// Each client owns its own configuration; independently configured
/// clients coexist in one process without shared state.
pub struct Client {
    cli_path: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl Client {
    /// Build a client by discovering the CLI in its default install
    /// locations (or the `BONDLINK_CLI` override).
    pub fn new() -> Result<Self, CliError> {
        Ok(Self::with_cli_path(locate::locate_cli()?))
    }

    /// Build a client against an explicit CLI path.
    pub fn with_cli_path(cli_path: impl Into<PathBuf>) -> Self {
        Self {
            cli_path: cli_path.into(),
            runner: Arc::new(TokioProcessRunner),
        }
    }

    /// Swap the process runner; tests use this to script CLI responses.
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn cli_path(&self) -> &Path {
        &self.cli_path
    }

    //
    // Connection control
    //

    /// Connect using the given method. Returns the `currentserver` JSON.
    pub async fn connect(&self, method: ConnectMethod) -> Result<Value, CliError> {
        let mut args = vec!["connect".to_string()];
        method.push_args(&mut args);
        self.run_cmd(&args).await
    }

    /// Connect to the closest server.
    pub async fn connect_closest(&self) -> Result<Value, CliError> {
        self.connect(ConnectMethod::Closest).await
    }

    /// Connect to the closest public server.
    pub async fn connect_public(&self) -> Result<Value, CliError> {
        self.connect(ConnectMethod::Public).await
    }

    /// Connect to the closest private server.
    pub async fn connect_private(&self) -> Result<Value, CliError> {
        self.connect(ConnectMethod::Private).await
    }

    /// Connect to a server that allows p2p traffic.
    pub async fn connect_p2p(&self) -> Result<Value, CliError> {
        self.connect(ConnectMethod::P2p).await
    }

    /// Reconnect to the last server used.
    pub async fn connect_last(&self) -> Result<Value, CliError> {
        self.connect(ConnectMethod::Last).await
    }

    /// Connect by 2-letter country code; `show_servers` lists what is
    /// available.
    pub async fn connect_country(&self, country: &str) -> Result<Value, CliError> {
        self.connect(ConnectMethod::country(country)).await
    }

    /// Disconnect, waiting for the disconnect to complete.
    pub async fn disconnect(&self) -> Result<(), CliError> {
        self.run_cmd(["disconnect"]).await.map(|_| ())
    }

    /// Set the default connect method used by later connects.
    pub async fn connect_method(&self, method: ConnectMethod) -> Result<Value, CliError> {
        let mut args = vec!["connectmethod".to_string()];
        method.push_args(&mut args);
        self.run_cmd(&args).await
    }

    pub async fn show_connect_method(&self) -> Result<Value, CliError> {
        self.run_cmd(["show", "connectmethod"]).await
    }

    //
    // Account
    //

    /// Log in; the returned [`State`] tells you whether it stuck.
    pub async fn login(&self, user: &str, password: &str) -> Result<State, CliError> {
        let response = self.run_cmd(["login", user, password]).await?;
        State::from_response(&response)
    }

    /// Log out; [`State::LoggedOut`] on success.
    pub async fn logout(&self) -> Result<State, CliError> {
        let response = self.run_cmd(["logout"]).await?;
        State::from_response(&response)
    }

    //
    // Getters
    //

    pub async fn version(&self) -> Result<Value, CliError> {
        self.run_cmd(["version"]).await
    }

    /// All servers, public and private.
    pub async fn show_servers(&self) -> Result<Value, CliError> {
        self.run_cmd(["show", "servers"]).await
    }

    pub async fn show_privacy(&self) -> Result<Value, CliError> {
        self.run_cmd(["show", "privacy"]).await
    }

    pub async fn show_settings(&self) -> Result<Value, CliError> {
        self.run_cmd(["show", "settings"]).await
    }

    /// Adapters the daemon can bond, with their ids, priorities and
    /// limits.
    pub async fn show_adapters(&self) -> Result<Value, CliError> {
        self.run_cmd(["show", "adapters"]).await
    }

    pub async fn show_current_server(&self) -> Result<Value, CliError> {
        self.run_cmd(["show", "currentserver"]).await
    }

    pub async fn show_user(&self) -> Result<Value, CliError> {
        self.run_cmd(["show", "user"]).await
    }

    /// Current daemon state (CONNECTED, CONNECTING, ...).
    pub async fn state(&self) -> Result<State, CliError> {
        let response = self.run_cmd(["state"]).await?;
        State::from_response(&response)
    }

    //
    // Captive portal
    //

    /// Adapters currently blocked by a captive portal.
    pub async fn captive_portal_check(&self) -> Result<Value, CliError> {
        self.run_cmd(["captiveportal", "check"]).await
    }

    /// Start or stop the local proxy that intercepts captive-portal
    /// traffic on the given adapter.
    pub async fn captive_portal_login(
        &self,
        proxy: bool,
        adapter_id: Option<&str>,
    ) -> Result<Value, CliError> {
        let mut args = vec!["captiveportal", "login", on_off(proxy)];
        if let Some(adapter_id) = adapter_id {
            if proxy {
                args.push(adapter_id);
            }
        }
        self.run_cmd(&args).await
    }

    //
    // Streaming bypass
    //

    /// Add, remove, or replace domains on the streaming-bypass list,
    /// e.g. `streaming_bypass_domains(ListOp::Add, "example.com news.example")`.
    pub async fn streaming_bypass_domains(
        &self,
        op: ListOp,
        domains: &str,
    ) -> Result<Value, CliError> {
        self.run_cmd(["streamingbypass", "domains", op.as_str(), domains])
            .await
    }

    /// Add, remove, or replace IPv4 addresses on the streaming-bypass
    /// list.
    pub async fn streaming_bypass_ipv4(&self, op: ListOp, addrs: &str) -> Result<Value, CliError> {
        self.run_cmd(["streamingbypass", "ipv4", op.as_str(), addrs])
            .await
    }

    /// Add, remove, or replace IPv6 addresses on the streaming-bypass
    /// list.
    pub async fn streaming_bypass_ipv6(&self, op: ListOp, addrs: &str) -> Result<Value, CliError> {
        self.run_cmd(["streamingbypass", "ipv6", op.as_str(), addrs])
            .await
    }

    /// Add, remove, or replace ports on the streaming-bypass list; each
    /// entry is `<port>/<proto>` or `<begin>-<end>/<proto>`.
    pub async fn streaming_bypass_ports(&self, op: ListOp, ports: &str) -> Result<Value, CliError> {
        self.run_cmd(["streamingbypass", "ports", op.as_str(), ports])
            .await
    }

    /// Toggle the streaming bypass for a predefined service by name.
    pub async fn streaming_bypass_service(
        &self,
        service: &str,
        enabled: bool,
    ) -> Result<Value, CliError> {
        self.run_cmd(["streamingbypass", "service", service, on_off(enabled)])
            .await
    }

    //
    // Per-adapter settings
    //

    /// Set the scheduling priority of one adapter (`show_adapters` is
    /// where the ids come from).
    pub async fn adapter_priority(
        &self,
        adapter_id: &str,
        priority: Priority,
    ) -> Result<Value, CliError> {
        self.run_cmd(["adapter", "priority", adapter_id, priority.as_str()])
            .await
    }

    /// Toggle encryption for one adapter. Calling the global
    /// [`Client::encryption`] resets every per-adapter override.
    pub async fn adapter_encryption(
        &self,
        adapter_id: &str,
        encrypt: bool,
    ) -> Result<Value, CliError> {
        self.run_cmd(["adapter", "encryption", adapter_id, on_off(encrypt)])
            .await
    }

    /// Rate-limit one adapter, in bits per second; 0 removes the limit.
    pub async fn adapter_rate_limit(&self, adapter_id: &str, bps: u64) -> Result<Value, CliError> {
        let bps = bps.to_string();
        self.run_cmd(["adapter", "ratelimit", adapter_id, bps.as_str()])
            .await
    }

    /// Rate limit applied only beyond the adapter's data cap.
    pub async fn adapter_over_rate_limit(
        &self,
        adapter_id: &str,
        bps: u64,
    ) -> Result<Value, CliError> {
        let bps = bps.to_string();
        self.run_cmd(["adapter", "overratelimit", adapter_id, bps.as_str()])
            .await
    }

    /// Daily usage limit for one adapter, in bytes; 0 removes the limit.
    pub async fn adapter_daily_data_limit(
        &self,
        adapter_id: &str,
        bytes: u64,
    ) -> Result<Value, CliError> {
        let bytes = bytes.to_string();
        self.run_cmd(["adapter", "datalimit", "daily", adapter_id, bytes.as_str()])
            .await
    }

    /// Grant additional daily data on top of the configured limit.
    pub async fn adapter_daily_boost(&self, bytes: u64) -> Result<Value, CliError> {
        let bytes = bytes.to_string();
        self.run_cmd(["adapter", "datalimit", "dailyboost", bytes.as_str()])
            .await
    }

    /// Monthly usage limit for one adapter; `reset_day` is the day of
    /// the month usage starts over.
    pub async fn adapter_monthly_data_limit(
        &self,
        adapter_id: &str,
        bytes: u64,
        reset_day: u8,
    ) -> Result<Value, CliError> {
        let bytes = bytes.to_string();
        let reset_day = reset_day.to_string();
        self.run_cmd([
            "adapter",
            "datalimit",
            "monthly",
            adapter_id,
            bytes.as_str(),
            reset_day.as_str(),
        ])
        .await
    }

    /// Zero the usage counters of one adapter, restarting daily and
    /// monthly limits.
    pub async fn adapter_reset_usage(&self, adapter_id: &str) -> Result<Value, CliError> {
        self.run_cmd(["adapter", "resetusage", adapter_id]).await
    }

    //
    // Global settings
    //

    /// Set forwarded ports; empty slices clear all forwarding.
    pub async fn forward_ports(&self, tcp: &[u16], udp: &[u16]) -> Result<Value, CliError> {
        let mut args = vec!["ports".to_string()];
        args.extend(tcp.iter().map(|port| format!("{port}/tcp")));
        args.extend(udp.iter().map(|port| format!("{port}/udp")));
        self.run_cmd(&args).await
    }

    /// Switch between redundant, speed, and streaming bonding modes.
    pub async fn mode(&self, mode: Mode) -> Result<Value, CliError> {
        self.run_cmd(["mode", mode.as_str()]).await
    }

    pub async fn encryption(&self, encrypt: bool) -> Result<Value, CliError> {
        self.run_cmd(["encryption", on_off(encrypt)]).await
    }

    /// Toggle jumbo MTU mode.
    pub async fn jumbo(&self, enabled: bool) -> Result<Value, CliError> {
        self.run_cmd(["jumbo", on_off(enabled)]).await
    }

    pub async fn packet_aggregation(&self, enabled: bool) -> Result<Value, CliError> {
        self.run_cmd(["packetaggr", on_off(enabled)]).await
    }

    pub async fn header_compression(&self, enabled: bool) -> Result<Value, CliError> {
        self.run_cmd(["headercompression", on_off(enabled)]).await
    }

    /// Toggle the kill switch (Windows only).
    pub async fn kill_switch(&self, enabled: bool) -> Result<Value, CliError> {
        self.run_cmd(["privacy", "killswitch", on_off(enabled)])
            .await
    }

    /// Toggle DNS leak protection (Windows only).
    pub async fn dns_leak(&self, enabled: bool) -> Result<Value, CliError> {
        self.run_cmd(["privacy", "dnsleak", on_off(enabled)]).await
    }

    /// Per-connection overflow threshold in mbps.
    pub async fn overflow(&self, threshold_mbps: f64) -> Result<Value, CliError> {
        let threshold = threshold_mbps.to_string();
        self.run_cmd(["overflow", threshold.as_str()]).await
    }

    /// Whether to connect automatically on login.
    pub async fn startup_connect(&self, enabled: bool) -> Result<Value, CliError> {
        self.run_cmd(["startupconnect", on_off(enabled)]).await
    }

    /// Whether the tunnel takes the default route; turn this off only if
    /// you are managing routing rules yourself.
    pub async fn route_default(&self, enabled: bool) -> Result<Value, CliError> {
        self.run_cmd(["route", "default", on_off(enabled)]).await
    }

    pub async fn transport(&self, transport: Transport) -> Result<Value, CliError> {
        self.run_cmd(["transport", transport.as_str()]).await
    }

    /// Run a speed test and return the final results; takes around 30
    /// seconds per connection.
    pub async fn speedtest(&self) -> Result<Value, CliError> {
        self.run_cmd_with_timeout(["speedtest"], SPEEDTEST_TIMEOUT)
            .await
    }

    /// Ask the daemon process to exit.
    pub async fn daemon_exit(&self) -> Result<State, CliError> {
        let response = self.run_cmd(["daemon", "exit"]).await?;
        State::from_response(&response)
    }

    //
    // Safe browsing
    //

    pub async fn safe_browsing_initialize(&self, settings: &str) -> Result<Value, CliError> {
        self.run_cmd(["safebrowsing", "initialize", settings]).await
    }

    pub async fn safe_browsing_configure(&self, settings: &str) -> Result<Value, CliError> {
        self.run_cmd(["safebrowsing", "config", settings]).await
    }

    pub async fn safe_browsing_enable(&self, enabled: bool) -> Result<Value, CliError> {
        self.run_cmd(["safebrowsing", "enable", on_off(enabled)])
            .await
    }

    pub async fn safe_browsing_stats(&self) -> Result<Value, CliError> {
        self.run_cmd(["safebrowsing", "stats"]).await
    }

    /// Collect safe-browsing error records for `seconds`, in arrival
    /// order. A duration of 0 is rejected; use
    /// [`Client::live_safe_browsing_errors`] for unbounded sessions.
    pub async fn safe_browsing_errors(&self, seconds: u32) -> Result<Vec<Value>, CliError> {
        if seconds == 0 {
            return Err(CliError::ZeroDuration("safebrowsing errors"));
        }
        collect(self.safe_browsing_errors_reader(seconds)).await
    }

    /// Stream safe-browsing error records to `handler`; 0 seconds runs
    /// until cancelled.
    pub async fn live_safe_browsing_errors<H>(
        &self,
        seconds: u32,
        handler: &mut H,
    ) -> Result<(), CliError>
    where
        H: RecordHandler + ?Sized,
    {
        self.safe_browsing_errors_reader(seconds).run(handler).await
    }

    /// Reader for the `safebrowsing errors` command, not yet running;
    /// grab the cancel handle before driving it.
    pub fn safe_browsing_errors_reader(&self, seconds: u32) -> StreamingReader {
        let seconds = seconds.to_string();
        self.streaming_reader(&["safebrowsing", "errors", seconds.as_str()])
    }

    //
    // Stats
    //

    /// Collect `stats` records for `seconds`, returning them in arrival
    /// order. A duration of 0 is rejected — the CLI would stream forever;
    /// use [`Client::live_stats`] for that.
    pub async fn stats(&self, seconds: u32) -> Result<Vec<Value>, CliError> {
        if seconds == 0 {
            return Err(CliError::ZeroDuration("stats"));
        }
        collect(self.stats_reader(seconds)).await
    }

    /// Stream `stats` records to `handler` as they arrive; 0 seconds
    /// runs until cancelled.
    pub async fn live_stats<H>(&self, seconds: u32, handler: &mut H) -> Result<(), CliError>
    where
        H: RecordHandler + ?Sized,
    {
        self.stats_reader(seconds).run(handler).await
    }

    /// Reader for the `stats` command, not yet running; grab the cancel
    /// handle before driving it.
    pub fn stats_reader(&self, seconds: u32) -> StreamingReader {
        // the CLI emits nothing at all for a 1 second run
        let seconds = if seconds == 1 { 2 } else { seconds };
        let seconds = seconds.to_string();
        self.streaming_reader(&["stats", seconds.as_str()])
    }

    //
    // Internal plumbing
    //

    fn streaming_reader(&self, args: &[&str]) -> StreamingReader {
        StreamingReader::new(CliCommandBuilder::new(&self.cli_path).args(args).build())
    }

    async fn run_cmd<I, S>(&self, args: I) -> Result<Value, CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run_cmd_with_timeout(args, DEFAULT_TIMEOUT).await
    }

    async fn run_cmd_with_timeout<I, S>(
        &self,
        args: I,
        timeout: Duration,
    ) -> Result<Value, CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let command = CliCommandBuilder::new(&self.cli_path)
            .args(args)
            .timeout(timeout)
            .build();
        let name = command.args.first().cloned().unwrap_or_default();
        let output = self.runner.run(command).await?;
        match output.status {
            ExitStatus::Success => parse_last_record(&name, &output.stdout),
            ExitStatus::Error(code) => {
                Err(CliError::from_exit(code, &output.stderr, &output.stdout))
            }
            ExitStatus::Signal(signal) => Err(CliError::ExitStatus {
                code: 128 + signal,
                message: format!("terminated by signal {signal}"),
            }),
        }
    }
}

/// Drive a streaming reader to completion, collecting records in order.
async fn collect(reader: StreamingReader) -> Result<Vec<Value>, CliError> {
    let mut records = Vec::new();
    let mut push = |record: Value| -> anyhow::Result<()> {
        records.push(record);
        Ok(())
    };
    reader.run(&mut push).await?;
    Ok(records)
}

/// The CLI may print progress records before its final response; only the
/// last blank-line-delimited segment is the command's result.
fn parse_last_record(command: &str, stdout: &str) -> Result<Value, CliError> {
    let normalized = stdout.replace("\r\n", "\n");
    let last = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .last()
        .ok_or_else(|| CliError::NoOutput(command.to_string()))?;
    serde_json::from_str(last).map_err(|_| {
        tracing::error!("bad json from {command}: ({last})");
        CliError::MalformedOutput(last.to_string())
    })
}
