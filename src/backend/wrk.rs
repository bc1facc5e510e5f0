//! External `wrk` backend: Lua script generation, invocation, output parsing

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;

use crate::catalog::ScenarioSpec;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::report::MetricReport;

use super::LoadGenerator;

/// Connections wrk opens in total, across its threads
const WRK_CONNECTIONS: usize = 256;

/// Percentiles read from wrk's latency distribution
const PERCENTILES: [u8; 5] = [50, 75, 90, 95, 99];

/// Backend that delegates load generation to an installed `wrk` binary
///
/// A scenario's payload mix is rendered into a Lua script that reproduces
/// the weighted variant selection inside wrk's request hook. wrk's stdout is
/// parsed for throughput, error counters and the latency distribution, and
/// the result is discarded whenever the numbers look like a broken run: any
/// socket error, or throughput below the configured floor, means the target
/// or the harness misbehaved and the built-in engine should measure instead.
#[derive(Debug)]
pub struct WrkBackend {
    binary: Option<PathBuf>,
}

impl WrkBackend {
    /// Locate `wrk` on the PATH
    pub fn from_path() -> Self {
        Self {
            binary: find_in_path("wrk"),
        }
    }

    /// Use an explicit binary location
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }
}

impl LoadGenerator for WrkBackend {
    fn name(&self) -> &str {
        "wrk"
    }

    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn run(&self, scenario: &ScenarioSpec, config: &RunConfig) -> Result<MetricReport> {
        let binary = self
            .binary
            .as_deref()
            .ok_or_else(|| Error::backend_unavailable("wrk not found on PATH"))?;
        config.validate().map_err(|e| Error::config(e.to_string()))?;
        scenario.validate()?;

        let script = render_script(scenario);
        let mut script_file = tempfile::Builder::new()
            .prefix("loadgen-")
            .suffix(".lua")
            .tempfile()?;
        script_file.write_all(script.as_bytes())?;
        script_file.flush()?;

        let url = format!(
            "http://{}:{}{}",
            scenario.host, scenario.port, scenario.path
        );
        tracing::debug!(%url, threads = config.threads, "invoking wrk");

        let output = Command::new(binary)
            .arg("-t")
            .arg(config.threads.to_string())
            .arg("-c")
            .arg(WRK_CONNECTIONS.to_string())
            .arg("-d")
            .arg(format!("{}s", config.duration.as_secs().max(1)))
            .arg("-s")
            .arg(script_file.path())
            .arg("--latency")
            .arg(&url)
            .output()
            .map_err(|e| Error::backend_unavailable(format!("failed to spawn wrk: {e}")))?;

        if !output.status.success() {
            return Err(Error::backend_unavailable(format!(
                "wrk exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let metrics = parse_output(&stdout);
        metrics.sanity_check(config.sanity_floor)?;
        Ok(metrics.into_report(&scenario.name))
    }
}

/// Counters and percentiles extracted from one wrk run
#[derive(Debug, Default, PartialEq)]
pub(crate) struct WrkMetrics {
    pub(crate) throughput: Option<f64>,
    pub(crate) non_2xx_3xx: Option<u64>,
    pub(crate) socket_errors: Option<u64>,
    /// (percentile, latency in milliseconds)
    pub(crate) percentiles: Vec<(u8, f64)>,
}

impl WrkMetrics {
    /// Reject runs whose numbers indicate a broken measurement
    fn sanity_check(&self, floor: f64) -> Result<()> {
        if let Some(errs) = self.socket_errors {
            if errs > 0 {
                return Err(Error::backend_sanity(format!("{errs} socket errors")));
            }
        }
        let throughput = self.throughput.unwrap_or(0.0);
        if throughput < floor {
            return Err(Error::backend_sanity(format!(
                "throughput {throughput:.1} req/s below floor {floor:.1}"
            )));
        }
        Ok(())
    }

    fn into_report(self, scenario: &str) -> MetricReport {
        let mut report = MetricReport::new();
        if let Some(v) = self.throughput {
            report.insert(format!("wrk {scenario} throughput"), v, "req/s");
        }
        if let Some(v) = self.non_2xx_3xx {
            report.insert(format!("wrk {scenario} non_2xx_3xx"), v as f64, "count");
        }
        if let Some(v) = self.socket_errors {
            report.insert(format!("wrk {scenario} socket_errors"), v as f64, "count");
        }
        for (pct, ms) in self.percentiles {
            report.insert(format!("wrk {scenario} p{pct}"), ms, "ms");
        }
        report
    }
}

/// Parse wrk stdout
///
/// Every field is optional; absent lines simply leave their metric out.
pub(crate) fn parse_output(output: &str) -> WrkMetrics {
    let mut metrics = WrkMetrics {
        throughput: capture_f64(output, r"Requests/sec:\s+([\d.]+)"),
        non_2xx_3xx: capture_u64(output, r"Non-2xx or 3xx responses:\s+(\d+)"),
        socket_errors: None,
        percentiles: Vec::new(),
    };

    if let Ok(re) =
        Regex::new(r"Socket errors:\s+connect\s+(\d+),\s+read\s+(\d+),\s+write\s+(\d+),\s+timeout\s+(\d+)")
    {
        if let Some(caps) = re.captures(output) {
            let total: u64 = (1..=4)
                .filter_map(|i| caps.get(i))
                .filter_map(|m| m.as_str().parse::<u64>().ok())
                .sum();
            metrics.socket_errors = Some(total);
        }
    }

    for pct in PERCENTILES {
        let pattern = format!(r"{pct}\s*%\s+([\d.]+)\s*(us|ms|s)");
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(output) {
            let value = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
            let unit = caps.get(2).map(|m| m.as_str());
            if let (Some(value), Some(unit)) = (value, unit) {
                if let Some(ms) = to_ms(value, unit) {
                    metrics.percentiles.push((pct, ms));
                }
            }
        }
    }

    metrics
}

fn capture_f64(output: &str, pattern: &str) -> Option<f64> {
    let re = Regex::new(pattern).ok()?;
    re.captures(output)?.get(1)?.as_str().parse().ok()
}

fn capture_u64(output: &str, pattern: &str) -> Option<u64> {
    let re = Regex::new(pattern).ok()?;
    re.captures(output)?.get(1)?.as_str().parse().ok()
}

fn to_ms(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "s" => Some(value * 1000.0),
        "ms" => Some(value),
        "us" => Some(value * 0.001),
        _ => None,
    }
}

/// Render the Lua script reproducing the scenario's payload mix
///
/// A single-variant scenario sets a static `wrk.body`; a mix installs a
/// `request` hook that redraws the variant per request. Weights are
/// normalized at render time so the cumulative draw works for any positive
/// weights, not only ones that sum to 1.
pub(crate) fn render_script(scenario: &ScenarioSpec) -> String {
    let mut headers = String::new();
    for (name, value) in &scenario.headers {
        let _ = writeln!(headers, "  [\"{name}\"] = \"{value}\",");
    }
    let _ = writeln!(headers, "  [\"Connection\"] = \"keep-alive\",");

    if scenario.variants.len() == 1 {
        return format!(
            "wrk.method = \"POST\"\n\
             local headers = {{\n{headers}}}\n\
             wrk.headers = headers\n\
             wrk.body   = [[{}]]\n",
            scenario.variants[0].body
        );
    }

    let mut bodies = String::new();
    for v in &scenario.variants {
        let _ = writeln!(bodies, "  [[{}]],", v.body);
    }

    let weights: Option<Vec<f64>> = scenario
        .variants
        .iter()
        .map(|v| v.weight)
        .collect::<Option<Vec<_>>>();
    let weights_table = match weights {
        Some(ws) => {
            let total: f64 = ws.iter().sum();
            let entries: Vec<String> = ws.iter().map(|w| format!("{}", w / total)).collect();
            format!("local weights = {{ {} }}", entries.join(", "))
        }
        None => "local weights = nil".to_string(),
    };

    format!(
        "wrk.method = \"POST\"\n\
         local headers = {{\n{headers}}}\n\
         local bodies = {{\n{bodies}}}\n\
         {weights_table}\n\
         \n\
         math.randomseed(os.time())\n\
         \n\
         local function pick_index()\n\
         \x20\x20if not weights then\n\
         \x20\x20\x20\x20return math.random(#bodies)\n\
         \x20\x20end\n\
         \x20\x20local r = math.random()\n\
         \x20\x20local acc = 0\n\
         \x20\x20for i, w in ipairs(weights) do\n\
         \x20\x20\x20\x20acc = acc + w\n\
         \x20\x20\x20\x20if r <= acc then return i end\n\
         \x20\x20end\n\
         \x20\x20return #bodies\n\
         end\n\
         \n\
         request = function()\n\
         \x20\x20local idx = pick_index()\n\
         \x20\x20local body = bodies[idx]\n\
         \x20\x20return wrk.format(\"POST\", nil, headers, body)\n\
         end\n"
    )
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
