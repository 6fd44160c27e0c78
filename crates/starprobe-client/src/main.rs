// # starprobe - Measurement CLI
//
// Runs latency, download, upload and ISP checks against a starprobed server.
//
// ```bash
// starprobe --server http://localhost:8000          # full run
// starprobe --latency --latency-samples 20          # latency only
// starprobe --download --upload --json              # throughput, as JSON
// ```

use anyhow::{Context, Result};
use clap::Parser;
use starprobe_client::{
    DEFAULT_DOWNLOAD_BYTES, DEFAULT_DOWNLOAD_STREAMS, DEFAULT_LATENCY_SAMPLES,
    DEFAULT_UPLOAD_BYTES, SpeedTestClient, SpeedTestPlan, SpeedTestReport, format_speed,
};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "starprobe")]
#[command(about = "Measure latency, throughput and ISP against a starprobe server")]
struct Args {
    /// Server root URL
    #[arg(short, long, env = "STARPROBE_SERVER", default_value = "http://localhost:8000")]
    server: String,

    /// Number of latency probes
    #[arg(long, default_value_t = DEFAULT_LATENCY_SAMPLES)]
    latency_samples: usize,

    /// Bytes per download stream
    #[arg(long, default_value_t = DEFAULT_DOWNLOAD_BYTES)]
    download_bytes: u64,

    /// Parallel download streams
    #[arg(long, default_value_t = DEFAULT_DOWNLOAD_STREAMS)]
    download_streams: usize,

    /// Upload size in bytes
    #[arg(long, default_value_t = DEFAULT_UPLOAD_BYTES)]
    upload_bytes: u64,

    /// Run the latency phase
    #[arg(short, long)]
    latency: bool,

    /// Run the download phase
    #[arg(short, long)]
    download: bool,

    /// Run the upload phase
    #[arg(short, long)]
    upload: bool,

    /// Fetch the ISP classification
    #[arg(short, long)]
    network_info: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Without phase flags every phase runs
    fn plan(&self) -> SpeedTestPlan {
        let all = !(self.latency || self.download || self.upload || self.network_info);

        SpeedTestPlan {
            latency_samples: self.latency_samples,
            download_bytes: self.download_bytes,
            download_streams: self.download_streams,
            upload_bytes: self.upload_bytes,
            latency: all || self.latency,
            download: all || self.download,
            upload: all || self.upload,
            network_info: all || self.network_info,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::from(1);
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            return ExitCode::from(2);
        }
    };

    match rt.block_on(run(&args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Speed test failed: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let client = SpeedTestClient::new(&args.server)?;
    let report = client
        .run(&args.plan())
        .await
        .with_context(|| format!("against {}", args.server))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SpeedTestReport) {
    println!("Server: {}", report.server);

    if let Some(latency) = &report.latency {
        println!(
            "Latency:  {:.1} ms avg ({:.1}-{:.1} ms), jitter {:.1} ms over {} samples",
            latency.avg_ms,
            latency.min_ms,
            latency.max_ms,
            latency.jitter_ms,
            latency.samples.len()
        );
    }

    if let Some(download) = &report.download {
        println!(
            "Download: {} ({} bytes in {:.2} s)",
            format_speed(download.mbps),
            download.bytes,
            download.seconds
        );
    }

    if let Some(upload) = &report.upload {
        println!(
            "Upload:   {} (server saw {})",
            format_speed(upload.client.mbps),
            format_speed(upload.server.throughput_mbps)
        );
    }

    if let Some(network) = &report.network {
        let ip = network.ip.as_ref().map(|ip| ip.as_str()).unwrap_or("unknown");
        println!(
            "ISP:      {} ({}){}",
            network.isp,
            ip,
            if network.is_starlink { " - Starlink detected" } else { "" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_phase_flags_runs_everything() {
        let args = Args::parse_from(["starprobe"]);
        let plan = args.plan();
        assert!(plan.latency && plan.download && plan.upload && plan.network_info);
        assert_eq!(plan, SpeedTestPlan::default());
    }

    #[test]
    fn test_phase_flags_select() {
        let args = Args::parse_from(["starprobe", "--latency", "--upload", "--upload-bytes", "1000"]);
        let plan = args.plan();
        assert!(plan.latency && plan.upload);
        assert!(!plan.download && !plan.network_info);
        assert_eq!(plan.upload_bytes, 1000);
    }
}
