//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use pptx_surgeon_observability::{LogConfig, LogFormat};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 3000;

/// Default staging directory for uploads and surgery outputs.
pub const DEFAULT_STAGING_DIR: &str = "uploads";

/// Directory served as static assets when `--static-dir` is not given.
pub const DEFAULT_STATIC_DIR: &str = "public";

/// Script handed to the processor when no leading arguments are configured.
pub const DEFAULT_PROCESSOR_SCRIPT: &str = "pptx-surgeon.js";

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

/// Web interface for PPTX font surgery.
#[derive(Debug, Parser)]
#[command(name = "pptx-surgeon-web", version, about)]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, env = "SURGEON_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// First port to try. Busy ports are skipped upwards.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// How many consecutive ports to try before giving up.
    #[arg(
        long,
        env = "SURGEON_MAX_PORT_ATTEMPTS",
        default_value_t = 20,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_port_attempts: u32,

    /// Flat directory holding uploads and surgery outputs.
    #[arg(long, env = "SURGEON_STAGING_DIR", default_value = DEFAULT_STAGING_DIR)]
    pub staging_dir: PathBuf,

    /// Static assets for the browser UI. Defaults to ./public if present.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Program that runs the surgeon.
    #[arg(long, env = "SURGEON_PROCESSOR", default_value = "node")]
    pub processor: String,

    /// Leading argument passed to the processor before the job flags.
    /// Repeat for several; each value is taken verbatim.
    #[arg(long = "processor-arg", allow_hyphen_values = true)]
    pub processor_args: Vec<String>,

    /// Whitespace-separated leading arguments. Ignored when
    /// `--processor-arg` is given.
    #[arg(
        long = "processor-args",
        env = "SURGEON_PROCESSOR_ARGS",
        allow_hyphen_values = true
    )]
    pub processor_args_list: Option<String>,

    /// Deadline for a single analyze/process job. 0 disables it.
    #[arg(long, env = "SURGEON_JOB_TIMEOUT_SECS", default_value_t = 600)]
    pub job_timeout_secs: u64,

    /// Maximum accepted upload size in MiB.
    #[arg(long, env = "SURGEON_MAX_UPLOAD_MB", default_value_t = 200)]
    pub max_upload_mb: usize,

    #[arg(long, env = "SURGEON_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    /// Also write daily-rolling JSON logs here.
    #[arg(long, env = "SURGEON_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            max_port_attempts: self.max_port_attempts,
            staging_dir: self.staging_dir.clone(),
            static_dir: resolve_static_dir(self.static_dir.clone()),
            processor_program: self.processor.clone(),
            processor_args: self.leading_processor_args(),
            job_timeout: (self.job_timeout_secs > 0)
                .then(|| Duration::from_secs(self.job_timeout_secs)),
            max_upload_bytes: self.max_upload_mb.saturating_mul(MIB),
        }
    }

    /// Repeated flags win over the space-separated list; with neither, the
    /// default script.
    fn leading_processor_args(&self) -> Vec<String> {
        if !self.processor_args.is_empty() {
            return self
                .processor_args
                .iter()
                .filter(|arg| !arg.is_empty())
                .cloned()
                .collect();
        }
        match &self.processor_args_list {
            Some(list) => list.split_whitespace().map(str::to_string).collect(),
            None => vec![DEFAULT_PROCESSOR_SCRIPT.to_string()],
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            format: match self.log_format {
                LogFormatArg::Text => LogFormat::Text,
                LogFormatArg::Json => LogFormat::Json,
            },
            log_dir: self.log_dir.clone(),
        }
    }
}

/// Explicit directory wins; otherwise `./public` if it exists; otherwise
/// API-only mode.
fn resolve_static_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let public = PathBuf::from(DEFAULT_STATIC_DIR);
        public.is_dir().then_some(public)
    })
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub max_port_attempts: u32,
    pub staging_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub processor_program: String,
    pub processor_args: Vec<String>,
    pub job_timeout: Option<Duration>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            max_port_attempts: 20,
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            static_dir: None,
            processor_program: "node".to_string(),
            processor_args: vec![DEFAULT_PROCESSOR_SCRIPT.to_string()],
            job_timeout: Some(Duration::from_secs(600)),
            max_upload_bytes: 200 * MIB,
        }
    }
}

impl ServerConfig {
    /// Default configuration rooted at the given staging directory.
    pub fn with_staging_dir(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_flags() {
        let cli = Cli::try_parse_from([
            "pptx-surgeon-web",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--staging-dir",
            "/tmp/staging",
            "--processor",
            "surgeon",
            "--processor-arg",
            "--quiet",
            "--job-timeout-secs",
            "0",
            "--max-upload-mb",
            "1",
            "--log-format",
            "json",
        ])
        .unwrap();

        let config = cli.server_config();
        assert_eq!(config.host.to_string(), "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/staging"));
        assert_eq!(config.processor_program, "surgeon");
        assert_eq!(config.processor_args, vec!["--quiet".to_string()]);
        assert!(config.job_timeout.is_none());
        assert_eq!(config.max_upload_bytes, MIB);
        assert_eq!(cli.log_config().format, LogFormat::Json);
    }

    #[test]
    fn test_processor_arg_keeps_spaces() {
        let cli = Cli::try_parse_from([
            "pptx-surgeon-web",
            "--processor-arg",
            "/opt/My Tools/pptx-surgeon.js",
            "--processor-args",
            "ignored.js",
        ])
        .unwrap();
        assert_eq!(
            cli.server_config().processor_args,
            vec!["/opt/My Tools/pptx-surgeon.js".to_string()]
        );
    }

    #[test]
    fn test_processor_args_list_splits_on_whitespace() {
        let cli = Cli::try_parse_from([
            "pptx-surgeon-web",
            "--processor-args",
            "--max-old-space-size=4096  surgeon.js",
        ])
        .unwrap();
        assert_eq!(
            cli.server_config().processor_args,
            vec![
                "--max-old-space-size=4096".to_string(),
                "surgeon.js".to_string()
            ]
        );
    }

    #[test]
    fn test_processor_args_default_to_script() {
        let cli = Cli::try_parse_from(["pptx-surgeon-web"]).unwrap();
        if std::env::var_os("SURGEON_PROCESSOR_ARGS").is_none() {
            assert_eq!(
                cli.server_config().processor_args,
                vec![DEFAULT_PROCESSOR_SCRIPT.to_string()]
            );
        }
    }

    #[test]
    fn test_zero_port_attempts_rejected() {
        let result = Cli::try_parse_from(["pptx-surgeon-web", "--max-port-attempts", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_static_dir_wins() {
        let dir = resolve_static_dir(Some(PathBuf::from("/srv/ui")));
        assert_eq!(dir, Some(PathBuf::from("/srv/ui")));
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::with_staging_dir("/tmp/x");
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.job_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.processor_args, vec!["pptx-surgeon.js".to_string()]);
    }
}
