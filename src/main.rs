use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use filelog::config::{self, ExecutionMode, LogConfig, CONFIG_ENV};
use filelog::diagnostics;
use filelog::logging::{Context, Logger};

const USAGE: &str = "usage: filelog [--config FILE] [--streaming] <category> <message...>";

/// Parsed command line
#[derive(Debug, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    streaming: bool,
    category: String,
    message: String,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<Args>> {
    let mut config = None;
    let mut streaming = false;
    let mut positional = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--streaming" => streaming = true,
            "--config" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => bail!("--config needs a file\n{}", USAGE),
            },
            _ => positional.push(arg),
        }
    }

    if positional.len() < 2 {
        bail!("missing category or message\n{}", USAGE);
    }
    let category = positional.remove(0);

    Ok(Some(Args {
        config,
        streaming,
        category,
        message: positional.join(" "),
    }))
}

fn main() -> Result<()> {
    diagnostics::init_diagnostics()?;

    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config_path = args
        .config
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let mut log_config = match config_path {
        Some(path) => LogConfig::load(&path)?,
        None => LogConfig::default(),
    };
    if log_config.path.is_empty() {
        log_config.path = config::default_logs_dir().to_string_lossy().into_owned();
    }

    let mode = if args.streaming {
        ExecutionMode::Streaming
    } else {
        ExecutionMode::from_env()
    };

    let mut logger = Logger::new(log_config, mode).context("Failed to set up logger")?;

    let written = if mode.is_streaming() {
        logger.write(args.message, args.category, true)?
    } else {
        logger.log(args.category, args.message, &Context::new());
        logger.save()?
    };
    if !written {
        bail!(
            "Failed to write log file under {}",
            logger.sink().base_dir().display()
        );
    }

    match logger.sink().prune_rotated() {
        Ok(count) if count > 0 => tracing::info!("Pruned {} rotated log files", count),
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to prune rotated log files: {:#}", e),
    }

    Ok(())
}
