mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::get_args();
    setup_logger(cmd.verbose());
    log::trace!("Args: {:?}", cmd);

    cmd.run().await.map_err(|error| {
        log::error!("{:?}", error);
        anyhow::anyhow!("unrecoverable {} failure", clap::crate_name!())
    })
}

/// `-v` raises our own crates; dependencies stay at warn unless
/// `RUST_LOG` says otherwise.
pub(crate) fn setup_logger(level: u8) {
    let mut builder = pretty_env_logger::formatted_timed_builder();

    let log_level = match level {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    builder.filter_level(log::LevelFilter::Warn);
    for module in ["smartwayz", "smartwayz_client"] {
        builder.filter_module(module, log_level);
    }
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format_timestamp_millis();
    builder.init();
}
