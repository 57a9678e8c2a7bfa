use anyhow::{Context, Result};
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const RUST_LOG_ENV: &str = "RUST_LOG";

/// Grounded in the teacher's `coordinator::logger::init_tracing`: an
/// `EnvFilter` seeded with sane defaults for this crate's own noisy
/// dependencies, overridable via `RUST_LOG`, feeding either a JSON or
/// human-readable `fmt` layer.
pub fn init_tracing(level: LevelFilter, json_format: bool) -> Result<()> {
    if level == LevelFilter::OFF {
        return Ok(());
    }

    let mut filter = EnvFilter::new("")
        .add_directive(Directive::from(level))
        .add_directive("hyper=warn".parse()?)
        .add_directive("rustls=warn".parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("tonic=info".parse()?);

    if let Some(Ok(env)) = std::env::var_os(RUST_LOG_ENV).map(|s| s.into_string()) {
        for directive in env.split(',') {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("ignoring log directive `{directive}`: {e}"),
            }
        }
    }

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let fmt_layer = if json_format {
        fmt_layer.json().boxed()
    } else {
        fmt_layer.boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to initialize tracing")?;

    Ok(())
}
