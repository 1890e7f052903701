#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown, clippy::if_not_else, clippy::non_ascii_literal)]

use frontprobe::address::{get_resolver, parse_ranges};
use frontprobe::dispatcher::Dispatcher;
use frontprobe::input::{Config, Opts, RunMode};
use frontprobe::pool::AddressPool;
use frontprobe::prober::{FrontendConnector, Prober};
use frontprobe::{detail, warning};

use std::time::Duration;

use anyhow::Context;

#[cfg(unix)]
const DEFAULT_FILE_DESCRIPTORS_LIMIT: u64 = 8000;

#[tokio::main]
/// Finds addresses answering like a TLS frontend.
/// The run itself lives in the dispatcher module.
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut opts: Opts = Opts::read();
    let config = Config::read(opts.config_path.clone())?;
    opts.merge(&config);

    log::debug!("Main() `opts` arguments are {opts:?}");

    #[cfg(unix)]
    {
        let limit = adjust_ulimit_size(&opts);
        if u64::try_from(opts.batch_size).unwrap_or(u64::MAX) > limit {
            warning!(
                format!("Batch size {} is above the open file limit {limit}; consider -u.", opts.batch_size),
                opts.greppable,
                opts.accessible
            );
        }
    }

    let mode = opts
        .mode()
        .with_context(|| format!("reading range file {:?}", opts.iprange))?;

    match &mode {
        RunMode::Exhaustive { .. } => {
            detail!("Parsing the given ranges...", opts.greppable, opts.accessible);
        }
        RunMode::RandomSample { target } => detail!(
            format!("Sampling the bundled ranges for {target} good addresses..."),
            opts.greppable,
            opts.accessible
        ),
    }

    let resolver = get_resolver(&opts.resolver).await;
    let ips = match parse_ranges(mode.ranges(), &resolver).await {
        Ok(ips) => ips,
        Err(e) => {
            warning!(e.to_string());
            return Err(e.into());
        }
    };

    detail!(
        format!("Dispatching {} candidates...", ips.len()),
        opts.greppable,
        opts.accessible
    );

    let connector = FrontendConnector::new(Duration::from_millis(u64::from(opts.timeout)))?;
    let dispatcher = Dispatcher::new(
        Prober::new(connector, opts.tries),
        opts.batch_size,
        opts.greppable,
        opts.accessible,
    );
    dispatcher.run(AddressPool::from(ips), mode.policy()).await;

    Ok(())
}

#[cfg(unix)]
fn adjust_ulimit_size(opts: &Opts) -> u64 {
    use rlimit::Resource;

    if let Some(limit) = opts.ulimit {
        if Resource::NOFILE.set(limit, limit).is_ok() {
            detail!(
                format!("Automatically increasing ulimit value to {limit}."),
                opts.greppable,
                opts.accessible
            );
        } else {
            warning!(
                "ERROR. Failed to set ulimit value.",
                opts.greppable,
                opts.accessible
            );
        }
    }

    let (soft, _) = Resource::NOFILE.get().unwrap_or((DEFAULT_FILE_DESCRIPTORS_LIMIT, 0));
    log::debug!("Open file limit is {soft}");
    soft
}
