//! Expands range text into a pool and runs it through the dispatcher with a
//! scripted connector.
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};

use frontprobe::address::{parse_ranges, RangeError};
use frontprobe::dispatcher::{Dispatcher, SelectionPolicy};
use frontprobe::pool::AddressPool;
use frontprobe::prober::{Connector, ProbeError, Prober};

/// Passes addresses whose last octet is even, after failing `flaky` times first.
struct EvenOctets {
    flaky: usize,
    calls: AtomicUsize,
}

impl Connector for EvenOctets {
    fn attempt(&self, ip: IpAddr) -> BoxFuture<'_, Result<(), ProbeError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let IpAddr::V4(v4) = ip else {
                return Err(ProbeError::Mismatch("status:missing".to_owned()));
            };
            if v4.octets()[3] % 2 == 1 {
                return Err(ProbeError::Mismatch("server:nginx".to_owned()));
            }
            if call < self.flaky {
                return Err(ProbeError::Handshake(std::io::Error::other("reset")));
            }
            Ok(())
        })
    }
}

fn offline_resolver() -> TokioAsyncResolver {
    TokioAsyncResolver::tokio(ResolverConfig::new(), ResolverOpts::default())
}

#[tokio::test]
async fn exhaustive_run_over_parsed_ranges() {
    let ips = parse_ranges("10.9.8.250-255, 10.9.9.0/30", &offline_resolver())
        .await
        .unwrap();
    // .250-.254, then .1-.2 of the /30
    assert_eq!(ips.len(), 7);

    let connector = EvenOctets {
        flaky: 0,
        calls: AtomicUsize::new(0),
    };
    let dispatcher = Dispatcher::new(Prober::new(connector, 3), 2, true, true);

    let state = dispatcher
        .run(AddressPool::from(ips), SelectionPolicy::Exhaustive)
        .await;

    let expected: HashSet<IpAddr> = ["10.9.8.250", "10.9.8.252", "10.9.8.254", "10.9.9.2"]
        .into_iter()
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(state.processed, 7);
    assert_eq!(state.good.iter().copied().collect::<HashSet<_>>(), expected);
}

#[tokio::test]
async fn retries_are_invisible_to_the_run() {
    let ips = parse_ranges("10.1.1.2", &offline_resolver()).await.unwrap();

    let connector = EvenOctets {
        flaky: 2,
        calls: AtomicUsize::new(0),
    };
    let dispatcher = Dispatcher::new(Prober::new(connector, 3), 10, true, true);

    let state = dispatcher
        .run(AddressPool::from(ips), SelectionPolicy::RandomSample { target: 1 })
        .await;

    assert_eq!(state.processed, 1);
    assert_eq!(state.good, ["10.1.1.2".parse::<IpAddr>().unwrap()]);
}

#[tokio::test]
async fn unparseable_text_never_starts_a_run() {
    let err = parse_ranges("nothing to see", &offline_resolver())
        .await
        .unwrap_err();

    assert!(matches!(err, RangeError::NoMatch(_)));
}
