//! Provides functions to expand range text into candidate IP addresses.
//!
//! A range text holds any number of specifications separated by arbitrary
//! non-matching text (commas, whitespace, newlines). Each specification is one of:
//!
//! - a CIDR block, `192.168.1.0/30`
//! - a per-octet range, `1.179.248-255.0-255` (a bare address is the degenerate case)
//! - a domain name, `www.example.com`
//!
//! Octet ranges are expanded over the flattened 32-bit interval between the
//! lowest and highest address they describe, not as a per-octet cartesian
//! product. `10.0.0-1.5` therefore yields every address from `10.0.0.5` to
//! `10.0.1.5`.
//!
//! Every expanded IPv4 address whose last octet is `0` or `255` is dropped.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use cidr_utils::cidr::Ipv4Inet;
use futures::{stream, StreamExt};
use hickory_resolver::{
    config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};
use itertools::Itertools;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;
use tokio::{fs, io};

/// Alternatives are tried left to right, so a CIDR block wins over an octet
/// range and an octet range wins over a domain name.
static SPEC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<addr>(?:[0-9]{1,3}\.){3}[0-9]{1,3})/(?P<prefix>[0-9]{1,2})",
        r"|(?P<range>(?:(?:[0-9]{1,3}-[0-9]{1,3}|[0-9]{1,3})\.){3}(?:[0-9]{1,3}-[0-9]{1,3}|[0-9]{1,3}))",
        r"|(?P<domain>[\w\-.]+\.\w+)",
    ))
    .expect("range specification pattern is valid")
});

/// How many domain lookups may be in flight while expanding one range text.
const RESOLVE_CONCURRENCY: usize = 10;

/// Intervals spanning at least this many addresses (a /8 or wider) are
/// expanded with a warning; every address is held in memory at once.
const LARGE_INTERVAL: u32 = 1 << 24;

/// Errors raised while parsing range text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    /// Nothing in the input looked like a CIDR block, octet range or domain.
    #[error("no address range could be parsed from {0:?}")]
    NoMatch(String),
}

/// A single specification found in range text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSpec {
    /// `address/prefix`; host bits of `address` may be set.
    Cidr { address: Ipv4Addr, prefix: u8 },
    /// One `(low, high)` pair per octet; a literal octet has `low == high`.
    Octets([(u8, u8); 4]),
    /// A name resolved at expansion time.
    Domain(String),
}

impl AddressSpec {
    /// The inclusive `(first, last)` integer interval covered by a CIDR block
    /// or an octet range. Domains have no static interval.
    ///
    /// ```rust
    /// # use frontprobe::address::AddressSpec;
    /// let spec = AddressSpec::Cidr { address: "192.168.1.7".parse().unwrap(), prefix: 30 };
    /// assert_eq!(spec.interval(), Some((0xC0A8_0104, 0xC0A8_0107)));
    /// ```
    #[must_use]
    pub fn interval(&self) -> Option<(u32, u32)> {
        match self {
            Self::Cidr { address, prefix } => {
                let network = Ipv4Inet::new(*address, *prefix).ok()?.network();
                Some((
                    u32::from(network.first_address()),
                    u32::from(network.last_address()),
                ))
            }
            Self::Octets(octets) => Some(octets.iter().fold((0, 0), |(min, max), &(lo, hi)| {
                ((min << 8) | u32::from(lo), (max << 8) | u32::from(hi))
            })),
            Self::Domain(_) => None,
        }
    }

    /// Expands the specification into concrete addresses.
    ///
    /// Resolution failures of a domain yield no addresses.
    pub async fn expand(&self, resolver: &TokioAsyncResolver) -> Vec<IpAddr> {
        match self {
            Self::Domain(domain) => resolve_ips_from_host(domain, resolver)
                .await
                .into_iter()
                .filter(is_host_address)
                .collect(),
            _ => self
                .interval()
                .map(|(min, max)| {
                    if is_large_interval(min, max) {
                        warn!(
                            "{self:?} covers {} addresses and is expanded in memory",
                            u64::from(max - min) + 1
                        );
                    }
                    expand_interval(min, max).map(IpAddr::V4).collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Iterates every address in `[min, max]` except those ending in `.0` or `.255`.
///
/// An interval with `min > max` is empty.
pub fn expand_interval(min: u32, max: u32) -> impl Iterator<Item = Ipv4Addr> {
    (min..=max).map(Ipv4Addr::from).filter(is_host_v4)
}

fn is_large_interval(min: u32, max: u32) -> bool {
    max.saturating_sub(min) >= LARGE_INTERVAL - 1
}

/// Finds every specification in `text`, in input order.
///
/// A match whose numbers are out of range (an octet above 255, a prefix above
/// 32) is skipped with a warning. Only input containing no match at all is an
/// error; input whose matches are all skipped yields an empty list.
///
/// ```rust
/// # use frontprobe::address::{parse_specs, AddressSpec};
/// let specs = parse_specs("10.0.0.0/31, www.example.com").unwrap();
/// assert_eq!(specs.len(), 2);
/// assert_eq!(specs[1], AddressSpec::Domain("www.example.com".to_owned()));
/// ```
pub fn parse_specs(text: &str) -> Result<Vec<AddressSpec>, RangeError> {
    let mut matched = false;
    let specs = SPEC_REGEX
        .captures_iter(text)
        .inspect(|_| matched = true)
        .filter_map(|caps| {
            let spec = spec_from_captures(&caps);
            if spec.is_none() {
                warn!("Ignoring out of range specification {:?}", &caps[0]);
            }
            spec
        })
        .collect::<Vec<_>>();

    if matched {
        Ok(specs)
    } else {
        Err(RangeError::NoMatch(text.to_owned()))
    }
}

fn spec_from_captures(caps: &Captures<'_>) -> Option<AddressSpec> {
    if let (Some(address), Some(prefix)) = (caps.name("addr"), caps.name("prefix")) {
        // Every prefix up to 32 is accepted, /0 included. Short prefixes expand
        // to billions of addresses that are collected into one pool.
        let prefix = prefix.as_str().parse::<u8>().ok().filter(|&p| p <= 32)?;
        let address = Ipv4Addr::from_str(address.as_str()).ok()?;
        return Some(AddressSpec::Cidr { address, prefix });
    }

    if let Some(range) = caps.name("range") {
        let octets = range
            .as_str()
            .split('.')
            .map(parse_octet_range)
            .collect::<Option<Vec<_>>>()?;
        return Some(AddressSpec::Octets(octets.try_into().ok()?));
    }

    caps.name("domain")
        .map(|domain| AddressSpec::Domain(domain.as_str().to_owned()))
}

fn parse_octet_range(segment: &str) -> Option<(u8, u8)> {
    match segment.split_once('-') {
        Some((lo, hi)) => Some((lo.parse().ok()?, hi.parse().ok()?)),
        None => {
            let value = segment.parse().ok()?;
            Some((value, value))
        }
    }
}

/// Parses range text and expands every specification into addresses.
///
/// The result is the concatenation of each specification's expansion in
/// input order. Duplicates from overlapping specifications are kept.
///
/// ```rust
/// # use frontprobe::address::{get_resolver, parse_ranges};
/// # tokio_test_block_on(async {
/// let resolver = get_resolver(&None).await;
/// let ips = parse_ranges("192.168.1.0/30", &resolver).await.unwrap();
/// assert_eq!(ips.len(), 2);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub async fn parse_ranges(
    text: &str,
    resolver: &TokioAsyncResolver,
) -> Result<Vec<IpAddr>, RangeError> {
    let specs = parse_specs(text)?;
    debug!("Parsed {} range specifications", specs.len());

    let expanded = stream::iter(specs.iter())
        .map(|spec| spec.expand(resolver))
        .buffered(RESOLVE_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    Ok(expanded.into_iter().flatten().collect())
}

fn is_host_address(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_host_v4(v4),
        IpAddr::V6(_) => true,
    }
}

fn is_host_v4(ip: &Ipv4Addr) -> bool {
    !matches!(ip.octets()[3], 0 | 255)
}

/// Uses DNS to get the IPS associated with host
async fn resolve_ips_from_host(source: &str, backup_resolver: &TokioAsyncResolver) -> Vec<IpAddr> {
    if let Ok(addrs) = tokio::net::lookup_host((source, 443)).await {
        addrs.map(|addr: SocketAddr| addr.ip()).collect_vec()
    } else if let Ok(addrs) = backup_resolver.lookup_ip(source).await {
        addrs.iter().collect_vec()
    } else {
        warn!("Host {source:?} could not be resolved");
        Vec::new()
    }
}

/// Derive a DNS resolver.
///
/// 1. if the `resolver` parameter has been set:
///     1. assume the parameter is a path and attempt to read IPs.
///     2. parse the input as a comma-separated list of IPs.
/// 2. if `resolver` is not set:
///    1. attempt to derive a resolver from the system config. (e.g.
///       `/etc/resolv.conf` on *nix).
///    2. finally, build a CloudFlare-based resolver (default
///       behaviour).
pub async fn get_resolver(resolver: &Option<String>) -> TokioAsyncResolver {
    match resolver {
        Some(r) => {
            let mut config = ResolverConfig::new();
            let resolver_ips = match read_resolver_from_file(r).await {
                Ok(ips) => ips,
                Err(_) => r
                    .split(',')
                    .filter_map(|r| IpAddr::from_str(r.trim()).ok())
                    .collect::<Vec<_>>(),
            };
            for ip in resolver_ips {
                config.add_name_server(NameServerConfig::new(
                    SocketAddr::new(ip, 53),
                    Protocol::Udp,
                ));
            }
            TokioAsyncResolver::tokio(config, ResolverOpts::default())
        }
        None => TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
            TokioAsyncResolver::tokio(ResolverConfig::cloudflare_tls(), ResolverOpts::default())
        }),
    }
}

/// Parses and input file of IPs for use in DNS resolution.
async fn read_resolver_from_file(path: &str) -> io::Result<Vec<IpAddr>> {
    let ips = fs::read_to_string(path)
        .await?
        .lines()
        .filter_map(|line| IpAddr::from_str(line.trim()).ok())
        .collect();

    Ok(ips)
}

#[cfg(test)]
mod tests {
    use super::{
        expand_interval, is_host_address, is_large_interval, parse_ranges, parse_specs,
        AddressSpec, RangeError,
    };
    use hickory_resolver::{
        config::{ResolverConfig, ResolverOpts},
        TokioAsyncResolver,
    };
    use parameterized::parameterized;
    use std::net::{IpAddr, Ipv4Addr};

    /// A resolver with no name servers, so lookups fail without touching the network.
    fn offline_resolver() -> TokioAsyncResolver {
        TokioAsyncResolver::tokio(ResolverConfig::new(), ResolverOpts::default())
    }

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[tokio::test]
    async fn cidr_drops_network_and_broadcast() {
        let ips = parse_ranges("192.168.1.0/30", &offline_resolver())
            .await
            .unwrap();

        assert_eq!(ips, [v4(192, 168, 1, 1), v4(192, 168, 1, 2)]);
    }

    #[tokio::test]
    async fn cidr_with_host_bits_covers_whole_block() {
        let ips = parse_ranges("192.168.1.6/30", &offline_resolver())
            .await
            .unwrap();

        assert_eq!(
            ips,
            [
                v4(192, 168, 1, 4),
                v4(192, 168, 1, 5),
                v4(192, 168, 1, 6),
                v4(192, 168, 1, 7)
            ]
        );
    }

    #[tokio::test]
    async fn octet_range_expands_flattened_interval() {
        let ips = parse_ranges("10.0.0-1.5", &offline_resolver())
            .await
            .unwrap();

        // 10.0.0.5..=10.0.0.254 and 10.0.1.1..=10.0.1.5
        assert_eq!(ips.len(), 250 + 5);
        assert_eq!(ips.first(), Some(&v4(10, 0, 0, 5)));
        assert_eq!(ips.last(), Some(&v4(10, 0, 1, 5)));
        assert!(!ips.contains(&v4(10, 0, 0, 255)));
        assert!(!ips.contains(&v4(10, 0, 1, 0)));
    }

    #[tokio::test]
    async fn multi_range_segments_are_not_a_cartesian_product() {
        // Per-octet reading would give 10.0.{0,1}.{5,6}; the flattened
        // interval also contains 10.0.0.7 through 10.0.1.4.
        let ips = parse_ranges("10.0.0-1.5-6", &offline_resolver())
            .await
            .unwrap();

        assert!(ips.contains(&v4(10, 0, 0, 7)));
        assert!(ips.contains(&v4(10, 0, 1, 4)));
        assert_eq!(ips.first(), Some(&v4(10, 0, 0, 5)));
        assert_eq!(ips.last(), Some(&v4(10, 0, 1, 6)));
    }

    #[tokio::test]
    async fn bare_address_is_single_candidate() {
        let ips = parse_ranges("119.81.142.202", &offline_resolver())
            .await
            .unwrap();

        assert_eq!(ips, [v4(119, 81, 142, 202)]);
    }

    #[tokio::test]
    async fn mixed_specs_keep_input_order() {
        let text = "
            103.25.178.4-6,
            192.168.1.100/30
            9.9.9.9";
        let ips = parse_ranges(text, &offline_resolver()).await.unwrap();

        assert_eq!(
            ips,
            [
                v4(103, 25, 178, 4),
                v4(103, 25, 178, 5),
                v4(103, 25, 178, 6),
                v4(192, 168, 1, 100),
                v4(192, 168, 1, 101),
                v4(192, 168, 1, 102),
                v4(192, 168, 1, 103),
                v4(9, 9, 9, 9),
            ]
        );
    }

    #[tokio::test]
    async fn unresolvable_domain_contributes_nothing() {
        let ips = parse_ranges("no-such-host.invalid, 10.1.1.1", &offline_resolver())
            .await
            .unwrap();

        assert_eq!(ips, [v4(10, 1, 1, 1)]);
    }

    #[tokio::test]
    async fn overlapping_specs_keep_duplicates() {
        let ips = parse_ranges("10.1.1.1-2 10.1.1.2", &offline_resolver())
            .await
            .unwrap();

        assert_eq!(ips, [v4(10, 1, 1, 1), v4(10, 1, 1, 2), v4(10, 1, 1, 2)]);
    }

    #[tokio::test]
    async fn reparsing_is_deterministic() {
        let text = crate::ranges::DEFAULT_RANGES;
        let resolver = offline_resolver();

        let first = parse_ranges(text, &resolver).await.unwrap();
        let second = parse_ranges(text, &resolver).await.unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[parameterized(input = { "", "   ", ",,,\n", "no ranges here" })]
    fn input_without_matches_is_an_error(input: &str) {
        assert_eq!(
            parse_specs(input),
            Err(RangeError::NoMatch(input.to_owned()))
        );
    }

    #[test]
    fn valid_input_expanding_to_nothing_is_not_an_error() {
        let specs = parse_specs("10.0.0.0, 10.0.0.255").unwrap();
        assert_eq!(specs.len(), 2);

        let total: usize = specs
            .iter()
            .filter_map(AddressSpec::interval)
            .map(|(min, max)| expand_interval(min, max).count())
            .sum();
        assert_eq!(total, 0);
    }

    #[parameterized(input = { "300.1.1.1", "1.1.1.1/33", "10.0.0.5-256" })]
    fn out_of_range_numbers_are_skipped(input: &str) {
        assert_eq!(parse_specs(input), Ok(vec![]));
    }

    #[test]
    fn cidr_alternative_wins_over_octet_range() {
        let specs = parse_specs("10.0.0.1/24").unwrap();
        assert_eq!(
            specs,
            [AddressSpec::Cidr {
                address: Ipv4Addr::new(10, 0, 0, 1),
                prefix: 24
            }]
        );
    }

    #[test]
    fn domain_alternative() {
        let specs = parse_specs("www.google.com.hk").unwrap();
        assert_eq!(specs, [AddressSpec::Domain("www.google.com.hk".to_owned())]);
        assert_eq!(specs[0].interval(), None);
    }

    #[test]
    fn octet_interval_is_big_endian_packed() {
        let spec = AddressSpec::Octets([(1, 1), (179, 179), (248, 255), (0, 255)]);
        assert_eq!(
            spec.interval(),
            Some((
                u32::from(Ipv4Addr::new(1, 179, 248, 0)),
                u32::from(Ipv4Addr::new(1, 179, 255, 255))
            ))
        );
    }

    #[test]
    fn whole_address_space_prefix() {
        let spec = AddressSpec::Cidr {
            address: Ipv4Addr::new(8, 8, 8, 8),
            prefix: 0,
        };
        assert_eq!(spec.interval(), Some((0, u32::MAX)));
    }

    #[test]
    fn reversed_range_is_empty() {
        let spec = AddressSpec::Octets([(10, 10), (0, 0), (0, 0), (9, 5)]);
        let (min, max) = spec.interval().unwrap();
        assert_eq!(expand_interval(min, max).count(), 0);
    }

    #[parameterized(prefix = { 0, 7, 8, 9, 24 }, large = { true, true, true, false, false })]
    fn short_prefixes_are_large_intervals(prefix: u8, large: bool) {
        let spec = AddressSpec::Cidr {
            address: Ipv4Addr::new(10, 0, 0, 0),
            prefix,
        };
        let (min, max) = spec.interval().unwrap();
        assert_eq!(is_large_interval(min, max), large);
    }

    #[test]
    fn reversed_interval_is_not_large() {
        assert!(!is_large_interval(u32::MAX, 0));
    }

    #[test]
    fn resolved_and_expanded_addresses_share_one_filter() {
        let min = u32::from(Ipv4Addr::new(10, 0, 0, 250));
        let max = u32::from(Ipv4Addr::new(10, 0, 1, 5));
        let expanded = expand_interval(min, max).collect::<Vec<_>>();
        let filtered = (min..=max)
            .map(|n| IpAddr::V4(Ipv4Addr::from(n)))
            .filter(is_host_address)
            .collect::<Vec<_>>();

        assert_eq!(
            expanded.into_iter().map(IpAddr::V4).collect::<Vec<_>>(),
            filtered
        );
        assert!(is_host_address(&"2001:db8::ff".parse().unwrap()));
        assert!(!is_host_address(&v4(1, 2, 3, 255)));
    }
}
