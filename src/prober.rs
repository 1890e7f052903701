//! Core functionality for testing a single candidate address.
//!
//! One attempt connects to port 443, negotiates TLS presenting
//! [`SERVER_NAME`], pipelines two HTTP/1.1 requests and checks every status
//! line and `Server:` header of the replies. [`Prober`] repeats attempts until
//! one succeeds or the try budget is spent.
use std::{
    fmt,
    io::ErrorKind,
    net::{IpAddr, SocketAddr},
    num::NonZero,
    sync::Arc,
    time::Duration,
};

use futures::future::BoxFuture;
use log::debug;
use rand::Rng;
use thiserror::Error;
use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    time,
};
use tokio_rustls::{
    rustls::{self, pki_types::ServerName, ClientConfig, RootCertStore},
    TlsConnector,
};

/// Port every candidate is probed on.
pub const PROBE_PORT: u16 = 443;

/// Name presented in the TLS handshake.
pub const SERVER_NAME: &str = "google.com";

/// Default number of attempts per candidate.
pub const DEFAULT_TRIES: u8 = 3;

/// Default connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

/// `Server:` values accepted from a frontend.
const ACCEPTED_SERVERS: [&str; 2] = ["gws", "Google Frontend"];

/// Longest reply line examined; the rest of a longer line is skipped.
const MAX_LINE: u64 = 4096;

const STATUS_PREFIX: &str = "HTTP/";
const SERVER_PREFIX: &str = "Server:";
const EXPECTED_STATUS: &str = "200";

/// Why an attempt against a candidate failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("conn err:{0}")]
    Connect(#[source] io::Error),
    #[error("handshake error:{0}")]
    Handshake(#[source] io::Error),
    #[error("response error:{0}")]
    Response(#[source] io::Error),
    #[error("response match error:{0}")]
    Mismatch(String),
}

/// The final result of probing one candidate.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub address: IpAddr,
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    #[must_use]
    pub const fn is_good(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "{}:good ip", self.address),
            Some(e) => write!(f, "{}:{e}", self.address),
        }
    }
}

/// Performs a single attempt against a candidate.
pub trait Connector: Send + Sync {
    fn attempt(&self, ip: IpAddr) -> BoxFuture<'_, Result<(), ProbeError>>;
}

/// Probes candidates, retrying each up to `tries` times.
#[derive(Debug)]
pub struct Prober<C> {
    connector: C,
    tries: NonZero<u8>,
}

impl<C: Connector> Prober<C> {
    /// A `tries` of zero is corrected to one.
    pub fn new(connector: C, tries: u8) -> Self {
        Self {
            connector,
            tries: NonZero::new(tries).unwrap_or(NonZero::<u8>::MIN),
        }
    }

    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Given an address, test it up to self.tries times.
    /// The first successful attempt ends the loop; if every attempt fails the
    /// outcome carries the last attempt's error.
    pub async fn probe(&self, ip: IpAddr) -> ProbeOutcome {
        let tries = self.tries.get();
        let mut last_err = None;
        for nr_try in 1..=tries {
            match self.connector.attempt(ip).await {
                Ok(()) => {
                    debug!("{ip} passed after {nr_try} tries");
                    return ProbeOutcome {
                        address: ip,
                        error: None,
                    };
                }
                Err(e) => {
                    debug!("Try {nr_try} of {tries} against {ip} failed: {e}");
                    last_err = Some(e);
                }
            }
        }

        ProbeOutcome {
            address: ip,
            error: last_err,
        }
    }
}

/// Speaks to a candidate over TLS the way a browser would to the frontend.
#[derive(Clone)]
pub struct FrontendConnector {
    tls: TlsConnector,
    timeout: Duration,
    port: u16,
}

impl fmt::Debug for FrontendConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontendConnector")
            .field("timeout", &self.timeout)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl FrontendConnector {
    /// Builds a connector trusting the bundled web PKI roots.
    ///
    /// `timeout` bounds the TCP connect only; handshake, write and read are
    /// not separately bounded.
    pub fn new(timeout: Duration) -> Result<Self, rustls::Error> {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
            timeout,
            port: PROBE_PORT,
        })
    }

    /// Probes on `port` instead of [`PROBE_PORT`].
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Performs the connection to the socket with timeout
    async fn connect(&self, socket: SocketAddr) -> io::Result<TcpStream> {
        time::timeout(self.timeout, async move { TcpStream::connect(socket).await }).await?
    }

    async fn exchange(&self, ip: IpAddr) -> Result<(), ProbeError> {
        let socket = SocketAddr::new(ip, self.port);
        let tcp_stream = self.connect(socket).await.map_err(ProbeError::Connect)?;

        let server_name = ServerName::try_from(SERVER_NAME)
            .map_err(|e| ProbeError::Handshake(io::Error::new(ErrorKind::InvalidInput, e)))?
            .to_owned();
        let mut tls_stream = self
            .tls
            .connect(server_name, tcp_stream)
            .await
            .map_err(ProbeError::Handshake)?;

        let request = build_request(rand::rng().random_range(0..7));
        let result = match tls_stream.write_all(request.as_bytes()).await {
            Ok(()) => tls_stream.flush().await.map_err(ProbeError::Response),
            Err(e) => Err(ProbeError::Response(e)),
        };
        let result = match result {
            Ok(()) => check_response(BufReader::new(&mut tls_stream)).await,
            Err(e) => Err(e),
        };

        if let Err(e) = tls_stream.shutdown().await {
            debug!("Shutdown stream error {}", &e);
        }
        result
    }
}

impl Connector for FrontendConnector {
    fn attempt(&self, ip: IpAddr) -> BoxFuture<'_, Result<(), ProbeError>> {
        Box::pin(self.exchange(ip))
    }
}

/// The two pipelined requests sent on every attempt. `app` picks the
/// secondary host.
#[must_use]
pub fn build_request(app: u8) -> String {
    format!(
        "HEAD /search?q=g HTTP/1.1\r\nHost: www.google.com.hk\r\n\r\n\
         GET /3.2.0 HTTP/1.1\r\nHost: azzvxgoagent{app}.appspot.com\r\nConnection: close\r\n\r\n"
    )
}

/// Reads the replies to the end of the stream, checking each status line and
/// `Server:` header.
///
/// A mismatch does not stop the scan; the first one seen is returned once the
/// stream ends. A stream carrying no status line or no `Server:` header is a
/// mismatch too. A peer that closes without a TLS close-notify counts as a
/// clean end.
///
/// Only the first [`MAX_LINE`] bytes of a line are examined.
pub async fn check_response<R: AsyncBufRead + Unpin>(mut reader: R) -> Result<(), ProbeError> {
    let mut line = Vec::new();
    let mut mismatch = None;
    let (mut seen_status, mut seen_server) = (false, false);
    let mut continued = false;

    loop {
        match read_capped_line(&mut reader, &mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(ProbeError::Response(e)),
        }

        // Tail of an over-long line.
        let fragment = continued;
        continued = line.last() != Some(&b'\n');
        if fragment {
            continue;
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\r', '\n']);
        let problem = if text.starts_with(STATUS_PREFIX) {
            seen_status = true;
            check_status(text)
        } else if let Some(server) = text.strip_prefix(SERVER_PREFIX) {
            seen_server = true;
            check_server(server.trim())
        } else {
            None
        };
        if mismatch.is_none() {
            mismatch = problem;
        }
    }

    if let Some(problem) = mismatch {
        return Err(ProbeError::Mismatch(problem));
    }
    match (seen_status, seen_server) {
        (true, true) => Ok(()),
        (false, _) => Err(ProbeError::Mismatch("status:missing".to_owned())),
        (true, false) => Err(ProbeError::Mismatch("server:missing".to_owned())),
    }
}

/// Reads one line into `line`, stopping after [`MAX_LINE`] bytes.
async fn read_capped_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    line: &mut Vec<u8>,
) -> io::Result<usize> {
    line.clear();
    (&mut *reader).take(MAX_LINE).read_until(b'\n', line).await
}

fn check_status(line: &str) -> Option<String> {
    // "HTTP/1.1 200 OK"
    let status = line.get(9..12).unwrap_or("");
    (status != EXPECTED_STATUS).then(|| format!("status:{status}"))
}

fn check_server(server: &str) -> Option<String> {
    (!ACCEPTED_SERVERS.contains(&server)).then(|| format!("server:{server}"))
}
