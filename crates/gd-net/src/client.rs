//! Gemini client built on DNS, transport, TLS and trust store contracts.

use crate::dns::DnsResolver;
use crate::dns::SystemDnsResolver;
use crate::tls::CertificateValidity;
use crate::tls::RustlsTofuAdapter;
use crate::tls::TlsBackendAdapter;
use crate::tls::TlsSession;
use crate::transport::BoxedIoStream;
use crate::transport::TcpTransport;
use crate::transport::Transport;
use crate::transport::connect_first_available;
use crate::transport::io_error;
use crate::url::GeminiUrl;
use crate::url::split_host_port;
use gd_config::PluginConfig;
use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use gd_storage::PinVerdict;
use gd_storage::TrustStore;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::time::Duration;

const MAX_REQUEST_URL_BYTES: usize = 1024;

/// Protocol operations the navigator depends on.
pub trait ProtocolClient {
    type Body: BufRead;

    /// Opens a trusted connection and sends the request for `url`.
    ///
    /// Certificate problems surface as [`ErrorKind::UntrustedCert`] or
    /// [`ErrorKind::InvalidCert`]; everything else as connection failures.
    fn request(&mut self, url: &str) -> DpiResult<Self::Body>;

    /// Trusts the certificate `host_port` currently presents.
    fn pin(&mut self, host_port: &str) -> DpiResult<()>;
}

/// Response stream positioned at the status line.
///
/// The body owns the connection; dropping it closes the connection on every
/// exit path.
pub struct ResponseBody {
    reader: BufReader<BoxedIoStream>,
}

impl ResponseBody {
    pub fn new(stream: BoxedIoStream) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for ResponseBody {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amount: usize) {
        self.reader.consume(amount);
    }
}

/// Gemini client with pluggable resolver/transport/tls backend.
pub struct GeminiClient<R = SystemDnsResolver, T = TcpTransport, A = RustlsTofuAdapter>
where
    R: DnsResolver,
    T: Transport,
    A: TlsBackendAdapter,
{
    dns: R,
    transport: T,
    tls_adapter: A,
    trust_store: TrustStore,
    scheme: String,
    default_port: u16,
    timeout: Duration,
}

impl GeminiClient {
    pub fn from_config(config: &PluginConfig) -> DpiResult<Self> {
        Self::with_parts(SystemDnsResolver, TcpTransport, RustlsTofuAdapter, config)
    }
}

impl<R, T, A> GeminiClient<R, T, A>
where
    R: DnsResolver,
    T: Transport,
    A: TlsBackendAdapter,
{
    pub fn with_parts(
        dns: R,
        transport: T,
        tls_adapter: A,
        config: &PluginConfig,
    ) -> DpiResult<Self> {
        config.validate()?;
        Ok(Self {
            dns,
            transport,
            tls_adapter,
            trust_store: TrustStore::new(config.trust_store_path.clone()),
            scheme: config.scheme.clone(),
            default_port: config.default_port,
            timeout: config.request_timeout,
        })
    }

    fn open_session(&self, host: &str, port: u16) -> DpiResult<TlsSession> {
        let addresses = self.dns.resolve(host, port)?;
        let stream = connect_first_available(&self.transport, &addresses, self.timeout)?;
        self.tls_adapter.connect_tls(stream, host)
    }
}

impl<R, T, A> ProtocolClient for GeminiClient<R, T, A>
where
    R: DnsResolver,
    T: Transport,
    A: TlsBackendAdapter,
{
    type Body = ResponseBody;

    fn request(&mut self, url: &str) -> DpiResult<ResponseBody> {
        let target = GeminiUrl::parse(url, &self.scheme, self.default_port)?;
        if target.as_str().len() > MAX_REQUEST_URL_BYTES {
            return Err(DpiError::new(
                ErrorKind::Parse,
                format!("request URL exceeds {MAX_REQUEST_URL_BYTES} bytes"),
            ));
        }

        tracing::debug!(url = target.as_str(), "sending request");
        let session = self.open_session(target.host(), target.port())?;
        let host_port = target.host_port();
        check_trust(
            &self.trust_store,
            &host_port,
            &session.certificate.validity,
            &session.certificate.fingerprint,
        )?;

        let mut stream = session.stream;
        stream
            .write_all(format!("{}\r\n", target.as_str()).as_bytes())
            .map_err(|error| io_error(&error, "failed to write request"))?;
        stream
            .flush()
            .map_err(|error| io_error(&error, "failed to flush request"))?;

        Ok(ResponseBody::new(stream))
    }

    fn pin(&mut self, host_port: &str) -> DpiResult<()> {
        let (host, port) = split_host_port(host_port)?;
        let session = self.open_session(&host, port)?;
        self.trust_store
            .pin(host_port, &session.certificate.fingerprint)
    }
}

/// Compares the presented certificate with the pinned one.
///
/// The store is consulted on every call.
pub fn check_trust(
    store: &TrustStore,
    host_port: &str,
    validity: &CertificateValidity,
    fingerprint: &str,
) -> DpiResult<()> {
    match store.verdict(host_port, fingerprint)? {
        PinVerdict::Matches => Ok(()),
        PinVerdict::Changed { .. } => Err(DpiError::new(
            ErrorKind::UntrustedCert,
            format!("the certificate for {host_port} has changed since it was pinned"),
        )),
        PinVerdict::NotPinned => match validity {
            CertificateValidity::Invalid(reason) => Err(DpiError::new(
                ErrorKind::InvalidCert,
                format!("the certificate for {host_port} is invalid: {reason}"),
            )),
            CertificateValidity::Anchored | CertificateValidity::Unanchored => Err(DpiError::new(
                ErrorKind::UntrustedCert,
                format!("the certificate for {host_port} is not pinned"),
            )),
        },
    }
}
