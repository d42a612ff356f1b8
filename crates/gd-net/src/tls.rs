//! Trust-on-first-use TLS backend built on rustls.
//!
//! The handshake accepts any server certificate whose handshake signatures
//! verify. The end-entity certificate is captured together with a WebPKI
//! verdict so the client can compare it against the trust store once the
//! session is established.

use crate::transport::BoxedIoStream;
use crate::transport::io_error;
use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use gd_storage::fingerprint;
use rustls::CertificateError;
use rustls::ClientConfig;
use rustls::ClientConnection;
use rustls::DigitallySignedStruct;
use rustls::Error as RustlsError;
use rustls::RootCertStore;
use rustls::SignatureScheme;
use rustls::StreamOwned;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::HandshakeSignatureValid;
use rustls::client::danger::ServerCertVerified;
use rustls::client::danger::ServerCertVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::ServerName;
use rustls::pki_types::UnixTime;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::Mutex;

/// How the presented certificate fares against the public WebPKI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateValidity {
    /// Chains to a public root.
    Anchored,
    /// Self-signed or private CA; the normal case for TOFU hosts.
    Unanchored,
    /// Expired, not yet valid, wrong name or otherwise malformed.
    Invalid(String),
}

impl CertificateValidity {
    fn from_webpki(result: Result<ServerCertVerified, RustlsError>) -> Self {
        match result {
            Ok(_) => Self::Anchored,
            Err(RustlsError::InvalidCertificate(CertificateError::UnknownIssuer)) => {
                Self::Unanchored
            }
            Err(error) => Self::Invalid(error.to_string()),
        }
    }
}

/// End-entity certificate observed during a handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedCertificate {
    pub fingerprint: String,
    pub validity: CertificateValidity,
}

/// Established TLS session plus the certificate it was negotiated with.
pub struct TlsSession {
    pub stream: BoxedIoStream,
    pub certificate: PresentedCertificate,
}

/// Adapter contract for upgrading TCP transport to TLS.
pub trait TlsBackendAdapter {
    fn connect_tls(&self, stream: TcpStream, server_name: &str) -> DpiResult<TlsSession>;
}

/// rustls-backed connector that defers trust decisions to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustlsTofuAdapter;

impl TlsBackendAdapter for RustlsTofuAdapter {
    fn connect_tls(&self, mut stream: TcpStream, server_name: &str) -> DpiResult<TlsSession> {
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let captured = Arc::new(Mutex::new(None));
        let verifier = Arc::new(TofuVerifier {
            webpki: webpki_verifier(provider.clone())?,
            provider: provider.clone(),
            captured: captured.clone(),
        });

        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|error| {
                DpiError::new(
                    ErrorKind::Connection,
                    format!("failed to configure TLS protocol versions: {error}"),
                )
            })?
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth();

        let name = ServerName::try_from(server_name.to_owned()).map_err(|error| {
            DpiError::new(
                ErrorKind::Parse,
                format!("invalid TLS server name `{server_name}`: {error}"),
            )
        })?;

        let mut connection = ClientConnection::new(Arc::new(config), name).map_err(|error| {
            DpiError::new(
                ErrorKind::Connection,
                format!("failed to initialize TLS connection for `{server_name}`: {error}"),
            )
        })?;

        connection
            .complete_io(&mut stream)
            .map_err(|error| io_error(&error, &format!("TLS handshake failed for `{server_name}`")))?;

        let certificate = captured
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .ok_or_else(|| {
                DpiError::new(
                    ErrorKind::Connection,
                    format!("`{server_name}` completed the handshake without a certificate"),
                )
            })?;

        tracing::debug!(
            host = server_name,
            fingerprint = %certificate.fingerprint,
            validity = ?certificate.validity,
            "TLS session established"
        );

        Ok(TlsSession {
            stream: Box::new(StreamOwned::new(connection, stream)),
            certificate,
        })
    }
}

#[derive(Debug)]
struct TofuVerifier {
    webpki: Arc<WebPkiServerVerifier>,
    provider: Arc<CryptoProvider>,
    captured: Arc<Mutex<Option<PresentedCertificate>>>,
}

impl ServerCertVerifier for TofuVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        let validity = CertificateValidity::from_webpki(self.webpki.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ));

        let presented = PresentedCertificate {
            fingerprint: fingerprint(end_entity.as_ref()),
            validity,
        };

        match self.captured.lock() {
            Ok(mut slot) => *slot = Some(presented),
            Err(_) => {
                return Err(RustlsError::General(
                    "certificate capture slot is poisoned".to_owned(),
                ));
            }
        }

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn webpki_verifier(provider: Arc<CryptoProvider>) -> DpiResult<Arc<WebPkiServerVerifier>> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
        .build()
        .map_err(|error| {
            DpiError::new(
                ErrorKind::Connection,
                format!("failed to build WebPKI verifier: {error}"),
            )
        })
}
