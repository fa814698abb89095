//! TLS trust policy for cluster connections.
//!
//! The `core.ssl_verify` setting is overloaded: it holds either the textual
//! form of a boolean or a path to a PEM bundle of root CAs. [`TlsPolicy::resolve`]
//! turns that string into one of three states and never fails. A setting that
//! is neither a boolean nor a readable bundle with at least one certificate
//! resolves to [`TlsPolicy::InsecureFallback`], which keeps the cluster
//! reachable; surfacing that as a security warning is up to the caller.

use std::fmt;
use std::path::Path;

use rustls_pki_types::CertificateDer;
use tracing::debug;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::config::FileSystem;

/// A non-empty set of root certificates loaded from a PEM bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPool {
    certs: Vec<CertificateDer<'static>>,
}

impl CertPool {
    /// Parses every `CERTIFICATE` section of a PEM document.
    ///
    /// Sections of other types, sections with broken base64 and sections
    /// that do not hold a well-formed X.509 certificate are skipped. Returns
    /// `None` when no certificate survives.
    pub fn from_pem(pem: &[u8]) -> Option<Self> {
        let mut reader = pem;
        let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
            .filter_map(|section| match section {
                Ok(der) => Some(der),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable PEM section");
                    None
                }
            })
            .filter(|der| X509Certificate::from_der(der.as_ref()).is_ok())
            .collect();

        if certs.is_empty() {
            None
        } else {
            Some(Self { certs })
        }
    }

    /// The DER-encoded certificates, in bundle order.
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certs
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

/// Which roots a verified connection trusts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustRoots {
    /// `core.ssl_verify` was a true boolean: verify against the ambient
    /// (system/default) trust store.
    System,
    /// Verify only against the certificates of the bundle at `path`.
    Bundle { path: String, pool: CertPool },
}

/// The resolved decision on whether and how to verify server certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Certificate verification is enabled.
    Verified(TrustRoots),
    /// The user explicitly disabled verification with a false boolean.
    InsecureExplicit,
    /// Verification is disabled because `path` was neither a boolean nor a
    /// readable PEM bundle with at least one certificate.
    InsecureFallback { path: String },
}

impl TlsPolicy {
    /// Resolves the raw `core.ssl_verify` string. Boolean forms never touch
    /// the filesystem; anything else is read through `fs` as a bundle path.
    pub fn resolve(raw: &str, fs: &dyn FileSystem) -> Self {
        if let Some(verify) = parse_bool(raw) {
            return if verify {
                TlsPolicy::Verified(TrustRoots::System)
            } else {
                TlsPolicy::InsecureExplicit
            };
        }

        let path = raw.to_string();
        let pem = match fs.read_file(Path::new(raw)) {
            Ok(pem) => pem,
            Err(e) => {
                debug!(path = %raw, error = %e, "Cannot read root CA bundle");
                return TlsPolicy::InsecureFallback { path };
            }
        };

        match CertPool::from_pem(&pem) {
            Some(pool) => TlsPolicy::Verified(TrustRoots::Bundle { path, pool }),
            None => {
                debug!(path = %raw, "Root CA bundle holds no usable certificate");
                TlsPolicy::InsecureFallback { path }
            }
        }
    }

    /// Whether server certificates are accepted without verification.
    pub fn is_insecure(&self) -> bool {
        !matches!(self, TlsPolicy::Verified(_))
    }

    /// The bundle path this policy was resolved from, if any.
    pub fn root_cas_path(&self) -> Option<&str> {
        match self {
            TlsPolicy::Verified(TrustRoots::Bundle { path, .. })
            | TlsPolicy::InsecureFallback { path } => Some(path),
            _ => None,
        }
    }

    /// The root pool to verify against, when one was loaded.
    pub fn root_cas(&self) -> Option<&CertPool> {
        match self {
            TlsPolicy::Verified(TrustRoots::Bundle { pool, .. }) => Some(pool),
            _ => None,
        }
    }
}

/// Serializes back to the `core.ssl_verify` form: the bundle path when there
/// is a non-empty one, otherwise the boolean `"true"`/`"false"`.
///
/// The mapping is lossy. A bundle policy writes its path and is re-read from
/// disk on the next resolution.
impl fmt::Display for TlsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root_cas_path() {
            Some(path) if !path.is_empty() => f.write_str(path),
            _ => write!(f, "{}", !self.is_insecure()),
        }
    }
}

/// Parses the conventional textual boolean forms:
/// `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
