//! HTTP client construction from a cluster's resolved settings.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Certificate, Client, ClientBuilder, Method, RequestBuilder};
use tracing::{debug, warn};

use crate::error::Result;

use super::{Cluster, TlsPolicy, TrustRoots};

/// Builds a client honoring the cluster's timeout and TLS trust policy.
///
/// A zero timeout means no timeout. When the trust policy fell back to
/// insecure because `core.ssl_verify` could not be used, a warning naming the
/// setting is logged before the client is returned.
pub fn client_for(cluster: &Cluster) -> Result<Client> {
    let mut builder = Client::builder().user_agent(concat!("dcos-cli/", env!("CARGO_PKG_VERSION")));

    let timeout = cluster.timeout();
    if !timeout.is_zero() {
        builder = builder.timeout(timeout);
    }

    builder = apply_tls(builder, &cluster.tls())?;
    Ok(builder.build()?)
}

fn apply_tls(builder: ClientBuilder, policy: &TlsPolicy) -> Result<ClientBuilder> {
    let builder = match policy {
        TlsPolicy::Verified(TrustRoots::System) => builder,
        TlsPolicy::Verified(TrustRoots::Bundle { path, pool }) => {
            debug!(path = %path, certs = pool.len(), "Verifying against root CA bundle");
            // The bundle replaces the built-in roots
            let mut builder = builder.tls_built_in_root_certs(false);
            for der in pool.certificates() {
                builder = builder.add_root_certificate(Certificate::from_der(der.as_ref())?);
            }
            builder
        }
        TlsPolicy::InsecureExplicit => builder.danger_accept_invalid_certs(true),
        TlsPolicy::InsecureFallback { path } => {
            warn!(
                ssl_verify = %path,
                "core.ssl_verify is neither a boolean nor a readable CA bundle, \
                 server certificates will NOT be verified"
            );
            builder.danger_accept_invalid_certs(true)
        }
    };
    Ok(builder)
}

/// Starts a request to `path` on the cluster, authorized with the ACS token
/// when one is configured.
pub fn request(client: &Client, cluster: &Cluster, method: Method, path: &str) -> RequestBuilder {
    let url = format!("{}/{}", cluster.url(), path.trim_start_matches('/'));
    let mut request = client.request(method, url);

    let token = cluster.acs_token();
    if !token.is_empty() {
        match HeaderValue::from_str(&format!("token={}", token)) {
            Ok(value) => request = request.header(AUTHORIZATION, value),
            Err(_) => warn!("Ignoring ACS token that is not a valid header value"),
        }
    }
    request
}
