// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TLS certificate resolution: use the operator's cert/key if configured,
//! otherwise mint and persist a self-signed development pair. Certificates
//! are validated for non-expiry before being handed to the listener (§6).

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use x509_parser::pem::parse_x509_pem;

/// A resolved, on-disk certificate/key pair ready to be loaded into rustls.
pub struct TlsMaterial {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Resolves the certificate/key pair to serve TLS with. If both files already
/// exist they're used as-is; otherwise a self-signed development certificate
/// is generated and written to those paths, with a banner warning (§6: "a
/// banner warning is printed").
pub fn resolve(cert_path: &Path, key_path: &Path) -> anyhow::Result<TlsMaterial> {
    if cert_path.exists() && key_path.exists() {
        return Ok(TlsMaterial { cert_path: cert_path.to_owned(), key_path: key_path.to_owned() });
    }

    tracing::warn!(
        cert = %cert_path.display(),
        key = %key_path.display(),
        "=== no TLS certificate configured; generating a self-signed development \
         certificate. THIS IS NOT SUITABLE FOR PRODUCTION USE. ==="
    );
    generate_dev_cert(cert_path, key_path)?;
    Ok(TlsMaterial { cert_path: cert_path.to_owned(), key_path: key_path.to_owned() })
}

fn generate_dev_cert(cert_path: &Path, key_path: &Path) -> anyhow::Result<()> {
    let rcgen::CertifiedKey { cert, signing_key } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_owned()])?;

    if let Some(parent) = cert_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = key_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(cert_path, cert.pem())?;
    std::fs::write(key_path, signing_key.serialize_pem())?;
    Ok(())
}

/// `true` if the PEM certificate at `path` is currently within its validity
/// window. An unparsable certificate is treated as expired rather than
/// propagating a parse error up through TLS setup.
pub fn is_not_expired(cert_path: &Path) -> anyhow::Result<bool> {
    let pem_bytes = std::fs::read(cert_path)?;
    let Ok((_, pem)) = parse_x509_pem(&pem_bytes) else {
        tracing::warn!(cert = %cert_path.display(), "certificate is not valid PEM, treating as expired");
        return Ok(false);
    };
    let Ok(cert) = pem.parse_x509() else {
        tracing::warn!(cert = %cert_path.display(), "certificate is not valid X.509, treating as expired");
        return Ok(false);
    };
    Ok(cert.validity().is_valid())
}

/// Loads `material` into a rustls server config suitable for `axum_server`.
pub async fn load_rustls_config(material: &TlsMaterial) -> anyhow::Result<RustlsConfig> {
    RustlsConfig::from_pem_file(&material.cert_path, &material.key_path).await.map_err(Into::into)
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tests;
