use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;

use pgwire::tokio::tokio_rustls::rustls::ServerConfig;
use pgwire::tokio::TlsAcceptor;
use thiserror::Error;

use crate::config::TlsPaths;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("no private key found in {0}")]
    NoKey(String),
    #[error("rejected certificate/key pair: {0}")]
    Rustls(#[from] pgwire::tokio::tokio_rustls::rustls::Error),
}

/// Build the acceptor for `sslmode=require` clients. `None` leaves the listener plaintext.
pub fn load_tls_acceptor(paths: Option<&TlsPaths>) -> Result<Option<TlsAcceptor>, TlsError> {
    let Some(paths) = paths else {
        return Ok(None);
    };
    let read_err = |path: &str| {
        let path = path.to_string();
        move |source: io::Error| TlsError::Read { path, source }
    };

    let cert_file = File::open(&paths.cert).map_err(read_err(&paths.cert))?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<Result<_, _>>()
        .map_err(read_err(&paths.cert))?;

    let key_file = File::open(&paths.key).map_err(read_err(&paths.key))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .map_err(read_err(&paths.key))?
        .ok_or_else(|| TlsError::NoKey(paths.key.clone()))?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"postgresql".to_vec()];

    Ok(Some(TlsAcceptor::from(Arc::new(config))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_paths_means_plaintext() {
        assert!(load_tls_acceptor(None).unwrap().is_none());
    }

    #[test]
    fn missing_cert_file_names_the_path() {
        let paths = TlsPaths {
            cert: "/nonexistent/lido-cert.pem".into(),
            key: "/nonexistent/lido-key.pem".into(),
        };
        match load_tls_acceptor(Some(&paths)) {
            Err(TlsError::Read { path, .. }) => assert_eq!(path, paths.cert),
            other => panic!("expected read error, got {:?}", other.map(|a| a.is_some())),
        }
    }
}
