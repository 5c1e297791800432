//! Control-plane endpoint resolution
//!
//! Determines where the daemon's control API lives and which secret to
//! present. Explicit options win over environment variables, which win over
//! the daemon's defaults (`http://127.0.0.1:9090`, no secret).

use std::env;

use url::Url;

use crate::error::{ClientError, Result};

/// Default control API host
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default control API port
pub const DEFAULT_PORT: u16 = 9090;
/// Default control API protocol
pub const DEFAULT_PROTOCOL: &str = "http";

/// Environment variables consulted when options leave a field unset
const ENV_HOST: &str = "HELMSD_HOST";
const ENV_PORT: &str = "HELMSD_PORT";
const ENV_SECRET: &str = "HELMSD_SECRET";
const ENV_PROTOCOL: &str = "HELMSD_PROTOCOL";

/// Caller-supplied overrides for endpoint resolution
#[derive(Debug, Clone, Default)]
pub struct EndpointOptions {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub secret: Option<String>,
    /// "http" or "https"
    pub protocol: Option<String>,
}

/// A fully resolved control-plane endpoint
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub protocol: String,
    pub hostname: String,
    pub port: u16,
    pub secret: Option<String>,
}

impl Endpoint {
    /// Base URL of the control API, with a trailing slash so `Url::join`
    /// appends instead of replacing the last path segment
    pub fn base_url(&self) -> Result<Url> {
        let raw = format!("{}://{}:{}/", self.protocol, self.hostname, self.port);
        Ok(Url::parse(&raw)?)
    }
}

/// Resolve the control-plane endpoint from options, environment and defaults
///
/// Fails when a source yields an unusable value (empty hostname, unparsable
/// port, unsupported protocol) rather than silently falling through to the
/// next source.
pub fn resolve(options: &EndpointOptions) -> Result<Endpoint> {
    let hostname = options
        .hostname
        .clone()
        .or_else(|| env_nonempty(ENV_HOST))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    if hostname.trim().is_empty() {
        return Err(ClientError::Resolve("hostname is empty".into()));
    }

    let port = match options.port {
        Some(port) => port,
        None => match env_nonempty(ENV_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                ClientError::Resolve(format!("{} is not a valid port: {:?}", ENV_PORT, raw))
            })?,
            None => DEFAULT_PORT,
        },
    };
    if port == 0 {
        return Err(ClientError::Resolve("port 0 is not usable".into()));
    }

    let protocol = options
        .protocol
        .clone()
        .or_else(|| env_nonempty(ENV_PROTOCOL))
        .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string());
    if protocol != "http" && protocol != "https" {
        return Err(ClientError::Resolve(format!(
            "unsupported protocol: {}",
            protocol
        )));
    }

    let secret = options.secret.clone().or_else(|| env_nonempty(ENV_SECRET));

    Ok(Endpoint {
        protocol,
        hostname,
        port,
        secret,
    })
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn explicit_options_win() {
        let endpoint = resolve(&EndpointOptions {
            hostname: Some("10.0.0.2".into()),
            port: Some(9091),
            secret: Some("s3cret".into()),
            protocol: Some("https".into()),
        })
        .unwrap();

        assert_eq!(endpoint.hostname, "10.0.0.2");
        assert_eq!(endpoint.port, 9091);
        assert_eq!(endpoint.secret.as_deref(), Some("s3cret"));
        assert_eq!(
            endpoint.base_url().unwrap().as_str(),
            "https://10.0.0.2:9091/"
        );
    }

    #[test]
    fn defaults_apply_when_unset() {
        let endpoint = resolve(&EndpointOptions::default()).unwrap();
        assert_eq!(endpoint.port, DEFAULT_PORT);
        assert_eq!(endpoint.protocol, DEFAULT_PROTOCOL);
    }

    #[test]
    fn rejects_unusable_values() {
        let empty_host = resolve(&EndpointOptions {
            hostname: Some("  ".into()),
            ..Default::default()
        });
        assert!(matches!(empty_host, Err(ClientError::Resolve(_))));

        let zero_port = resolve(&EndpointOptions {
            port: Some(0),
            ..Default::default()
        });
        assert!(matches!(zero_port, Err(ClientError::Resolve(_))));

        let bad_protocol = resolve(&EndpointOptions {
            protocol: Some("ftp".into()),
            ..Default::default()
        });
        assert!(matches!(bad_protocol, Err(ClientError::Resolve(_))));
    }
}
