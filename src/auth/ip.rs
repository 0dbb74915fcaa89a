//! Client IP extraction utilities.
//!
//! The rate limiter keys its windows by client IP. By default the IP comes
//! from the peer socket address; behind a reverse proxy it must come from a
//! configured forwarding header instead.

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, http::request::Parts};

/// Header to read the client IP from when running behind a proxy.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientIpHeader {
    /// X-Forwarded-For; the first (client-most) entry is used
    XForwardedFor,
    /// X-Real-IP
    XRealIp,
}

impl ClientIpHeader {
    pub fn header_name(self) -> &'static str {
        match self {
            ClientIpHeader::XForwardedFor => "x-forwarded-for",
            ClientIpHeader::XRealIp => "x-real-ip",
        }
    }

    fn parse(self, value: &str) -> Result<String, &'static str> {
        let ip = match self {
            ClientIpHeader::XForwardedFor => value.split(',').next().unwrap_or("").trim(),
            ClientIpHeader::XRealIp => value.trim(),
        };
        if ip.is_empty() {
            return Err("IP header is empty");
        }
        Ok(ip.to_string())
    }
}

/// Trait for types that provide access to HTTP headers and extensions.
/// Implemented for both `Parts` and `Request` to allow flexible IP extraction.
pub trait HasHeadersAndExtensions {
    fn headers(&self) -> &axum::http::HeaderMap;
    fn extensions(&self) -> &axum::http::Extensions;
}

impl HasHeadersAndExtensions for Parts {
    fn headers(&self) -> &axum::http::HeaderMap {
        &self.headers
    }
    fn extensions(&self) -> &axum::http::Extensions {
        &self.extensions
    }
}

impl<B> HasHeadersAndExtensions for axum::http::Request<B> {
    fn headers(&self) -> &axum::http::HeaderMap {
        axum::http::Request::headers(self)
    }
    fn extensions(&self) -> &axum::http::Extensions {
        axum::http::Request::extensions(self)
    }
}

/// Extract the client IP address based on configuration.
///
/// If `header` is set, the IP is read from that header and missing/invalid
/// values are an error (no fallback to the socket address, which would be
/// proxy-controlled). Otherwise the peer address from ConnectInfo is used.
pub fn extract_client_ip<T: HasHeadersAndExtensions>(
    source: &T,
    header: Option<ClientIpHeader>,
) -> Result<String, &'static str> {
    match header {
        Some(header) => {
            let value = source
                .headers()
                .get(header.header_name())
                .ok_or("IP header not present")?
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            header.parse(value)
        }
        None => source
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .ok_or("No client IP available"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn request_with_header(name: &'static str, value: &'static str) -> Request<()> {
        let mut request = Request::new(());
        request
            .headers_mut()
            .insert(name, HeaderValue::from_static(value));
        request
    }

    #[test]
    fn test_x_forwarded_for_first_entry() {
        let request = request_with_header("x-forwarded-for", "203.0.113.9, 10.0.0.1");
        let ip = extract_client_ip(&request, Some(ClientIpHeader::XForwardedFor)).unwrap();
        assert_eq!(ip, "203.0.113.9");
    }

    #[test]
    fn test_x_real_ip() {
        let request = request_with_header("x-real-ip", "203.0.113.9");
        let ip = extract_client_ip(&request, Some(ClientIpHeader::XRealIp)).unwrap();
        assert_eq!(ip, "203.0.113.9");
    }

    #[test]
    fn test_missing_header_is_error() {
        let request = Request::new(());
        assert!(extract_client_ip(&request, Some(ClientIpHeader::XForwardedFor)).is_err());
    }

    #[test]
    fn test_connect_info_fallback() {
        let mut request = Request::new(());
        let addr: SocketAddr = "198.51.100.7:1234".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        let ip = extract_client_ip(&request, None).unwrap();
        assert_eq!(ip, "198.51.100.7");
    }

    #[test]
    fn test_no_connect_info_is_error() {
        let request = Request::new(());
        assert!(extract_client_ip(&request, None).is_err());
    }
}
