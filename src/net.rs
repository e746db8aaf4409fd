//! Address discovery and normalisation helpers

use crate::defaults::{DEFAULT_HTTP_TIMEOUT, DEFAULT_PORT, PUBLIC_IP_URL};
use crate::error::{AppError, Result};
use reqwest::{Client, StatusCode};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, ToSocketAddrs};
#[cfg(not(unix))]
use std::net::UdpSocket;

/// Address used only to pick the outbound interface; nothing is sent to it.
#[cfg(not(unix))]
const ROUTE_TARGET: &str = "8.8.8.8:80";

/// First non-loopback IPv4 address of this machine's interfaces.
///
/// This is the address of the local interface (e.g. a DHCP lease behind a
/// router), not the address the internet sees; use [`public_ip`] for that.
pub fn external_ip() -> Result<String> {
    first_ipv4(interface_addrs()?)
        .map(|ip| ip.to_string())
        .ok_or_else(|| AppError::network("are you connected to the network?"))
}

/// First non-loopback IPv4 address in interface order. IPv4-mapped IPv6
/// addresses count as IPv4.
fn first_ipv4<I: IntoIterator<Item = IpAddr>>(addrs: I) -> Option<Ipv4Addr> {
    addrs.into_iter().find_map(|ip| {
        let v4 = match ip {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(v6) => v6.to_ipv4_mapped()?,
        };
        (!v4.is_loopback()).then_some(v4)
    })
}

#[cfg(unix)]
fn interface_addrs() -> Result<Vec<IpAddr>> {
    let addrs = nix::ifaddrs::getifaddrs()
        .map_err(|e| AppError::network(format!("could not get interface addresses: {}", e)))?;

    Ok(addrs
        .filter_map(|ifaddr| ifaddr.address)
        .filter_map(|addr| match addr.as_sockaddr_in() {
            Some(sin) => Some(IpAddr::V4(sin.ip())),
            None => addr.as_sockaddr_in6().map(|sin6| IpAddr::V6(sin6.ip())),
        })
        .collect())
}

#[cfg(not(unix))]
fn interface_addrs() -> Result<Vec<IpAddr>> {
    // No interface listing here; use the source address the kernel would route through
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(ROUTE_TARGET)?;
    Ok(vec![socket.local_addr()?.ip()])
}

/// Normalise `host:port`, filling in the external IP when the host is empty
/// and [`DEFAULT_PORT`] when the port is `0`.
///
/// An empty string resolves to `<external ip>:3264`. An address without a
/// port is an error.
pub fn resolve_addr(addr: &str) -> Result<String> {
    let addr = addr.trim();
    let (host, port) = if addr.is_empty() {
        ("", 0)
    } else {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| AppError::validation(format!("could not resolve address {}: missing port", addr)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| AppError::validation(format!("could not resolve address {}: invalid port", addr)))?;
        (host.trim_start_matches('[').trim_end_matches(']'), port)
    };

    let port = if port == 0 { DEFAULT_PORT } else { port };

    let ip: IpAddr = if host.is_empty() {
        external_ip()?.parse()?
    } else if let Ok(ip) = host.parse::<IpAddr>() {
        ip
    } else {
        (host, port)
            .to_socket_addrs()
            .map_err(|e| AppError::network(format!("could not resolve address {}: {}", addr, e)))?
            .next()
            .map(|sa| sa.ip())
            .ok_or_else(|| AppError::network(format!("could not resolve address {}", addr)))?
    };

    Ok(SocketAddr::new(ip, port).to_string())
}

/// Look up the address this machine is seen from on the internet.
///
/// The lookup service allows 30 requests per minute.
pub async fn public_ip() -> Result<String> {
    public_ip_from(PUBLIC_IP_URL).await
}

/// Same as [`public_ip`] against another endpoint returning `{"ip": ...}`
pub async fn public_ip_from(url: &str) -> Result<String> {
    let client = Client::builder().timeout(DEFAULT_HTTP_TIMEOUT).build()?;
    let response = client.get(url).send().await?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AppError::network(format!(
            "received status {}: rate limit of 30 requests per minute exceeded",
            status
        )));
    }
    if status != StatusCode::OK {
        return Err(AppError::network(format!(
            "could not lookup public IP address: {}",
            status
        )));
    }

    let data: serde_json::Value = response.json().await?;
    data.get("ip")
        .and_then(|ip| ip.as_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::parse("could not find IP address in response"))
}

/// Ask the kernel for a free TCP port
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("localhost:0")?;
    Ok(listener.local_addr()?.port())
}

/// Hostname of this machine, empty when it cannot be determined
pub fn hostname() -> String {
    #[cfg(unix)]
    {
        if let Ok(name) = nix::unistd::gethostname() {
            if let Some(name) = name.to_str() {
                return name.to_string();
            }
        }
    }
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_default()
}
