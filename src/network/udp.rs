//! UDP socket setup
//!
//! Art-Net nodes share port 6454 and talk over broadcast, so the socket is
//! built with socket2 to get address reuse and broadcast before binding.

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;

use crate::error::NetworkError;

/// Create a non-blocking UDP socket bound to `addr`
pub fn create_socket(addr: SocketAddr) -> Result<tokio::net::UdpSocket, NetworkError> {
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(format!("Failed to create socket: {}", e)))?;

    socket
        .set_reuse_address(true)
        .map_err(|e| NetworkError::BindFailed(format!("Failed to set SO_REUSEADDR: {}", e)))?;

    #[cfg(unix)]
    socket
        .set_reuse_port(true)
        .map_err(|e| NetworkError::BindFailed(format!("Failed to set SO_REUSEPORT: {}", e)))?;

    socket
        .set_broadcast(true)
        .map_err(|e| NetworkError::BindFailed(format!("Failed to enable broadcast: {}", e)))?;

    socket
        .set_nonblocking(true)
        .map_err(|e| NetworkError::BindFailed(format!("Failed to set non-blocking: {}", e)))?;

    socket
        .bind(&addr.into())
        .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;

    tokio::net::UdpSocket::from_std(socket.into())
        .map_err(|e| NetworkError::BindFailed(format!("Failed to register socket: {}", e)))
}
