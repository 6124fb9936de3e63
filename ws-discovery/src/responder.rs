//! UDP responder
//!
//! Stopped -> Announcing (join group, Hello) -> Listening (answer Probes,
//! optional periodic Hello) -> Stopping (Bye, leave group) -> Stopped.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use anyhow::Context;
use config_manager::DiscoverySection;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::matching::probe_matches;
use crate::message::{self, AppSequence, Endpoint, Probe};

pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const DISCOVERY_PORT: u16 = 3702;

/// Largest datagram accepted
const MAX_DATAGRAM: usize = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    Stopped,
    Announcing,
    Listening,
    Stopping,
}

/// Socket and timing parameters
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Local address to bind
    pub bind: SocketAddr,
    /// Group to join, `None` for a plain unicast socket
    pub multicast_group: Option<Ipv4Addr>,
    /// Destination of Hello and Bye
    pub announce_to: SocketAddr,
    /// Interface for the group join and outgoing multicast
    pub interface: Ipv4Addr,
    pub hello_interval: Option<Duration>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DISCOVERY_PORT)),
            multicast_group: Some(MULTICAST_GROUP),
            announce_to: SocketAddr::V4(SocketAddrV4::new(MULTICAST_GROUP, DISCOVERY_PORT)),
            interface: Ipv4Addr::UNSPECIFIED,
            hello_interval: None,
        }
    }
}

impl DiscoverySettings {
    pub fn from_config(section: &DiscoverySection) -> Self {
        Self {
            interface: section.interface.unwrap_or(Ipv4Addr::UNSPECIFIED),
            hello_interval: section
                .hello_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            ..Self::default()
        }
    }
}

pub struct Responder {
    socket: UdpSocket,
    endpoint: Endpoint,
    settings: DiscoverySettings,
    state: watch::Sender<ResponderState>,
    instance_id: u64,
    message_number: u64,
}

impl Responder {
    /// Bind the socket and join the group. Failure here is fatal at startup.
    pub fn bind(settings: DiscoverySettings, endpoint: Endpoint) -> anyhow::Result<Self> {
        let socket = bind_socket(&settings)
            .with_context(|| format!("failed to bind discovery socket on {}", settings.bind))?;
        let (state, _) = watch::channel(ResponderState::Stopped);

        Ok(Self {
            socket,
            endpoint,
            settings,
            state,
            instance_id: chrono::Utc::now().timestamp().max(0) as u64,
            message_number: 0,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ResponderState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ResponderState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ResponderState) {
        debug!("Discovery responder: {:?}", state);
        self.state.send_replace(state);
    }

    fn next_sequence(&mut self) -> AppSequence {
        self.message_number += 1;
        AppSequence {
            instance_id: self.instance_id,
            message_number: self.message_number,
        }
    }

    /// Announce, answer probes until `shutdown`, then say goodbye
    pub async fn run(mut self, shutdown: CancellationToken) -> anyhow::Result<()> {
        self.set_state(ResponderState::Announcing);
        self.send_hello().await;

        self.set_state(ResponderState::Listening);
        info!(
            "WS-Discovery responder listening on {} for {}",
            self.local_addr()?,
            self.endpoint.address
        );

        let mut ticker = self
            .settings
            .hello_interval
            .map(|period| interval_at(Instant::now() + period, period));
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = next_tick(&mut ticker) => self.send_hello().await,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => self.handle_datagram(&buf[..len], from).await,
                    Err(e) => warn!("Discovery receive failed: {}", e),
                },
            }
        }

        self.set_state(ResponderState::Stopping);
        self.send_bye().await;
        if let Some(group) = self.settings.multicast_group {
            if let Err(e) = self.socket.leave_multicast_v4(group, self.settings.interface) {
                debug!("Failed to leave multicast group {}: {}", group, e);
            }
        }
        self.set_state(ResponderState::Stopped);
        info!("WS-Discovery responder stopped");
        Ok(())
    }

    async fn handle_datagram(&mut self, datagram: &[u8], from: SocketAddr) {
        let probe = match Probe::parse(datagram) {
            Ok(probe) => probe,
            Err(e) => {
                debug!("Discarding datagram from {}: {}", from, e);
                return;
            }
        };

        if !probe_matches(&probe, &self.endpoint) {
            debug!(
                "Probe {} from {} does not match (types {:?}, scopes {:?})",
                probe.message_id, from, probe.types, probe.scopes
            );
            return;
        }

        let sequence = self.next_sequence();
        let reply = message::probe_match(&self.endpoint, &probe, sequence);
        match self.socket.send_to(reply.as_bytes(), from).await {
            Ok(_) => info!("ProbeMatch sent to {} for {}", from, probe.message_id),
            Err(e) => warn!("Failed to send ProbeMatch to {}: {}", from, e),
        }
    }

    async fn send_hello(&mut self) {
        let sequence = self.next_sequence();
        let hello = message::hello(&self.endpoint, sequence);
        match self
            .socket
            .send_to(hello.as_bytes(), self.settings.announce_to)
            .await
        {
            Ok(_) => info!("Hello sent to {}", self.settings.announce_to),
            Err(e) => warn!("Failed to send Hello: {}", e),
        }
    }

    async fn send_bye(&mut self) {
        let sequence = self.next_sequence();
        let bye = message::bye(&self.endpoint, sequence);
        match self
            .socket
            .send_to(bye.as_bytes(), self.settings.announce_to)
            .await
        {
            Ok(_) => info!("Bye sent to {}", self.settings.announce_to),
            Err(e) => warn!("Failed to send Bye: {}", e),
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn bind_socket(settings: &DiscoverySettings) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(
        Domain::for_address(settings.bind),
        Type::DGRAM,
        Some(Protocol::UDP),
    )?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.bind(&settings.bind.into())?;

    if let Some(group) = settings.multicast_group {
        socket.join_multicast_v4(&group, &settings.interface)?;
        if !settings.interface.is_unspecified() {
            socket.set_multicast_if_v4(&settings.interface)?;
        }
        socket.set_multicast_ttl_v4(1)?;
    }

    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}
