//! VPN protocol and server location types.

use serde::{Deserialize, Serialize};

/// Supported VPN protocol types.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// `WireGuard`, requires a system extension.
    #[default]
    #[serde(rename = "wireguard")]
    WireGuard,
    /// `OpenVPN` over TCP, requires the privileged helper.
    #[serde(rename = "openvpn-tcp")]
    OpenVpnTcp,
    /// `OpenVPN` over UDP, requires the privileged helper.
    #[serde(rename = "openvpn-udp")]
    OpenVpnUdp,
    /// `IKEv2`, helper installs silently.
    Ikev2,
}

/// What must be in place before `connect()` may be issued.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnectGate {
    /// Install the system extension and wait for its callback.
    SystemExtension,
    /// Install the privileged helper and wait for the install-succeeded event.
    PrivilegedHelper,
    /// Connect immediately.
    None,
}

impl Protocol {
    /// All protocols, in the order they are offered to the user.
    pub const ALL: [Self; 4] = [Self::WireGuard, Self::OpenVpnTcp, Self::OpenVpnUdp, Self::Ikev2];

    #[must_use]
    pub const fn is_openvpn(self) -> bool {
        matches!(self, Self::OpenVpnTcp | Self::OpenVpnUdp)
    }

    /// Pre-connect requirement for this protocol.
    #[must_use]
    pub const fn connect_gate(self) -> ConnectGate {
        match self {
            Self::WireGuard => ConnectGate::SystemExtension,
            Self::OpenVpnTcp | Self::OpenVpnUdp => ConnectGate::PrivilegedHelper,
            Self::Ikev2 => ConnectGate::None,
        }
    }

    /// Config/CLI identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WireGuard => "wireguard",
            Self::OpenVpnTcp => "openvpn-tcp",
            Self::OpenVpnUdp => "openvpn-udp",
            Self::Ikev2 => "ikev2",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::WireGuard => write!(f, "WireGuard"),
            Protocol::OpenVpnTcp => write!(f, "OpenVPN (TCP)"),
            Protocol::OpenVpnUdp => write!(f, "OpenVPN (UDP)"),
            Protocol::Ikev2 => write!(f, "IKEv2"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                format!("Unknown protocol: {s} (expected wireguard, openvpn-tcp, openvpn-udp or ikev2)")
            })
    }
}

/// Country entry returned by the engine's server catalogue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Country {
    /// Display name, e.g. "Netherlands".
    pub name: String,
    /// ISO 3166 alpha-2 code.
    pub code: String,
}

impl Country {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// Selected server location.
///
/// Each member is optional; a `None` member means the engine picks the
/// fastest available candidate at that level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub country: Option<String>,
    pub city: Option<String>,
    pub server: Option<String>,
}

impl Location {
    /// True when the engine is free to choose the fastest server anywhere.
    #[must_use]
    pub fn is_fastest_available(&self) -> bool {
        self.country.is_none() && self.city.is_none() && self.server.is_none()
    }

    /// Short label such as "Amsterdam, Netherlands" or "Fastest Available".
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => format!("{city}, {country}"),
            (Some(city), None) => city.clone(),
            (None, Some(country)) => country.clone(),
            (None, None) => "Fastest Available".to_string(),
        }
    }
}
