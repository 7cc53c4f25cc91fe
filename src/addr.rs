use std::fmt;

use tokio_vsock::VsockAddr;

/// Context ID of the hypervisor (0).
pub const HYPERVISOR: u32 = tokio_vsock::VMADDR_CID_HYPERVISOR;

/// Context ID reserved for local loopback communication (1).
pub const LOOPBACK: u32 = tokio_vsock::VMADDR_CID_LOCAL;

/// Context ID of the host (2).
pub const HOST: u32 = tokio_vsock::VMADDR_CID_HOST;

/// Wildcard context ID accepted by `bind`: listen on whatever CID the local
/// machine has.
pub const CID_ANY: u32 = tokio_vsock::VMADDR_CID_ANY;

/// The owner of a VSOCK endpoint, as named by its context ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextId {
    Hypervisor,
    Loopback,
    Host,
    /// A guest virtual machine (any CID above the reserved range).
    Vm(u32),
}

impl ContextId {
    /// Role name used in device names.
    pub fn role(&self) -> &'static str {
        match self {
            ContextId::Hypervisor => "hypervisor",
            ContextId::Loopback => "loopback",
            ContextId::Host => "host",
            ContextId::Vm(_) => "vm",
        }
    }

    /// Numeric context ID.
    pub fn as_u32(&self) -> u32 {
        match *self {
            ContextId::Hypervisor => HYPERVISOR,
            ContextId::Loopback => LOOPBACK,
            ContextId::Host => HOST,
            ContextId::Vm(cid) => cid,
        }
    }
}

impl From<u32> for ContextId {
    fn from(cid: u32) -> Self {
        match cid {
            HYPERVISOR => ContextId::Hypervisor,
            LOOPBACK => ContextId::Loopback,
            HOST => ContextId::Host,
            other => ContextId::Vm(other),
        }
    }
}

impl From<ContextId> for u32 {
    fn from(cid: ContextId) -> Self {
        cid.as_u32()
    }
}

/// A VSOCK endpoint: a (context ID, port) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr {
    pub context_id: u32,
    pub port: u32,
}

impl Addr {
    /// Address for (`context_id`, `port`); any `u32` is accepted for both.
    pub fn new(context_id: u32, port: u32) -> Self {
        Self { context_id, port }
    }

    /// Address on the loopback context ID.
    pub fn loopback(port: u32) -> Self {
        Self::new(LOOPBACK, port)
    }

    /// The context ID as its reserved-role enumeration.
    pub fn cid(&self) -> ContextId {
        ContextId::from(self.context_id)
    }

    /// Name of the network this address belongs to.
    pub fn network(&self) -> &'static str {
        "vsock"
    }

    /// Device name for this address, `vsock:<role>(<cid>):<port>`.
    ///
    /// Defined for every `u32` context ID and port.
    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}({}):{}",
            self.network(),
            self.cid().role(),
            self.context_id,
            self.port
        )
    }
}

impl From<VsockAddr> for Addr {
    fn from(addr: VsockAddr) -> Self {
        Self::new(addr.cid(), addr.port())
    }
}

impl From<Addr> for VsockAddr {
    fn from(addr: Addr) -> Self {
        VsockAddr::new(addr.context_id, addr.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_constants_match_kernel_values() {
        assert_eq!(HYPERVISOR, 0);
        assert_eq!(LOOPBACK, 1);
        assert_eq!(HOST, 2);
        assert_eq!(CID_ANY, u32::MAX);
    }

    #[test]
    fn reserved_cids_map_to_named_roles() {
        assert_eq!(ContextId::from(0), ContextId::Hypervisor);
        assert_eq!(ContextId::from(1), ContextId::Loopback);
        assert_eq!(ContextId::from(2), ContextId::Host);
        assert_eq!(ContextId::from(3), ContextId::Vm(3));
    }

    #[test]
    fn context_id_u32_conversion_is_lossless() {
        for cid in [0, 1, 2, 3, 42, CID_ANY] {
            assert_eq!(u32::from(ContextId::from(cid)), cid);
        }
    }

    #[test]
    fn extreme_values_format() {
        let addr = Addr::new(u32::MAX, u32::MAX);
        assert_eq!(addr.file_name(), "vsock:vm(4294967295):4294967295");
    }

    #[test]
    fn vsock_addr_conversion() {
        let addr = Addr::new(HOST, 5000);
        let raw: VsockAddr = addr.into();
        assert_eq!(raw.cid(), HOST);
        assert_eq!(raw.port(), 5000);
        assert_eq!(Addr::from(raw), addr);
    }
}
