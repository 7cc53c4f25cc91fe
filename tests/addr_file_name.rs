//! Device names for reserved and guest context IDs.

use vsock_conn::{Addr, ContextId, HOST, HYPERVISOR, LOOPBACK};

#[test]
fn file_name_for_reserved_and_guest_cids() {
    let cases = [
        (HYPERVISOR, 10, "vsock:hypervisor(0):10"),
        (LOOPBACK, 20, "vsock:loopback(1):20"),
        (HOST, 30, "vsock:host(2):30"),
        (3, 40, "vsock:vm(3):40"),
    ];

    for (cid, port, want) in cases {
        let addr = Addr::new(cid, port);
        assert_eq!(addr.file_name(), want, "cid={cid} port={port}");
    }
}

#[test]
fn every_cid_above_host_is_a_vm() {
    for cid in [3, 4, 1000, u32::MAX - 1, u32::MAX] {
        let addr = Addr::new(cid, 1);
        assert_eq!(addr.cid(), ContextId::Vm(cid));
        assert!(addr.file_name().starts_with("vsock:vm("));
    }
}

#[test]
fn display_matches_file_name() {
    let addr = Addr::new(HOST, 5005);
    assert_eq!(addr.to_string(), addr.file_name());
    assert_eq!(addr.network(), "vsock");
}

#[test]
fn loopback_constructor() {
    let addr = Addr::loopback(1025);
    assert_eq!(addr.context_id, LOOPBACK);
    assert_eq!(addr.port, 1025);
    assert_eq!(addr.cid().role(), "loopback");
}
