//! A tiny in-memory stand-in for the two collaborators spec.md §1 treats
//! as external: the field-metadata registry (`FieldRegistry`) and the
//! port-name table the emitter's `resolve_port` callback closes over
//! (`PortResolver`). Neither is a design surface of the compiler itself —
//! they exist only so `flowexpr compile`/`check`/`fmt` and this crate's
//! own tests have something concrete to run the pipeline against, in the
//! same spirit as a handful of synthetic fields in a unit test, just
//! large enough to cover the grammar end to end.
//!
//! The field set mirrors the common subset of a real network header
//! registry (Ethernet, IPv4, TCP/UDP, ICMPv4) plus the `eth.type`/`ip4`/
//! `tcp`/`udp` predicate chain the end-to-end scenarios in spec.md §8 use
//! directly.

use flowexpr_symtab::{FieldDescriptor, FieldRegistry, SymbolTable};
use std::collections::HashMap;

/// Every field this demo registry knows about, by the `field_id` a
/// `SymbolTable::add_field`/`add_string` call references. Real field ids
/// would additionally carry a bit offset into some wire format; this demo
/// only needs width and maskability; the bit-position half of a real
/// descriptor is the classifier's concern, out of scope per spec.md §1.
pub struct DemoRegistry {
    fields: HashMap<&'static str, FieldDescriptor>,
}

impl DemoRegistry {
    pub fn new() -> Self {
        let mut fields = HashMap::new();
        fields.insert("eth_type", FieldDescriptor { width: 16, maskable: false });
        fields.insert("eth_addr", FieldDescriptor { width: 48, maskable: true });
        fields.insert("vlan_tci", FieldDescriptor { width: 16, maskable: true });
        fields.insert("ip4_addr", FieldDescriptor { width: 32, maskable: true });
        fields.insert("ip_proto", FieldDescriptor { width: 8, maskable: true });
        fields.insert("ip_ttl", FieldDescriptor { width: 8, maskable: true });
        fields.insert("ip6_addr", FieldDescriptor { width: 128, maskable: true });
        fields.insert("tp_port", FieldDescriptor { width: 16, maskable: true });
        fields.insert("icmp_type", FieldDescriptor { width: 8, maskable: true });
        fields.insert("icmp_code", FieldDescriptor { width: 8, maskable: true });
        fields.insert("port_name", FieldDescriptor { width: 0, maskable: false });
        DemoRegistry { fields }
    }
}

impl Default for DemoRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRegistry for DemoRegistry {
    fn describe(&self, field_id: &str) -> Option<FieldDescriptor> {
        self.fields.get(field_id).copied()
    }
}

/// Builds a ready-to-use symbol table over `registry`: the Ethernet/IPv4/
/// TCP/UDP/ICMPv4 fields and the `ip4`/`tcp`/`udp`/`icmp4` predicate chain
/// that the end-to-end scenarios in spec.md §8 exercise. Registration
/// cannot fail here — every call site uses a name/field-id pair this
/// module controls — so a failure would indicate a bug in this function,
/// not a caller error; unwrapping is appropriate.
pub fn build_symtab(registry: &dyn FieldRegistry) -> SymbolTable<'_> {
    let t = SymbolTable::new(registry);

    t.add_field("eth.type", "eth_type", None, true).unwrap();
    t.add_field("eth.src", "eth_addr", None, false).unwrap();
    t.add_field("eth.dst", "eth_addr", None, false).unwrap();
    t.add_field("vlan.tci", "vlan_tci", None, false).unwrap();

    t.add_predicate("ip4", "eth.type == 0x800").unwrap();
    t.add_predicate("ip6", "eth.type == 0x86dd").unwrap();
    t.add_field("ip4.src", "ip4_addr", Some("ip4"), false).unwrap();
    t.add_field("ip4.dst", "ip4_addr", Some("ip4"), false).unwrap();
    t.add_field("ip6.src", "ip6_addr", Some("ip6"), false).unwrap();
    t.add_field("ip6.dst", "ip6_addr", Some("ip6"), false).unwrap();
    t.add_field("ip.proto", "ip_proto", Some("ip4 || ip6"), false).unwrap();
    t.add_field("ip.ttl", "ip_ttl", Some("ip4 || ip6"), false).unwrap();

    t.add_predicate("tcp", "ip4 && ip.proto == 6").unwrap();
    t.add_predicate("udp", "ip4 && ip.proto == 17").unwrap();
    t.add_predicate("icmp4", "ip4 && ip.proto == 1").unwrap();
    t.add_field("tcp.src", "tp_port", Some("tcp"), false).unwrap();
    t.add_field("tcp.dst", "tp_port", Some("tcp"), false).unwrap();
    t.add_field("udp.src", "tp_port", Some("udp"), false).unwrap();
    t.add_field("udp.dst", "tp_port", Some("udp"), false).unwrap();
    t.add_field("icmp4.type", "icmp_type", Some("icmp4"), false).unwrap();
    t.add_field("icmp4.code", "icmp_code", Some("icmp4"), false).unwrap();

    t.add_string("inport", "port_name", None).unwrap();
    t.add_string("outport", "port_name", None).unwrap();

    t
}

/// A fixed `name -> id` port table, standing in for the dynamic logical-
/// to-physical port mapping a real control plane would maintain and
/// update as ports come and go.
pub struct DemoPorts {
    ports: HashMap<&'static str, u128>,
}

impl DemoPorts {
    pub fn new() -> Self {
        let mut ports = HashMap::new();
        ports.insert("sw0-p1", 1);
        ports.insert("sw0-p2", 2);
        ports.insert("sw0-p3", 3);
        DemoPorts { ports }
    }
}

impl Default for DemoPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl flowexpr_emit::PortResolver for DemoPorts {
    fn resolve(&self, _symbol: &str, name: &str) -> Option<u128> {
        self.ports.get(name).copied()
    }
}
