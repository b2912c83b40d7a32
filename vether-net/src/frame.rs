//! Ethernet frame codec and MAC address handling.

use std::fmt;

/// Size of a MAC address in bytes.
pub const MAC_LEN: usize = 6;

/// Size of the Ethernet header: destination MAC, source MAC, ethertype.
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Largest frame the fabric carries (header + payload + trailing slack).
pub const ETHER_MAX_LEN: usize = 1518;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

/// A 48-bit Layer-2 hardware address.
///
/// Ordering and hashing are plain functions of the six bytes, so the type
/// works directly as a map key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacAddress([u8; MAC_LEN]);

impl MacAddress {
    /// The all-stations broadcast address, `ff:ff:ff:ff:ff:ff`.
    pub const BROADCAST: MacAddress = MacAddress([0xff; MAC_LEN]);

    pub const fn new(octets: [u8; MAC_LEN]) -> Self {
        MacAddress(octets)
    }

    /// Copy a MAC out of a wire buffer. `data` must hold at least six bytes.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut octets = [0u8; MAC_LEN];
        octets.copy_from_slice(&data[..MAC_LEN]);
        MacAddress(octets)
    }

    /// Parse `aa:bb:cc:dd:ee:ff` (`-` works as separator too, but not
    /// mixed). Malformed input yields the zero MAC; textual MACs only occur
    /// off the hot path and a zero source MAC is invalid on the wire anyway.
    pub fn parse(s: &str) -> Self {
        let bytes = s.as_bytes();
        if bytes.len() != 17 {
            return MacAddress::default();
        }

        let separator = bytes[2];
        if separator != b':' && separator != b'-' {
            return MacAddress::default();
        }

        let mut octets = [0u8; MAC_LEN];
        for (i, octet) in octets.iter_mut().enumerate() {
            let pos = i * 3;
            if i > 0 && bytes[pos - 1] != separator {
                return MacAddress::default();
            }
            if !bytes[pos].is_ascii_hexdigit() || !bytes[pos + 1].is_ascii_hexdigit() {
                return MacAddress::default();
            }
            match u8::from_str_radix(&s[pos..pos + 2], 16) {
                Ok(value) => *octet = value,
                Err(_) => return MacAddress::default(),
            }
        }

        MacAddress(octets)
    }

    pub const fn octets(&self) -> [u8; MAC_LEN] {
        self.0
    }

    /// All octets 0xff.
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; MAC_LEN]
    }

    /// All octets zero. Doubles as the sentinel for failed parses.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; MAC_LEN]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// A decoded Ethernet frame: the 14-byte header plus an opaque payload.
///
/// The ethertype is stored in host order and written big-endian on the
/// wire. The switch never inspects the payload; it travels verbatim.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    dst: MacAddress,
    src: MacAddress,
    ethertype: u16,
    payload: Vec<u8>,
}

impl EthernetFrame {
    pub fn new(dst: MacAddress, src: MacAddress, ethertype: u16, payload: Vec<u8>) -> Self {
        EthernetFrame {
            dst,
            src,
            ethertype,
            payload,
        }
    }

    /// Decode a frame from wire bytes.
    ///
    /// Input shorter than the 14-byte header decodes to the default frame
    /// (zero MACs, ethertype 0, empty payload) — the same sentinel
    /// convention as [`MacAddress::parse`]. Never fails for longer input.
    pub fn parse(data: &[u8]) -> Self {
        if data.len() < ETHERNET_HEADER_LEN {
            return EthernetFrame::default();
        }

        EthernetFrame {
            dst: MacAddress::from_slice(&data[0..6]),
            src: MacAddress::from_slice(&data[6..12]),
            ethertype: u16::from_be_bytes([data[12], data[13]]),
            payload: data[ETHERNET_HEADER_LEN..].to_vec(),
        }
    }

    /// Encode to wire bytes: dst, src, big-endian ethertype, payload.
    /// Produces exactly `14 + payload.len()` bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ETHERNET_HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.dst.octets());
        out.extend_from_slice(&self.src.octets());
        out.extend_from_slice(&self.ethertype.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn dst_mac(&self) -> MacAddress {
        self.dst
    }

    pub fn src_mac(&self) -> MacAddress {
        self.src
    }

    pub fn ethertype(&self) -> u16 {
        self.ethertype
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serialized size: header plus payload.
    pub fn wire_len(&self) -> usize {
        ETHERNET_HEADER_LEN + self.payload.len()
    }

    pub fn is_broadcast(&self) -> bool {
        self.dst.is_broadcast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_display_is_lowercase_colon() {
        let mac = MacAddress::new([0x00, 0x1A, 0x2B, 0x3C, 0x4D, 0x5E]);
        assert_eq!(mac.to_string(), "00:1a:2b:3c:4d:5e");
    }

    #[test]
    fn mac_parse_accepts_both_separators() {
        let expected = MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(MacAddress::parse("00:11:22:33:44:55"), expected);
        assert_eq!(MacAddress::parse("00-11-22-33-44-55"), expected);
        assert_eq!(MacAddress::parse("00:11:22:33:44:55"), expected);
        // Hex is case-insensitive
        assert_eq!(
            MacAddress::parse("AA:BB:CC:DD:EE:FF"),
            MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff])
        );
    }

    #[test]
    fn mac_parse_rejects_malformed_input() {
        assert!(MacAddress::parse("").is_zero());
        assert!(MacAddress::parse("00:11:22:33:44").is_zero());
        assert!(MacAddress::parse("00:11:22:33:44:55:66").is_zero());
        assert!(MacAddress::parse("00:11:22:33:44:5").is_zero());
        // Mixed separators
        assert!(MacAddress::parse("00:11-22:33:44:55").is_zero());
        // Wrong separator
        assert!(MacAddress::parse("00.11.22.33.44.55").is_zero());
        // Bad hex digits
        assert!(MacAddress::parse("g0:11:22:33:44:55").is_zero());
        assert!(MacAddress::parse("00:11:22:33:44:5g").is_zero());
        // Sign characters are not hex digits
        assert!(MacAddress::parse("+0:11:22:33:44:55").is_zero());
        // 17 bytes but not ASCII
        assert!(MacAddress::parse("0ü:11:22:33:44:5").is_zero());
    }

    #[test]
    fn mac_text_round_trip() {
        let mac = MacAddress::new([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(MacAddress::parse(&mac.to_string()), mac);
    }

    #[test]
    fn mac_predicates() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(!MacAddress::BROADCAST.is_zero());
        assert!(MacAddress::default().is_zero());
        assert!(!MacAddress::default().is_broadcast());
        assert!(!MacAddress::new([0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]).is_broadcast());
    }

    #[test]
    fn mac_ordering_is_lexicographic() {
        let a = MacAddress::new([0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
        let b = MacAddress::new([0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);
        assert!(a < b);
        assert!(MacAddress::default() < a);
        assert!(b < MacAddress::BROADCAST);
    }

    #[test]
    fn parse_known_frame() {
        let bytes = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // dst
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // src
            0x08, 0x00, // ethertype: IPv4
            0xde, 0xad, 0xbe, 0xef, // payload
        ];

        let frame = EthernetFrame::parse(&bytes);
        assert_eq!(frame.dst_mac(), MacAddress::BROADCAST);
        assert_eq!(
            frame.src_mac(),
            MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])
        );
        assert_eq!(frame.ethertype(), ETHERTYPE_IPV4);
        assert_eq!(frame.payload(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(frame.wire_len(), 18);
        assert!(frame.is_broadcast());

        assert_eq!(frame.serialize(), bytes);
    }

    #[test]
    fn short_input_parses_to_sentinel() {
        let frame = EthernetFrame::parse(&[0xff; 13]);
        assert!(frame.dst_mac().is_zero());
        assert!(frame.src_mac().is_zero());
        assert_eq!(frame.ethertype(), 0);
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn header_only_frame_has_empty_payload() {
        let frame = EthernetFrame::parse(&[0xab; ETHERNET_HEADER_LEN]);
        assert!(frame.payload().is_empty());
        assert_eq!(frame.wire_len(), ETHERNET_HEADER_LEN);
        assert_eq!(frame.serialize().len(), ETHERNET_HEADER_LEN);
    }

    #[test]
    fn frame_round_trip() {
        let frame = EthernetFrame::new(
            MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
            MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]),
            ETHERTYPE_ARP,
            vec![0x00, 0x01, 0x08, 0x00, 0x06, 0x04],
        );
        assert_eq!(EthernetFrame::parse(&frame.serialize()), frame);

        let empty =
            EthernetFrame::new(MacAddress::BROADCAST, MacAddress::default(), ETHERTYPE_IPV6, vec![]);
        assert_eq!(EthernetFrame::parse(&empty.serialize()), empty);
    }

    #[test]
    fn bytes_round_trip_through_parse() {
        let mut bytes = vec![0u8; ETHERNET_HEADER_LEN];
        bytes.extend((0..=255u8).cycle().take(1504));
        bytes[..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        bytes[6..12].copy_from_slice(&[7, 8, 9, 10, 11, 12]);
        bytes[12] = 0x86;
        bytes[13] = 0xdd;
        assert_eq!(EthernetFrame::parse(&bytes).serialize(), bytes);
    }
}
