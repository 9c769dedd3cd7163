//! Magic packet codec: build the outbound packet, recognise inbound ones.

use crate::identity::MacAddress;
use crate::protocol::{MagicPacket, MAGIC_PACKET_LEN, SYNC_BYTE, SYNC_LEN};

/// Build the 102-byte magic packet for `target`: sync header then the MAC 16 times.
pub fn encode(target: &MacAddress) -> MagicPacket {
    let mut out = [SYNC_BYTE; MAGIC_PACKET_LEN];
    for block in out[SYNC_LEN..].chunks_exact_mut(target.as_bytes().len()) {
        block.copy_from_slice(target.as_bytes());
    }
    MagicPacket::from_bytes(out)
}

/// Recognise a magic packet in the first `received_len` bytes of `buffer`.
///
/// Returns `None` ("not a magic packet") for anything shorter than 102 bytes or without
/// the `0xFF` sync header. Only the first MAC block is significant; the remaining
/// repetitions are not checked. Bytes past 102 are ignored.
pub fn validate(buffer: &[u8], received_len: usize) -> Option<MagicPacket> {
    if received_len < MAGIC_PACKET_LEN {
        return None;
    }
    let data = buffer.get(..received_len)?;
    if data[..SYNC_LEN].iter().any(|&b| b != SYNC_BYTE) {
        return None;
    }
    let mut bytes = [0u8; MAGIC_PACKET_LEN];
    bytes.copy_from_slice(&data[..MAGIC_PACKET_LEN]);
    Some(MagicPacket::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};

    fn random_mac(rng: &mut impl RngCore) -> MacAddress {
        let mut b = [0u8; 6];
        rng.fill_bytes(&mut b);
        MacAddress::new(b)
    }

    #[test]
    fn encode_known_mac() {
        let mac = MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap();
        let packet = encode(&mac);
        let bytes = packet.as_bytes();
        assert_eq!(bytes.len(), 102);
        assert_eq!(&bytes[..6], &[0xFF; 6]);
        for block in bytes[6..].chunks(6) {
            assert_eq!(block, &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        }
    }

    #[test]
    fn encode_then_validate_recovers_target_for_any_spelling() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let mac = random_mac(&mut rng);
            let hex = hex::encode(mac.as_bytes());
            let colon = mac.to_string();
            let hyphen = colon.replace(':', "-").to_lowercase();
            for text in [hex.as_str(), colon.as_str(), hyphen.as_str()] {
                let parsed = MacAddress::parse(text).unwrap();
                let packet = encode(&parsed);
                let got = validate(packet.as_bytes(), packet.as_bytes().len()).unwrap();
                assert_eq!(got.target(), mac);
                assert_eq!(got, packet);
            }
        }
    }

    #[test]
    fn validate_accepts_longer_buffers_with_header() {
        let mut rng = rand::thread_rng();
        let mac = random_mac(&mut rng);
        let packet = encode(&mac);
        for extra in [0usize, 1, 50, 922] {
            let mut buf = packet.as_bytes().to_vec();
            buf.extend(std::iter::repeat(0x5A).take(extra));
            let got = validate(&buf, buf.len()).expect("header-correct buffer");
            assert_eq!(got.target(), mac);
        }
    }

    #[test]
    fn validate_rejects_short_buffers() {
        let packet = encode(&MacAddress::new([1, 2, 3, 4, 5, 6]));
        for len in 0..102 {
            assert!(validate(packet.as_bytes(), len).is_none(), "len {len}");
        }
        // Scenario: a 60-byte datagram is not a magic packet.
        let buf = [0xFFu8; 60];
        assert!(validate(&buf, buf.len()).is_none());
    }

    #[test]
    fn validate_rejects_any_bad_header_byte() {
        let mut rng = rand::thread_rng();
        let packet = encode(&random_mac(&mut rng));
        for i in 0..6 {
            let mut buf = *packet.as_bytes();
            buf[i] = rng.gen_range(0..0xFF);
            assert!(validate(&buf, buf.len()).is_none());
        }
    }

    #[test]
    fn validate_never_panics_on_random_input() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let len = rng.gen_range(0..300);
            let mut buf = vec![0u8; len];
            rng.fill_bytes(&mut buf);
            let _ = validate(&buf, len);
            // A length claim past the buffer is simply not a packet.
            assert!(validate(&buf, len + 200).is_none());
        }
    }

    #[test]
    fn repetitions_are_not_reverified() {
        let mut buf = *encode(&MacAddress::new([9, 8, 7, 6, 5, 4])).as_bytes();
        buf[50] ^= 0xFF;
        let got = validate(&buf, buf.len()).unwrap();
        assert_eq!(got.target(), MacAddress::new([9, 8, 7, 6, 5, 4]));
    }
}
