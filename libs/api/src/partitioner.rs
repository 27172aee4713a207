use std::collections::HashMap;

use crate::{DeliveryError, DeliveryErrorKind, Message};

/// Kafka-совместимый murmur2 (seed `0x9747b28c`).
///
/// Тот же хэш использует default partitioner Java/JS клиентов, поэтому
/// один и тот же key попадает в ту же партицию независимо от клиента.
pub fn murmur2(data: &[u8]) -> u32 {
    const SEED: u32 = 0x9747_b28c;
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let len = data.len();
    let mut h = SEED ^ (len as u32);

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Partition selection used by the bundled clusters.
///
/// - explicit `message.partition` wins (must be `< partitions`);
/// - keyed messages: `murmur2(key) & 0x7fffffff % partitions`;
/// - unkeyed messages: round-robin per topic.
#[derive(Debug, Default)]
pub struct DefaultPartitioner {
    round_robin: HashMap<String, u32>,
}

impl DefaultPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(&mut self, message: &Message, partitions: u32) -> Result<u32, DeliveryError> {
        if partitions == 0 {
            return Err(DeliveryError::invalid_topic(format!(
                "topic '{}' has no partitions",
                message.topic
            )));
        }
        if let Some(p) = message.partition {
            if p >= partitions {
                return Err(DeliveryError::new(
                    DeliveryErrorKind::InvalidPartition,
                    format!("partition {p} out of range, topic '{}' has {partitions}", message.topic),
                ));
            }
            return Ok(p);
        }
        if let Some(key) = &message.key {
            return Ok((murmur2(key) & 0x7fff_ffff) % partitions);
        }
        let counter = self.round_robin.entry(message.topic.clone()).or_insert(0);
        let p = *counter % partitions;
        *counter = counter.wrapping_add(1);
        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn murmur2_matches_kafka_vectors() {
        assert_eq!(murmur2(b"21") as i32, -973_932_308);
        assert_eq!(murmur2(b"foobar") as i32, -790_332_482);
        assert_eq!(murmur2(b"a-little-bit-long-string") as i32, -985_981_536);
        assert_eq!(murmur2(b"a-little-bit-longer-string") as i32, -1_486_304_829);
    }

    #[test]
    fn explicit_partition_wins() {
        let mut p = DefaultPartitioner::new();
        let msg = Message::new("rider-updates", "v").with_key("u1").with_partition(1);
        assert_eq!(p.partition(&msg, 2).unwrap(), 1);

        let err = p
            .partition(&Message::new("rider-updates", "v").with_partition(2), 2)
            .unwrap_err();
        assert_eq!(err.kind(), DeliveryErrorKind::InvalidPartition);
    }

    #[test]
    fn same_key_same_partition() {
        let mut p = DefaultPartitioner::new();
        let msg = Message::new("rider-updates", "v").with_key("localupdate");
        let first = p.partition(&msg, 8).unwrap();
        for _ in 0..10 {
            assert_eq!(p.partition(&msg, 8).unwrap(), first);
        }
    }

    #[test]
    fn unkeyed_round_robin_per_topic() {
        let mut p = DefaultPartitioner::new();
        let a = Message::new("a", "v");
        let b = Message::new("b", "v");
        assert_eq!(p.partition(&a, 3).unwrap(), 0);
        assert_eq!(p.partition(&a, 3).unwrap(), 1);
        assert_eq!(p.partition(&b, 3).unwrap(), 0);
        assert_eq!(p.partition(&a, 3).unwrap(), 2);
        assert_eq!(p.partition(&a, 3).unwrap(), 0);
    }
}
