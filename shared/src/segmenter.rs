//! Splits a point sequence into ordered, bounded work packets.

use std::num::NonZeroUsize;

use crate::models::{packet::WorkPacket, point::Point};

/// Packet size that amounts to roughly `packet_seconds` of drawing at `points_per_second`.
///
/// Never below one point, whatever the budget says.
pub fn packet_size_for(points_per_second: f64, packet_seconds: f64) -> NonZeroUsize {
    let size = (points_per_second * packet_seconds).floor();
    let size = if size.is_finite() && size >= 1.0 {
        size as usize
    } else {
        1
    };
    NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN)
}

/// Lazy iterator of [`WorkPacket`]s over a point sequence.
///
/// Packets preserve input order, never overlap and leave no gaps; only the last one may be
/// shorter than the packet size.
pub struct Segmenter<I> {
    points: I,
    packet_size: NonZeroUsize,
    next_sequence: u64,
    next_offset: u64,
}

pub fn segment<I>(points: I, packet_size: NonZeroUsize) -> Segmenter<I::IntoIter>
where
    I: IntoIterator<Item = Point>,
{
    Segmenter {
        points: points.into_iter(),
        packet_size,
        next_sequence: 0,
        next_offset: 0,
    }
}

impl<I> Segmenter<I> {
    /// Numbers packet offsets from `offset` instead of zero, for sequences that resume
    /// partway through a source.
    pub fn starting_at(mut self, offset: u64) -> Self {
        self.next_offset = offset;
        self
    }
}

impl<I> Iterator for Segmenter<I>
where
    I: Iterator<Item = Point>,
{
    type Item = WorkPacket;

    fn next(&mut self) -> Option<Self::Item> {
        let points: Vec<Point> = self.points.by_ref().take(self.packet_size.get()).collect();
        if points.is_empty() {
            return None;
        }

        let packet = WorkPacket::new(self.next_sequence, self.next_offset, points);
        self.next_sequence += 1;
        self.next_offset = packet.end();
        Some(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::color::Color;

    fn points(n: u32) -> Vec<Point> {
        (0..n)
            .map(|i| Point::new(i % 7, i / 7, Color::new(i as u8, 0, 0)))
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn concatenated_packets_rebuild_the_input() {
        for (n, packet_size) in [(0, 3), (1, 3), (9, 3), (10, 3), (10, 1), (5, 100)] {
            let input = points(n);
            let packets: Vec<_> = segment(input.clone(), size(packet_size)).collect();

            let rebuilt: Vec<Point> = packets.iter().flat_map(|p| p.points.clone()).collect();
            assert_eq!(rebuilt, input, "n={n} size={packet_size}");
            assert!(packets.iter().all(|p| p.len() <= packet_size));
            assert!(packets
                .iter()
                .rev()
                .skip(1)
                .all(|p| p.len() == packet_size));
        }
    }

    #[test]
    fn empty_input_yields_no_packets() {
        assert_eq!(segment(Vec::new(), size(4)).count(), 0);
    }

    #[test]
    fn sequences_and_offsets_are_contiguous() {
        let packets: Vec<_> = segment(points(7), size(3)).starting_at(20).collect();
        let meta: Vec<_> = packets.iter().map(|p| (p.sequence, p.offset, p.len())).collect();
        assert_eq!(meta, vec![(0, 20, 3), (1, 23, 3), (2, 26, 1)]);
    }

    #[test]
    fn packet_size_follows_the_rate_budget() {
        assert_eq!(packet_size_for(5.0, 40.0).get(), 200);
        assert_eq!(packet_size_for(0.5, 3.0).get(), 1);
        assert_eq!(packet_size_for(0.0, 40.0).get(), 1);
        assert_eq!(packet_size_for(f64::NAN, 40.0).get(), 1);
    }
}
