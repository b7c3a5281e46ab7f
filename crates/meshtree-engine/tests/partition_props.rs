use meshtree_engine::{Partition, PartitionStrategy};
use proptest::prelude::*;

fn owners(strategy: PartitionStrategy, total: u32, index: usize, count: usize) -> usize {
    (0..total)
        .filter(|&rank| Partition::new(rank, total).owns(strategy, index, count))
        .count()
}

proptest! {
    #[test]
    fn every_sibling_has_exactly_one_owner(total in 1u32..16, count in 0usize..64) {
        for strategy in [PartitionStrategy::RoundRobin, PartitionStrategy::Contiguous] {
            for index in 0..count {
                prop_assert_eq!(owners(strategy, total, index, count), 1);
            }
        }
    }

    #[test]
    fn contiguous_shares_are_ranges(total in 1u32..16, count in 0usize..64) {
        for rank in 0..total {
            let p = Partition::new(rank, total);
            let owned: Vec<usize> = (0..count)
                .filter(|&i| p.owns(PartitionStrategy::Contiguous, i, count))
                .collect();
            if let (Some(first), Some(last)) = (owned.first(), owned.last()) {
                prop_assert_eq!(last - first + 1, owned.len());
            }
        }
    }

    #[test]
    fn unset_partition_owns_everything(index in 0usize..100, count in 1usize..100) {
        let p = Partition::new(0, 0);
        prop_assert!(p.owns(PartitionStrategy::Contiguous, index, count));
        prop_assert!(p.owns(PartitionStrategy::RoundRobin, index, count));
    }
}
