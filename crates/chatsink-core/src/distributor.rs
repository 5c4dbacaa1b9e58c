use crate::config::AccountConfig;

/// The subset of accounts one worker process runs.
#[derive(Clone, Debug)]
pub struct WorkerAssignment {
    pub index: usize,
    pub accounts: Vec<AccountConfig>,
}

/// Partition accounts into `min(workers, accounts.len())` non-empty buckets,
/// round-robin by original index.
///
/// Deterministic for a given input order: workers re-derive their own bucket
/// from the shared configuration, and a restart reproduces the same
/// placement. Per-account traffic is not considered.
pub fn distribute(accounts: Vec<AccountConfig>, workers: usize) -> Vec<WorkerAssignment> {
    let effective = workers.min(accounts.len());
    if effective == 0 {
        return Vec::new();
    }

    let mut assignments: Vec<WorkerAssignment> = (0..effective)
        .map(|index| WorkerAssignment {
            index,
            accounts: Vec::new(),
        })
        .collect();

    for (i, account) in accounts.into_iter().enumerate() {
        assignments[i % effective].accounts.push(account);
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformKind;

    fn accounts(n: usize) -> Vec<AccountConfig> {
        (0..n)
            .map(|i| AccountConfig {
                stream_key: format!("c{i}"),
                platform: PlatformKind::Telegram,
                token: format!("T{i}"),
            })
            .collect()
    }

    #[test]
    fn produces_min_of_workers_and_accounts_buckets() {
        assert_eq!(distribute(accounts(5), 2).len(), 2);
        assert_eq!(distribute(accounts(2), 8).len(), 2);
        assert_eq!(distribute(accounts(0), 4).len(), 0);
    }

    #[test]
    fn bucket_sizes_differ_by_at_most_one() {
        for (n, w) in [(7, 3), (10, 4), (3, 2), (1, 1), (12, 5)] {
            let assignments = distribute(accounts(n), w);
            let sizes: Vec<usize> = assignments.iter().map(|a| a.accounts.len()).collect();
            let min = sizes.iter().min().unwrap();
            let max = sizes.iter().max().unwrap();
            assert!(max - min <= 1, "n={n} w={w} sizes={sizes:?}");
            assert!(*min >= 1, "n={n} w={w} produced an empty bucket");
        }
    }

    #[test]
    fn union_of_buckets_equals_input() {
        let input = accounts(7);
        let assignments = distribute(input.clone(), 3);

        let mut rejoined: Vec<AccountConfig> = assignments
            .into_iter()
            .flat_map(|a| a.accounts)
            .collect();
        rejoined.sort_by(|a, b| a.stream_key.cmp(&b.stream_key));

        let mut expected = input;
        expected.sort_by(|a, b| a.stream_key.cmp(&b.stream_key));
        assert_eq!(rejoined, expected);
    }

    #[test]
    fn assignment_is_round_robin_by_index() {
        let assignments = distribute(accounts(5), 2);
        let keys = |i: usize| -> Vec<&str> {
            assignments[i].accounts.iter().map(|a| a.stream_key.as_str()).collect()
        };
        assert_eq!(keys(0), ["c0", "c2", "c4"]);
        assert_eq!(keys(1), ["c1", "c3"]);
    }

    #[test]
    fn distribution_is_deterministic() {
        let a = distribute(accounts(9), 4);
        let b = distribute(accounts(9), 4);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.index, y.index);
            assert_eq!(x.accounts, y.accounts);
        }
    }
}
