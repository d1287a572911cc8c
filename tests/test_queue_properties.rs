//! Property-based tests for the task queue and agent registry

use futures::FutureExt;
use proptest::prelude::*;
use uuid::Uuid;
use vacancy_broker::dispatch::{AgentRegistry, TaskQueue};
use vacancy_broker::VacancyRequest;

proptest! {
    #[test]
    fn dequeue_preserves_enqueue_order(
        requests in prop::collection::vec((".{0,16}", any::<i64>()), 0..64)
    ) {
        let queue = TaskQueue::new();
        let ids: Vec<Uuid> = requests.iter().map(|_| Uuid::new_v4()).collect();

        for (id, (query, user_id)) in ids.iter().zip(&requests) {
            queue.enqueue(*id, VacancyRequest::new(query.clone(), *user_id));
        }
        prop_assert_eq!(queue.size(), requests.len());
        queue.close();

        let drained = tokio_test::block_on(async {
            let mut drained = Vec::new();
            while let Some(entry) = queue.dequeue().await {
                drained.push(entry);
            }
            drained
        });

        let drained_ids: Vec<Uuid> = drained.iter().map(|e| e.request_id).collect();
        prop_assert_eq!(drained_ids, ids);
        for (entry, (query, user_id)) in drained.iter().zip(&requests) {
            prop_assert_eq!(&entry.request.query, query);
            prop_assert_eq!(entry.request.user_id, *user_id);
        }
    }

    #[test]
    fn interleaved_operations_stay_fifo(
        ops in prop::collection::vec(any::<bool>(), 1..128)
    ) {
        // true = enqueue, false = dequeue without waiting
        let queue = TaskQueue::new();
        let mut expected = std::collections::VecDeque::new();

        for (n, enqueue) in ops.into_iter().enumerate() {
            if enqueue {
                let id = Uuid::new_v4();
                queue.enqueue(id, VacancyRequest::new("q", n as i64));
                expected.push_back(id);
            } else {
                let got = queue
                    .dequeue()
                    .now_or_never()
                    .flatten()
                    .map(|e| e.request_id);
                prop_assert_eq!(got, expected.pop_front());
            }
            prop_assert_eq!(queue.size(), expected.len());
        }
    }

    #[test]
    fn registering_twice_never_grows_registry(
        ids in prop::collection::vec("[a-z0-9-]{1,12}", 1..32)
    ) {
        let registry = AgentRegistry::new();
        for id in &ids {
            registry.register(id);
        }
        let size = registry.count();

        for id in &ids {
            prop_assert!(!registry.register(id));
        }
        prop_assert_eq!(registry.count(), size);

        let unique: std::collections::HashSet<_> = ids.iter().collect();
        prop_assert_eq!(size, unique.len());
    }
}
