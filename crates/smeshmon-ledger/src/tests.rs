// Merge behaviour of the event log

#[cfg(test)]
mod tests {
    use crate::*;
    use proptest::prelude::*;
    use smeshmon_types::*;

    fn identity(byte: u8) -> Identity {
        Identity::from_bytes([byte; IDENTITY_LEN])
    }

    fn atx(id: Identity, time: Millis) -> SmesherEvent {
        SmesherEvent::new(id, time, EventDetails::AtxReady)
    }

    fn retrying(id: Identity, time: Millis, message: &str) -> SmesherEvent {
        SmesherEvent::new(
            id,
            time,
            EventDetails::Retrying {
                message: message.to_string(),
            },
        )
    }

    #[test]
    fn test_duplicate_delivery_is_dropped() {
        let mut log = MemoryEventLog::new();
        let a = identity(1);

        let first = log.append(&[atx(a, 10), atx(a, 20)]);
        assert_eq!(first.added, 2);
        assert_eq!(first.new_identities, vec![a]);

        // same natural key, different payload: still a duplicate
        let second = log.append(&[atx(a, 20), retrying(a, 30, "x"), retrying(a, 30, "y")]);
        assert_eq!(second.added, 1);
        assert_eq!(second.duplicates, 2);
        assert!(second.new_identities.is_empty());

        assert_eq!(log.len(), 3);
        assert_eq!(
            log.events(&a).iter().map(|e| e.time).collect::<Vec<_>>(),
            vec![10, 20, 30]
        );
    }

    #[test]
    fn test_same_time_different_kind_both_kept() {
        let mut log = MemoryEventLog::new();
        let a = identity(1);
        log.append(&[retrying(a, 10, "x"), atx(a, 10)]);
        let kinds: Vec<EventKind> = log.events(&a).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::Retrying, EventKind::AtxReady]);
    }

    #[test]
    fn test_identities_are_first_seen_ordered() {
        let mut log = MemoryEventLog::new();
        let (a, b, c) = (identity(3), identity(1), identity(2));

        log.append(&[atx(a, 5), atx(b, 1)]);
        log.append(&[atx(c, 0), atx(a, 6)]);

        assert_eq!(log.identities(), &[a, b, c]);
        assert_eq!(log.index_of(&c), Some(2));
        assert_eq!(log.index_of(&identity(9)), None);
        assert!(log.events(&identity(9)).is_empty());
    }

    #[test]
    fn test_pending_follows_watermark() {
        let mut log = MemoryEventLog::new();
        let a = identity(1);
        log.append(&[atx(a, 10), atx(a, 20), atx(a, 30)]);

        assert_eq!(log.pending(&a).len(), 3);
        log.mark_processed(&a, 2);
        assert_eq!(log.processed(&a), 2);
        assert_eq!(log.pending(&a)[0].time, 30);

        log.mark_processed(&a, 99);
        assert_eq!(log.processed(&a), 3);
        assert!(log.pending(&a).is_empty());
    }

    #[test]
    fn test_late_event_rewinds_watermark() {
        let mut log = MemoryEventLog::new();
        let a = identity(1);
        let b = identity(2);
        log.append(&[atx(a, 10), atx(a, 30), atx(b, 10)]);
        log.mark_processed(&a, 2);
        log.mark_processed(&b, 1);

        let summary = log.append(&[atx(a, 20), atx(b, 40)]);
        assert_eq!(summary.rewound, vec![a]);
        assert_eq!(log.processed(&a), 1);
        assert_eq!(
            log.pending(&a).iter().map(|e| e.time).collect::<Vec<_>>(),
            vec![20, 30]
        );
        assert_eq!(log.processed(&b), 1);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut log = MemoryEventLog::new();
        let a = identity(4);
        let b = identity(2);
        log.append(&[atx(a, 1), atx(b, 2), atx(a, 3)]);
        log.mark_processed(&a, 1);

        let snapshot = log.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: LogSnapshot = serde_json::from_str(&json).unwrap();

        let mut restored = MemoryEventLog::new();
        restored.restore(&decoded);
        assert_eq!(restored.identities(), &[a, b]);
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.processed(&a), 1);

        restored.clear();
        assert!(restored.is_empty());
        assert!(restored.identities().is_empty());
    }

    proptest! {
        #[test]
        fn prop_merged_log_is_sorted_and_unique(
            batches in prop::collection::vec(
                prop::collection::vec((0u8..3, 0i64..50, any::<bool>()), 0..20),
                1..6,
            )
        ) {
            let mut log = MemoryEventLog::new();
            for batch in &batches {
                let events: Vec<SmesherEvent> = batch
                    .iter()
                    .map(|(who, time, fail)| {
                        if *fail {
                            retrying(identity(*who), *time, "e")
                        } else {
                            atx(identity(*who), *time)
                        }
                    })
                    .collect();
                log.append(&events);
            }

            let mut total = 0;
            for id in log.identities() {
                let events = log.events(id);
                total += events.len();
                for pair in events.windows(2) {
                    prop_assert!((pair[0].time, pair[0].kind()) < (pair[1].time, pair[1].kind()));
                }
            }
            prop_assert_eq!(total, log.len());
        }
    }
}
