//! The deck's aggregate card count always equals its live rows and never
//! exceeds capacity, whatever mix of saves and deletes reaches it.

use carden::PersistenceCoordinator;
use carden_db::{CardenDb, NewDeck};
use carden_types::CandidateCard;
use proptest::prelude::*;
use std::sync::Arc;

const MAX_CARDS: i64 = 8;

#[derive(Debug, Clone)]
enum Op {
    /// Save a batch drawn from a small vocabulary, so repeats are common.
    Save(Vec<usize>),
    /// Soft-delete the live card at this position (modulo the live count).
    Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(0usize..12, 0..6).prop_map(Op::Save),
        1 => any::<usize>().prop_map(Op::Delete),
    ]
}

fn card(word: usize) -> CandidateCard {
    // Alternate casing so normalised duplicates show up too.
    if word % 2 == 0 {
        CandidateCard::new(format!("Word {word}"), format!("TU {word}"))
    } else {
        CandidateCard::new(format!("word {word}"), format!("tu {word}"))
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn counts_stay_consistent(ops in prop::collection::vec(op(), 1..24)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let db = CardenDb::open_in_memory().await.unwrap();
            let deck_id = db
                .create_deck(&NewDeck::new(1, "Mixed").with_max_cards(MAX_CARDS))
                .await
                .unwrap();
            let coordinator = PersistenceCoordinator::new(Arc::new(db.clone()));

            for op in &ops {
                match op {
                    Op::Save(words) => {
                        let cards: Vec<_> = words.iter().copied().map(card).collect();
                        let report = coordinator.save(deck_id, &cards, None).await;
                        prop_assert!(report.success);
                        prop_assert_eq!(
                            report.saved_count + report.duplicate_count + report.over_capacity_count,
                            cards.len()
                        );
                    }
                    Op::Delete(position) => {
                        let live = db.list_cards(deck_id).await.unwrap();
                        if !live.is_empty() {
                            let target = &live[position % live.len()];
                            prop_assert!(db.soft_delete_card(target.id).await.unwrap());
                        }
                    }
                }

                let counts = db.deck_counts(deck_id).await.unwrap();
                prop_assert!(counts.is_consistent(), "{:?} after {:?}", counts, op);
                prop_assert!(counts.live <= MAX_CARDS);
            }
            Ok(())
        })?;
    }
}
