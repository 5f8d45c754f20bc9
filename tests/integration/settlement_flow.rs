//! The full escrowed settlement flow, delivered in order.

use crate::common::harness::TwoPartyHarness;
use bazaar::{ActionRequest, OrderItemStatus, OrderStatus, ProcessingStatus};

#[tokio::test]
async fn full_settlement_ends_complete_on_both_peers() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("vintage synth", 250_000).await;

    // BID opens the chain.
    let bid = h
        .buyer
        .service
        .submit(ActionRequest::Bid {
            listing_item_hash: listing.hash.clone(),
            shipping_address: "12 Example Row".to_string(),
        })
        .await
        .unwrap();
    let root = bid.hash.clone();
    assert_eq!(
        h.buyer.statuses(&root).await,
        (OrderItemStatus::Bidded, OrderStatus::Sent)
    );

    assert_eq!(
        h.deliver_to_seller().await,
        vec![ProcessingStatus::Processed]
    );
    assert_eq!(
        h.seller.statuses(&root).await,
        (OrderItemStatus::Bidded, OrderStatus::Received)
    );

    // ACCEPT.
    h.clock.advance(1_000);
    let accept = h
        .seller
        .service
        .submit(ActionRequest::Accept {
            bid_hash: root.clone(),
        })
        .await
        .unwrap();
    assert_eq!(h.deliver_to_buyer().await, vec![ProcessingStatus::Processed]);
    for peer in [&h.buyer, &h.seller] {
        assert_eq!(
            peer.statuses(&root).await,
            (OrderItemStatus::AwaitingEscrow, OrderStatus::Processing)
        );
    }

    // LOCK broadcasts the funding transaction and carries its txid.
    h.clock.advance(1_000);
    let lock = h
        .buyer
        .service
        .submit(ActionRequest::Lock {
            bid_hash: accept.hash.clone(),
        })
        .await
        .unwrap();
    assert_eq!(h.buyer.escrow.broadcast_count().await, 1);
    let txid = lock.data.get("txid").cloned().expect("lock should carry txid");

    assert_eq!(
        h.deliver_to_seller().await,
        vec![ProcessingStatus::Processed]
    );
    let seller_lock = h.seller.store.bid_by_hash(&lock.hash).await.unwrap();
    assert_eq!(seller_lock.data.get("txid"), Some(&txid));
    for peer in [&h.buyer, &h.seller] {
        assert_eq!(
            peer.statuses(&root).await,
            (OrderItemStatus::EscrowLocked, OrderStatus::Processing)
        );
    }

    // COMPLETE.
    h.clock.advance(1_000);
    let complete = h
        .buyer
        .service
        .submit(ActionRequest::Complete {
            bid_hash: lock.hash.clone(),
        })
        .await
        .unwrap();
    assert_eq!(
        h.deliver_to_seller().await,
        vec![ProcessingStatus::Processed]
    );
    for peer in [&h.buyer, &h.seller] {
        assert_eq!(
            peer.statuses(&root).await,
            (OrderItemStatus::EscrowCompleted, OrderStatus::Processing)
        );
    }

    // SHIP.
    h.clock.advance(1_000);
    let ship = h
        .seller
        .service
        .submit(ActionRequest::Ship {
            bid_hash: complete.hash.clone(),
            tracking: Some("TRK-7".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(h.deliver_to_buyer().await, vec![ProcessingStatus::Processed]);
    for peer in [&h.buyer, &h.seller] {
        assert_eq!(
            peer.statuses(&root).await,
            (OrderItemStatus::Shipping, OrderStatus::Shipping)
        );
    }
    let buyer_ship = h.buyer.store.bid_by_hash(&ship.hash).await.unwrap();
    assert_eq!(buyer_ship.data.get("tracking").map(String::as_str), Some("TRK-7"));

    // RELEASE finishes the trade.
    h.clock.advance(1_000);
    h.seller
        .service
        .submit(ActionRequest::Release {
            bid_hash: ship.hash.clone(),
        })
        .await
        .unwrap();
    assert_eq!(h.deliver_to_buyer().await, vec![ProcessingStatus::Processed]);
    for peer in [&h.buyer, &h.seller] {
        assert_eq!(
            peer.statuses(&root).await,
            (OrderItemStatus::Complete, OrderStatus::Complete)
        );
    }

    // Notifications fire only for inbound messages, named by action.
    assert_eq!(
        h.seller.notifier.event_names().await,
        vec!["BID", "LOCK", "COMPLETE"]
    );
    assert_eq!(
        h.buyer.notifier.event_names().await,
        vec!["ACCEPT", "SHIP", "RELEASE"]
    );

    // The seller settled via one broadcast (release), the buyer via two
    // (funding, complete).
    assert_eq!(h.buyer.escrow.broadcast_count().await, 2);
    assert_eq!(h.seller.escrow.broadcast_count().await, 1);
}

#[tokio::test]
async fn chains_are_singly_linked_and_ordered() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("field recorder", 90_000).await;

    let bid = h
        .buyer
        .service
        .submit(ActionRequest::Bid {
            listing_item_hash: listing.hash.clone(),
            shipping_address: "12 Example Row".to_string(),
        })
        .await
        .unwrap();
    h.deliver_to_seller().await;

    h.clock.advance(1_000);
    let accept = h
        .seller
        .service
        .submit(ActionRequest::Accept {
            bid_hash: bid.hash.clone(),
        })
        .await
        .unwrap();
    h.deliver_to_buyer().await;

    h.clock.advance(1_000);
    let lock = h
        .buyer
        .service
        .submit(ActionRequest::Lock {
            bid_hash: accept.hash.clone(),
        })
        .await
        .unwrap();
    h.deliver_to_seller().await;

    // On each peer: every non-root bid's parent exists and has a smaller
    // arena id, i.e. was persisted strictly before it.
    for peer in [&h.buyer, &h.seller] {
        let lock_bid = peer.store.bid_by_hash(&lock.hash).await.unwrap();
        let accept_bid = peer.store.bid_by_hash(&accept.hash).await.unwrap();
        let root_bid = peer.store.bid_by_hash(&bid.hash).await.unwrap();

        assert_eq!(lock_bid.parent_bid_id, Some(accept_bid.id));
        assert_eq!(accept_bid.parent_bid_id, Some(root_bid.id));
        assert_eq!(root_bid.parent_bid_id, None);
        assert!(accept_bid.id > root_bid.id);
        assert!(lock_bid.id > accept_bid.id);

        assert_eq!(peer.store.children_of(root_bid.id).await.len(), 1);
        assert_eq!(
            peer.store.chain_root(lock_bid.id).await.unwrap().id,
            root_bid.id
        );
    }
}
