//! Redelivery and resend safety: the same message applied twice leaves
//! exactly one bid row and one status transition behind.

use crate::common::harness::{TwoPartyHarness, BUYER_ADDR};
use bazaar::{ActionRequest, OrderItemStatus, OrderStatus, ProcessingStatus, TimeProvider};

#[tokio::test]
async fn duplicate_accept_delivery_is_a_noop() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("modular case", 60_000).await;

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
    h.seller
        .service
        .submit(ActionRequest::Accept {
            bid_hash: bid.hash.clone(),
        })
        .await
        .unwrap();

    let deliveries = h
        .seller
        .transport
        .drain_deliveries_for(BUYER_ADDR, h.clock.now_millis())
        .await;
    assert_eq!(deliveries.len(), 1);
    let delivery = deliveries.into_iter().next().unwrap();

    // The transport redelivers the same message.
    let first = h.buyer.dispatcher.dispatch(delivery.clone()).await;
    let second = h.buyer.dispatcher.dispatch(delivery).await;
    assert_eq!(first, ProcessingStatus::Processed);
    assert_eq!(second, ProcessingStatus::Processed);

    // Exactly one ACCEPT row under the root, status advanced exactly once.
    let root = h.buyer.store.bid_by_hash(&bid.hash).await.unwrap();
    assert_eq!(h.buyer.store.children_of(root.id).await.len(), 1);
    assert_eq!(h.buyer.store.bid_count().await, 2);
    assert_eq!(
        h.buyer.statuses(&bid.hash).await,
        (OrderItemStatus::AwaitingEscrow, OrderStatus::Processing)
    );
}

#[tokio::test]
async fn operator_resend_under_fresh_transport_id_is_a_noop() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("mixing desk", 300_000).await;

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
    h.seller
        .service
        .submit(ActionRequest::Accept {
            bid_hash: bid.hash.clone(),
        })
        .await
        .unwrap();

    let deliveries = h
        .seller
        .transport
        .drain_deliveries_for(BUYER_ADDR, h.clock.now_millis())
        .await;
    let original = deliveries.into_iter().next().unwrap();

    // An operator-triggered resend carries the same payload under a fresh
    // transport message id.
    let mut resend = original.clone();
    resend.msgid = "resend-1".to_string();

    assert_eq!(
        h.buyer.dispatcher.dispatch(original).await,
        ProcessingStatus::Processed
    );
    assert_eq!(
        h.buyer.dispatcher.dispatch(resend).await,
        ProcessingStatus::Processed
    );

    let root = h.buyer.store.bid_by_hash(&bid.hash).await.unwrap();
    assert_eq!(h.buyer.store.children_of(root.id).await.len(), 1);
    assert_eq!(
        h.buyer.statuses(&bid.hash).await,
        (OrderItemStatus::AwaitingEscrow, OrderStatus::Processing)
    );
}

#[tokio::test]
async fn statuses_never_revisit_earlier_values() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("sampler", 80_000).await;

    let bid = h
        .buyer
        .service
        .submit(ActionRequest::Bid {
            listing_item_hash: listing.hash.clone(),
            shipping_address: "12 Example Row".to_string(),
        })
        .await
        .unwrap();
    let deliveries_to_seller = h.deliver_to_seller().await;
    assert_eq!(deliveries_to_seller, vec![ProcessingStatus::Processed]);

    h.clock.advance(1_000);
    let accept = h
        .seller
        .service
        .submit(ActionRequest::Accept {
            bid_hash: bid.hash.clone(),
        })
        .await
        .unwrap();

    let deliveries = h
        .seller
        .transport
        .drain_deliveries_for(BUYER_ADDR, h.clock.now_millis())
        .await;
    let accept_delivery = deliveries.into_iter().next().unwrap();
    h.buyer.dispatcher.dispatch(accept_delivery.clone()).await;

    let mut ranks = vec![h.buyer.statuses(&bid.hash).await.0.rank()];

    // Replaying earlier chain messages must never move status backwards.
    h.clock.advance(1_000);
    h.buyer
        .service
        .submit(ActionRequest::Lock {
            bid_hash: accept.hash.clone(),
        })
        .await
        .unwrap();
    ranks.push(h.buyer.statuses(&bid.hash).await.0.rank());

    let mut replay = accept_delivery;
    replay.msgid = "late-replay".to_string();
    h.buyer.dispatcher.dispatch(replay).await;
    ranks.push(h.buyer.statuses(&bid.hash).await.0.rank());

    assert!(
        ranks.windows(2).all(|w| w[0] <= w[1]),
        "status rank regressed: {ranks:?}"
    );
    assert_eq!(
        h.buyer.statuses(&bid.hash).await,
        (OrderItemStatus::EscrowLocked, OrderStatus::Processing)
    );
}
