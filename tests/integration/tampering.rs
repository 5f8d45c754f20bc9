//! Tampered messages are rejected permanently, never parked.

use crate::common::harness::{TwoPartyHarness, BUYER_ADDR};
use bazaar::{
    ActionRequest, OrderItemStatus, OrderStatus, ProcessingStatus, ProtocolEnvelope, TimeProvider,
};

#[tokio::test]
async fn tampered_accept_is_rejected_permanently() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("preamp", 70_000).await;

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

    let deliveries = h
        .seller
        .transport
        .drain_deliveries_for(BUYER_ADDR, h.clock.now_millis())
        .await;
    let mut delivery = deliveries.into_iter().next().unwrap();

    // A middlebox rewrites the timestamp but cannot recompute the hash.
    let mut envelope = ProtocolEnvelope::from_bytes(&delivery.payload).unwrap();
    envelope.action.generated += 1;
    delivery.payload = envelope.to_bytes().unwrap();

    let status = h.buyer.dispatcher.dispatch(delivery).await;
    assert_eq!(status, ProcessingStatus::ProcessingFailed);

    // Not parked, not persisted, not notified, status untouched.
    assert!(h.buyer.dispatcher.waiting().is_empty().await);
    assert!(h.buyer.store.bid_by_hash(&accept.hash).await.is_none());
    assert!(h.buyer.notifier.events().await.is_empty());
    assert_eq!(
        h.buyer.statuses(&bid.hash).await,
        (OrderItemStatus::Bidded, OrderStatus::Sent)
    );
}

#[tokio::test]
async fn tampered_bid_objects_are_rejected() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("compressor", 95_000).await;

    h.buyer
        .service
        .submit(ActionRequest::Bid {
            listing_item_hash: listing.hash.clone(),
            shipping_address: "12 Example Row".to_string(),
        })
        .await
        .unwrap();

    let deliveries = h
        .buyer
        .transport
        .drain_deliveries_for(crate::common::harness::SELLER_ADDR, h.clock.now_millis())
        .await;
    let mut delivery = deliveries.into_iter().next().unwrap();

    // Redirect the shipment after sealing: the BID hash commits to the
    // shipping address, so this must surface as tampering.
    let mut envelope = ProtocolEnvelope::from_bytes(&delivery.payload).unwrap();
    envelope
        .action
        .set_object("shippingAddress", "666 Hijack Lane");
    delivery.payload = envelope.to_bytes().unwrap();

    let status = h.seller.dispatcher.dispatch(delivery).await;
    assert_eq!(status, ProcessingStatus::ProcessingFailed);
    assert_eq!(h.seller.store.bid_count().await, 0);
    assert!(h.seller.dispatcher.waiting().is_empty().await);
}

#[tokio::test]
async fn garbled_envelope_is_rejected_without_side_effects() {
    let h = TwoPartyHarness::new();
    h.seed_listing("headphones", 20_000).await;

    let delivery = bazaar::InboundDelivery {
        msgid: "garbage-1".to_string(),
        from: BUYER_ADDR.to_string(),
        to: crate::common::harness::SELLER_ADDR.to_string(),
        payload: vec![0xde, 0xad, 0xbe, 0xef],
        received_at: h.clock.now_millis(),
    };

    let status = h.seller.dispatcher.dispatch(delivery).await;
    assert_eq!(status, ProcessingStatus::ProcessingFailed);
    assert_eq!(h.seller.store.bid_count().await, 0);
}
