//! Cancellation and rejection: absorbing outcomes plus the compensating
//! wallet release.

use crate::common::harness::TwoPartyHarness;
use bazaar::{ActionRequest, OrderItemStatus, OrderStatus, ProcessingStatus};

#[tokio::test]
async fn cancel_before_accept_releases_reserved_outputs() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("spring reverb", 45_000).await;

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
    h.buyer
        .service
        .submit(ActionRequest::Cancel {
            bid_hash: bid.hash.clone(),
        })
        .await
        .unwrap();
    assert_eq!(
        h.deliver_to_seller().await,
        vec![ProcessingStatus::Processed]
    );

    for peer in [&h.buyer, &h.seller] {
        assert_eq!(
            peer.statuses(&bid.hash).await,
            (OrderItemStatus::BidCancelled, OrderStatus::Canceled)
        );
    }

    // The reservation for the chain is given back, on both engines, in the
    // same operation as the transition.
    assert_eq!(
        h.buyer.wallet.released_outputs().await,
        vec![bid.hash.clone()]
    );
    assert_eq!(
        h.seller.wallet.released_outputs().await,
        vec![bid.hash.clone()]
    );
}

#[tokio::test]
async fn reject_carries_its_reason_down_the_chain() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("patch cables", 5_000).await;

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
    let reject = h
        .seller
        .service
        .submit(ActionRequest::Reject {
            bid_hash: bid.hash.clone(),
            reason: Some("sold elsewhere".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(h.deliver_to_buyer().await, vec![ProcessingStatus::Processed]);

    for peer in [&h.buyer, &h.seller] {
        assert_eq!(
            peer.statuses(&bid.hash).await,
            (OrderItemStatus::BidRejected, OrderStatus::Rejected)
        );
    }

    let buyer_reject = h.buyer.store.bid_by_hash(&reject.hash).await.unwrap();
    assert_eq!(
        buyer_reject.data.get("reason").map(String::as_str),
        Some("sold elsewhere")
    );
}

#[tokio::test]
async fn cancel_after_accept_is_an_already_applied_noop() {
    let h = TwoPartyHarness::new();
    let listing = h.seed_listing("oscilloscope", 150_000).await;

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
    h.deliver_to_buyer().await;

    // A CANCEL racing the ACCEPT: its precondition (Bidded) no longer
    // holds, so the bid row is recorded but no status moves and nothing is
    // released.
    h.clock.advance(1_000);
    h.buyer
        .service
        .submit(ActionRequest::Cancel {
            bid_hash: bid.hash.clone(),
        })
        .await
        .unwrap();
    assert_eq!(
        h.deliver_to_seller().await,
        vec![ProcessingStatus::Processed]
    );

    for peer in [&h.buyer, &h.seller] {
        assert_eq!(
            peer.statuses(&bid.hash).await,
            (OrderItemStatus::AwaitingEscrow, OrderStatus::Processing)
        );
        assert!(peer.wallet.released_outputs().await.is_empty());
    }
}
