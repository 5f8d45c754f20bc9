//! Two-party test harness: a buyer and a seller engine wired to mock
//! collaborators, with manual message pumping between them.

use std::sync::{Arc, Once};

use bazaar::mocks::{MockClock, MockEscrow, MockNotifier, MockTransport, MockWallet};
use bazaar::{
    Currency, EngineConfig, EscrowType, InboundDispatcher, ListingItem, MarketStore,
    OrderItemStatus, OrderStatus, ProcessingStatus, TimeProvider, TradeService,
};

static INIT_TRACING: Once = Once::new();

/// Route engine logs through `RUST_LOG` when debugging a failing scenario.
fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const BUYER_ADDR: &str = "buyer-addr";
pub const SELLER_ADDR: &str = "seller-addr";

pub type TestService =
    TradeService<MockTransport, MockEscrow, MockWallet, MockNotifier, MockClock>;
pub type TestDispatcher =
    InboundDispatcher<MockTransport, MockEscrow, MockWallet, MockNotifier, MockClock>;

/// One peer: an engine plus handles to its mock collaborators.
#[allow(dead_code)]
pub struct Peer {
    pub address: String,
    pub service: Arc<TestService>,
    pub dispatcher: TestDispatcher,
    pub transport: MockTransport,
    pub escrow: MockEscrow,
    pub wallet: MockWallet,
    pub notifier: MockNotifier,
    pub store: MarketStore,
}

impl Peer {
    fn new(address: &str, clock: MockClock) -> Self {
        let store = MarketStore::new();
        let transport = MockTransport::new(address);
        let escrow = MockEscrow::new();
        let wallet = MockWallet::new();
        let notifier = MockNotifier::new();

        let service = Arc::new(TradeService::new(
            address,
            store.clone(),
            transport.clone(),
            escrow.clone(),
            wallet.clone(),
            notifier.clone(),
            clock.clone(),
            EngineConfig::default(),
        ));
        let dispatcher = InboundDispatcher::new(service.clone(), clock);

        Self {
            address: address.to_string(),
            service,
            dispatcher,
            transport,
            escrow,
            wallet,
            notifier,
            store,
        }
    }

    /// Current item/order statuses for the chain rooted at `root_hash`.
    pub async fn statuses(&self, root_hash: &str) -> (OrderItemStatus, OrderStatus) {
        let root = self
            .store
            .bid_by_hash(root_hash)
            .await
            .expect("root bid should exist");
        let order = self
            .store
            .order_for_root_bid(root.id)
            .await
            .expect("order should exist");
        let item = order.items.first().expect("order should have an item");
        (item.status, order.status)
    }
}

/// Buyer + seller sharing one mock clock.
pub struct TwoPartyHarness {
    pub buyer: Peer,
    pub seller: Peer,
    pub clock: MockClock,
}

impl TwoPartyHarness {
    pub fn new() -> Self {
        init_tracing();
        let clock = MockClock::new(1_700_000_000_000);
        Self {
            buyer: Peer::new(BUYER_ADDR, clock.clone()),
            seller: Peer::new(SELLER_ADDR, clock.clone()),
            clock,
        }
    }

    /// Publish a listing into both peers' catalogs, as the external catalog
    /// sync would.
    pub async fn seed_listing(&self, title: &str, price: u64) -> ListingItem {
        let listing = ListingItem::new(
            SELLER_ADDR,
            "open-market",
            title,
            price,
            EscrowType::Mad,
            Currency::Btc,
            &self.clock,
        )
        .expect("listing should build");
        self.buyer.store.put_listing(listing.clone()).await;
        self.seller.store.put_listing(listing.clone()).await;
        listing
    }

    /// Move everything the buyer has sent into the seller's dispatcher.
    pub async fn deliver_to_seller(&self) -> Vec<ProcessingStatus> {
        let deliveries = self
            .buyer
            .transport
            .drain_deliveries_for(SELLER_ADDR, self.clock_now())
            .await;
        let mut statuses = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            statuses.push(self.seller.dispatcher.dispatch(delivery).await);
        }
        statuses
    }

    /// Move everything the seller has sent into the buyer's dispatcher.
    pub async fn deliver_to_buyer(&self) -> Vec<ProcessingStatus> {
        let deliveries = self
            .seller
            .transport
            .drain_deliveries_for(BUYER_ADDR, self.clock_now())
            .await;
        let mut statuses = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            statuses.push(self.buyer.dispatcher.dispatch(delivery).await);
        }
        statuses
    }

    fn clock_now(&self) -> u64 {
        self.clock.now_millis()
    }
}
