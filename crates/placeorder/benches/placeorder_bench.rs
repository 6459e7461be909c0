use std::sync::Arc;
use std::time::Duration;

use cart::{Cart, CartItem, Money, PaymentSelection};
use context_store::InMemoryContextStore;
use criterion::{Criterion, criterion_group, criterion_main};
use lock::InMemoryLocker;
use placeorder::{
    Context, Coordinator, InMemoryCartService, InMemoryOrderService, InMemoryPaymentGateway,
    PaymentGateways, PlaceOrderConfig, ProcessFactory, Services, StateCatalog,
};

fn coordinator() -> Coordinator<InMemoryContextStore<Context>, InMemoryLocker> {
    let services = Services::new(
        Arc::new(InMemoryCartService::new()),
        PaymentGateways::new().with_gateway(
            "offline",
            Arc::new(InMemoryPaymentGateway::new("offline")),
        ),
        Arc::new(InMemoryOrderService::new()),
    );
    Coordinator::new(
        InMemoryContextStore::new(),
        InMemoryLocker::new(),
        ProcessFactory::new(StateCatalog::new(services)),
        PlaceOrderConfig::default(),
    )
}

fn cart(method: &str) -> Cart {
    Cart::new("cart-1")
        .with_item(CartItem::new("SKU-001", "Widget", 3, Money::from_cents(1999)))
        .with_payment(PaymentSelection::new(
            "offline",
            method,
            Money::from_cents(5997),
        ))
}

fn bench_place_order_to_success(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = coordinator();

    c.bench_function("placeorder/start_to_success", |b| {
        b.iter(|| {
            rt.block_on(async {
                coordinator
                    .start("cart-1", cart("completed"), "/return")
                    .await
                    .unwrap();
                coordinator
                    .run_blocking("cart-1", Duration::from_secs(5))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_single_step(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = coordinator();

    c.bench_function("placeorder/run_single_step", |b| {
        b.iter(|| {
            rt.block_on(async {
                coordinator
                    .start("cart-1", cart("completed"), "/return")
                    .await
                    .unwrap();
                coordinator.run("cart-1").await.unwrap();
            });
        });
    });
}

fn bench_start_and_cancel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = coordinator();

    c.bench_function("placeorder/redirect_then_cancel", |b| {
        b.iter(|| {
            rt.block_on(async {
                coordinator
                    .start("cart-1", cart("redirect"), "/return")
                    .await
                    .unwrap();
                coordinator
                    .run_blocking("cart-1", Duration::from_secs(5))
                    .await
                    .unwrap();
                coordinator.cancel("cart-1").await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_place_order_to_success,
    bench_single_step,
    bench_start_and_cancel
);
criterion_main!(benches);
