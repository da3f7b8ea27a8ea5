use chrono::Utc;
use common::{CustomerId, Money, OrderNumber, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Order, OrderLine, OrderStatus, PlaceOrder, PricingPolicy, ProductSnapshot};

fn request(lines: i64) -> PlaceOrder {
    (1..=lines).fold(
        PlaceOrder::new(CustomerId::new(), "Bench Customer", "1 Bench Road"),
        |req, id| req.with_line(ProductId::new(id), 2),
    )
}

fn priced_lines(lines: i64, pricing: &PricingPolicy) -> Vec<OrderLine> {
    (1..=lines)
        .map(|id| {
            OrderLine::new(
                ProductSnapshot::new(
                    ProductId::new(id),
                    format!("SKU-{id:03}"),
                    "Bench product",
                    Money::from_cents(1_999),
                ),
                2,
                pricing,
            )
            .unwrap()
        })
        .collect()
}

fn bench_place_order(c: &mut Criterion) {
    let pricing = PricingPolicy::default();
    let req = request(10);

    c.bench_function("domain/place_order_10_lines", |b| {
        b.iter(|| {
            let now = Utc::now();
            Order::place(
                OrderNumber::generate(now),
                &req,
                priced_lines(10, &pricing),
                &pricing,
                now,
                None,
            )
            .unwrap()
        });
    });
}

fn bench_lifecycle(c: &mut Criterion) {
    let pricing = PricingPolicy::default();
    let req = request(3);

    c.bench_function("domain/full_lifecycle", |b| {
        b.iter(|| {
            let now = Utc::now();
            let mut order = Order::place(
                OrderNumber::generate(now),
                &req,
                priced_lines(3, &pricing),
                &pricing,
                now,
                None,
            )
            .unwrap();
            for status in [
                OrderStatus::Confirmed,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
            ] {
                order.transition_to(status, now).unwrap();
            }
            order
        });
    });
}

fn bench_verify_totals(c: &mut Criterion) {
    let pricing = PricingPolicy::default();
    let now = Utc::now();
    let order = Order::place(
        OrderNumber::generate(now),
        &request(50),
        priced_lines(50, &pricing),
        &pricing,
        now,
        None,
    )
    .unwrap();

    c.bench_function("domain/verify_totals_50_lines", |b| {
        b.iter(|| order.verify_totals().unwrap());
    });
}

criterion_group!(
    benches,
    bench_place_order,
    bench_lifecycle,
    bench_verify_totals
);
criterion_main!(benches);
