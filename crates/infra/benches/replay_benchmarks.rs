use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use rust_decimal::Decimal;

use bank_account::{Account, Amount, Balance};
use bank_infra::{AccountRepository, InMemoryEventStore};

/// Live account with `len` commands recorded on top of its creation.
fn busy_account(len: usize) -> Account {
    let mut account = Account::with(Balance::of(Decimal::new(1_000, 0)));
    for i in 0..len {
        let amount = Amount::of(Decimal::new(i as i64 % 500 + 1, 2));
        let result = if i % 3 == 0 {
            account.withdraw(amount)
        } else {
            account.deposit(amount)
        };
        result.unwrap();
    }
    account
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("account_rebuild");
    for len in [10usize, 100, 1_000, 10_000] {
        let events = busy_account(len).uncommitted_changes().to_vec();
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &events, |b, events| {
            b.iter(|| Account::rebuild(black_box(events.clone())).unwrap())
        });
    }
    group.finish();
}

fn bench_repository_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("repository_load");
    for len in [10usize, 100, 1_000] {
        let repo = AccountRepository::new(InMemoryEventStore::new());
        let account = busy_account(len);
        repo.save(&account).unwrap();
        let id = account.account_id();

        group.throughput(Throughput::Elements(len as u64 + 1));
        group.bench_function(BenchmarkId::from_parameter(len), |b| {
            b.iter(|| repo.load(black_box(id)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_repository_load);
criterion_main!(benches);
