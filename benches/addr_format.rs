use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vsock_conn::{Addr, HOST};

fn bench_file_name(c: &mut Criterion) {
    let mut group = c.benchmark_group("addr");

    group.bench_function("file_name_reserved", |b| {
        let addr = Addr::new(HOST, 5005);
        b.iter(|| black_box(black_box(addr).file_name()))
    });

    group.bench_function("file_name_vm", |b| {
        let addr = Addr::new(u32::MAX - 1, u32::MAX);
        b.iter(|| black_box(black_box(addr).file_name()))
    });

    group.finish();
}

criterion_group!(benches, bench_file_name);
criterion_main!(benches);
