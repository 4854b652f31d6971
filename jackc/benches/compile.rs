use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SOURCE: &str = include_str!("../tests/scoreboard.jack");

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("compile scoreboard", |b| {
        b.iter(|| {
            let out = jackc::compile_to_vm(black_box(SOURCE), Vec::new()).unwrap();
            black_box(out)
        })
    });

    c.bench_function("tree scoreboard", |b| {
        b.iter(|| {
            let out = jackc::compile_to_tree(black_box(SOURCE), Vec::new()).unwrap();
            black_box(out)
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
