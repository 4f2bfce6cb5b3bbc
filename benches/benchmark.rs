use contract_pipeline::{normalize, SandboxMode};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bundled_contract(functions: usize) -> String {
    let mut source = String::from("(() => {\n");
    for i in 0..functions {
        source.push_str(&format!(
            "  function helper{i}(state) {{ ContractAssert(state, 'missing'); return state; }}\n"
        ));
    }
    source.push_str("  export async function handle(state, action) { return { state }; }\n})();");
    source
}

fn bench_normalize(c: &mut Criterion) {
    let small = bundled_contract(10);
    let large = bundled_contract(2_000);

    c.bench_function("normalize shared small", |b| {
        b.iter(|| normalize(black_box(&small), SandboxMode::Shared))
    });
    c.bench_function("normalize isolated large", |b| {
        b.iter(|| normalize(black_box(&large), SandboxMode::Isolated))
    });
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
