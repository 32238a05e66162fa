//! Benchmarks for the fixed-point propagation and the dependence classifier

use analysis::analysis::{analyze_function, analyze_loops, AnalysisConfig};
use analysis::ir::{BinaryOp, IrBuilder, IrFunction, IrId, IrType};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// A chain of `depth` nested self-loops; every block assigns a few sums over
/// a shared pool of scalars and kills one of them.
fn generate_nested_loops(depth: usize) -> IrFunction {
    let mut builder = IrBuilder::new("bench".to_string(), "bench.ir".to_string());
    let fid = builder.start_function("nested".to_string());
    let vars: Vec<IrId> = (0..8)
        .map(|i| builder.build_alloc(&format!("v{}", i), IrType::I32).unwrap())
        .collect();

    let headers: Vec<_> = (0..depth).map(|_| builder.create_block().unwrap()).collect();
    let exit = builder.create_block().unwrap();
    builder.build_branch(headers[0]).unwrap();

    for (level, &header) in headers.iter().enumerate() {
        builder.switch_to_block(header);
        for k in 0..4 {
            let l = builder.build_load(vars[(level + k) % 8], IrType::I32).unwrap();
            let r = builder.build_load(vars[(level + k + 3) % 8], IrType::I32).unwrap();
            let sum = builder.build_binop(BinaryOp::Add, l, r).unwrap();
            builder.build_store(vars[(level + k + 5) % 8], sum).unwrap();
        }
        let next = headers.get(level + 1).copied().unwrap_or(exit);
        let cond = builder.build_bool(true).unwrap();
        builder.build_cond_branch(cond, header, next).unwrap();
    }

    builder.switch_to_block(exit);
    builder.build_return(None).unwrap();
    builder.into_function(fid).unwrap()
}

/// One loop whose body writes and reads `stores` array elements.
fn generate_array_loop(stores: usize) -> IrFunction {
    let mut builder = IrBuilder::new("bench".to_string(), "bench.ir".to_string());
    let fid = builder.start_function("arrays".to_string());
    let a = builder
        .build_alloc("a", IrType::Array(Box::new(IrType::I32), 1024))
        .unwrap();
    let body = builder.create_block().unwrap();
    let exit = builder.create_block().unwrap();
    builder.build_branch(body).unwrap();

    builder.switch_to_block(body);
    for n in 0..stores as i64 {
        let src_idx = builder.build_int(n + 1, IrType::I64).unwrap();
        let src = builder.build_element_ptr(a, src_idx).unwrap();
        let v = builder.build_load(src, IrType::I32).unwrap();
        let dst_idx = builder.build_int(n, IrType::I64).unwrap();
        let dst = builder.build_element_ptr(a, dst_idx).unwrap();
        builder.build_store(dst, v).unwrap();
    }
    let cond = builder.build_bool(true).unwrap();
    builder.build_cond_branch(cond, body, exit).unwrap();

    builder.switch_to_block(exit);
    builder.build_return(None).unwrap();
    builder.into_function(fid).unwrap()
}

fn benchmark_available_expressions(c: &mut Criterion) {
    let mut group = c.benchmark_group("available_expressions");
    let config = AnalysisConfig::default();

    for depth in [4, 16, 64].iter() {
        let function = generate_nested_loops(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &function, |b, function| {
            b.iter(|| black_box(analyze_function(black_box(function), &config)));
        });
    }

    group.finish();
}

fn benchmark_dependences(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependences");
    let config = AnalysisConfig::default();

    for stores in [16, 64, 256].iter() {
        let function = generate_array_loop(*stores);
        group.bench_with_input(BenchmarkId::from_parameter(stores), &function, |b, function| {
            b.iter(|| black_box(analyze_loops(black_box(function), &config)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_available_expressions, benchmark_dependences);
criterion_main!(benches);
