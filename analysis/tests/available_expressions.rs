use analysis::analysis::expression::{Expression, Operand};
use analysis::analysis::{analyze_function, gen_kill, AnalysisConfig, VisitState};
use analysis::ir::{BinaryOp, IrBuilder, IrFunction, IrId, IrType};

fn store_binop(builder: &mut IrBuilder, target: IrId, op: BinaryOp, l: IrId, r: IrId) {
    let lv = builder.build_load(l, IrType::I32).unwrap();
    let rv = builder.build_load(r, IrType::I32).unwrap();
    let v = builder.build_binop(op, lv, rv).unwrap();
    builder.build_store(target, v).unwrap();
}

fn expr(l: IrId, op: BinaryOp, r: IrId) -> Expression {
    Expression::new(Operand::Value(l), Operand::Value(r), op)
}

/// Every reached assignment satisfies OUT = GEN ∪ (IN − KILL).
fn assert_fixed_point(function: &IrFunction) {
    let report = analyze_function(function, &AnalysisConfig::default()).unwrap();
    for facts in &report.assignments {
        let out = gen_kill::transfer(&facts.gen_set, &facts.in_set, &facts.kill_set);
        assert_eq!(out, facts.out_set, "transfer does not hold at {}", facts.at());
        assert_eq!(facts.kill_set, gen_kill::kill_set(&facts.in_set, facts.target()));
    }
}

#[test]
fn test_diamond_meets_at_join() {
    // entry: x = a + b
    // then:  y = a * b       else: a = 2
    // join:  z = a + b
    let mut builder = IrBuilder::new("diamond".to_string(), "diamond.ir".to_string());
    let fid = builder.start_function("f".to_string());
    let a = builder.build_alloc("a", IrType::I32).unwrap();
    let b = builder.build_alloc("b", IrType::I32).unwrap();
    let x = builder.build_alloc("x", IrType::I32).unwrap();
    let y = builder.build_alloc("y", IrType::I32).unwrap();
    let z = builder.build_alloc("z", IrType::I32).unwrap();
    store_binop(&mut builder, x, BinaryOp::Add, a, b);
    let then_bb = builder.create_block_with_label("then").unwrap();
    let else_bb = builder.create_block_with_label("else").unwrap();
    let join = builder.create_block_with_label("join").unwrap();
    let cond = builder.build_bool(true).unwrap();
    builder.build_cond_branch(cond, then_bb, else_bb).unwrap();

    builder.switch_to_block(then_bb);
    store_binop(&mut builder, y, BinaryOp::Mul, a, b);
    builder.build_branch(join).unwrap();

    builder.switch_to_block(else_bb);
    builder.build_store_int(a, 2).unwrap();
    builder.build_branch(join).unwrap();

    builder.switch_to_block(join);
    store_binop(&mut builder, z, BinaryOp::Add, b, a);
    builder.build_return(None).unwrap();
    let func = builder.into_function(fid).unwrap();

    let report = analyze_function(&func, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.assignments.len(), 4);

    let at_z = report
        .assignments
        .iter()
        .find(|f| f.target() == z)
        .unwrap();
    // a + b is killed on the else path and a * b never exists there
    assert!(at_z.in_set.is_empty());
    assert_eq!(at_z.out_set.len(), 1);
    assert!(at_z.out_set.contains(&expr(a, BinaryOp::Add, b)));
    assert_eq!(at_z.visits, 2);

    let at_y = report.assignments.iter().find(|f| f.target() == y).unwrap();
    assert!(at_y.in_set.contains(&expr(a, BinaryOp::Add, b)));
    assert!(at_y.out_set.contains(&expr(b, BinaryOp::Mul, a)));

    assert_fixed_point(&func);
}

#[test]
fn test_loop_back_edge_intersects() {
    // entry: -> body: x = a + b; a = 1 -> body | exit
    let mut builder = IrBuilder::new("loop".to_string(), "loop.ir".to_string());
    let fid = builder.start_function("f".to_string());
    let a = builder.build_alloc("a", IrType::I32).unwrap();
    let b = builder.build_alloc("b", IrType::I32).unwrap();
    let x = builder.build_alloc("x", IrType::I32).unwrap();
    let body = builder.create_block().unwrap();
    let exit = builder.create_block().unwrap();
    builder.build_branch(body).unwrap();

    builder.switch_to_block(body);
    store_binop(&mut builder, x, BinaryOp::Add, a, b);
    builder.build_store_int(a, 1).unwrap();
    let cond = builder.build_bool(true).unwrap();
    builder.build_cond_branch(cond, body, exit).unwrap();

    builder.switch_to_block(exit);
    builder.build_return(None).unwrap();
    let func = builder.into_function(fid).unwrap();

    let report = analyze_function(&func, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.assignments.len(), 2);

    let at_x = &report.assignments[0];
    assert_eq!(at_x.visits, 2);
    assert_eq!(at_x.state, VisitState::Stable);
    assert!(at_x.in_set.is_empty());
    assert!(at_x.out_set.contains(&expr(a, BinaryOp::Add, b)));

    let at_a = &report.assignments[1];
    assert_eq!(at_a.kill_set.len(), 1);
    assert!(at_a.out_set.is_empty());

    assert_fixed_point(&func);
}

#[test]
fn test_nested_loops_terminate() {
    // entry -> outer: s = s + i -> inner: t = s * i -> inner | latch
    // latch: i = i + 1 -> outer | exit
    let mut builder = IrBuilder::new("nested".to_string(), "nested.ir".to_string());
    let fid = builder.start_function("f".to_string());
    let s = builder.build_alloc("s", IrType::I32).unwrap();
    let i = builder.build_alloc("i", IrType::I32).unwrap();
    let t = builder.build_alloc("t", IrType::I32).unwrap();
    let outer = builder.create_block().unwrap();
    let inner = builder.create_block().unwrap();
    let latch = builder.create_block().unwrap();
    let exit = builder.create_block().unwrap();
    builder.build_branch(outer).unwrap();

    builder.switch_to_block(outer);
    store_binop(&mut builder, s, BinaryOp::Add, s, i);
    builder.build_branch(inner).unwrap();

    builder.switch_to_block(inner);
    store_binop(&mut builder, t, BinaryOp::Mul, s, i);
    let c1 = builder.build_bool(true).unwrap();
    builder.build_cond_branch(c1, inner, latch).unwrap();

    builder.switch_to_block(latch);
    let li = builder.build_load(i, IrType::I32).unwrap();
    let one = builder.build_int(1, IrType::I32).unwrap();
    let next = builder.build_binop(BinaryOp::Add, li, one).unwrap();
    builder.build_store(i, next).unwrap();
    let c2 = builder.build_bool(true).unwrap();
    builder.build_cond_branch(c2, outer, exit).unwrap();

    builder.switch_to_block(exit);
    builder.build_return(None).unwrap();
    let func = builder.into_function(fid).unwrap();

    let report = analyze_function(&func, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.assignments.len(), 3);
    // self-referential assignments generate nothing
    assert!(report.assignments[0].gen_set.is_empty());
    assert!(report.assignments[2].gen_set.is_empty());
    assert!(report.assignments.iter().all(|f| f.is_reached()));

    assert_fixed_point(&func);
}

#[test]
fn test_canonical_forms_share_an_entry() {
    // x = a + 4; y = 4 + a
    let mut builder = IrBuilder::new("canon".to_string(), "canon.ir".to_string());
    let fid = builder.start_function("f".to_string());
    let a = builder.build_alloc("a", IrType::I32).unwrap();
    let x = builder.build_alloc("x", IrType::I32).unwrap();
    let y = builder.build_alloc("y", IrType::I32).unwrap();
    let la = builder.build_load(a, IrType::I32).unwrap();
    let four = builder.build_int(4, IrType::I32).unwrap();
    let s1 = builder.build_binop(BinaryOp::Add, la, four).unwrap();
    builder.build_store(x, s1).unwrap();
    let four_again = builder.build_int(4, IrType::I32).unwrap();
    let la2 = builder.build_load(a, IrType::I32).unwrap();
    let s2 = builder.build_binop(BinaryOp::Add, four_again, la2).unwrap();
    builder.build_store(y, s2).unwrap();
    builder.build_return(None).unwrap();
    let func = builder.into_function(fid).unwrap();

    let report = analyze_function(&func, &AnalysisConfig::default()).unwrap();
    let second = &report.assignments[1];
    assert_eq!(second.in_set, second.gen_set);
    assert_eq!(second.out_set.len(), 1);
}

#[test]
fn test_in_sets_shrink_on_revisit() {
    // entry: x = a + b; y = a * b
    // loop:  z = x - y; a = 1; -> loop | exit
    let mut builder = IrBuilder::new("shrink".to_string(), "shrink.ir".to_string());
    let fid = builder.start_function("f".to_string());
    let a = builder.build_alloc("a", IrType::I32).unwrap();
    let b = builder.build_alloc("b", IrType::I32).unwrap();
    let x = builder.build_alloc("x", IrType::I32).unwrap();
    let y = builder.build_alloc("y", IrType::I32).unwrap();
    let z = builder.build_alloc("z", IrType::I32).unwrap();
    store_binop(&mut builder, x, BinaryOp::Add, a, b);
    store_binop(&mut builder, y, BinaryOp::Mul, a, b);
    let body = builder.create_block_with_label("loop").unwrap();
    let exit = builder.create_block_with_label("exit").unwrap();
    builder.build_branch(body).unwrap();

    builder.switch_to_block(body);
    store_binop(&mut builder, z, BinaryOp::Sub, x, y);
    builder.build_store_int(a, 1).unwrap();
    let cond = builder.build_bool(true).unwrap();
    builder.build_cond_branch(cond, body, exit).unwrap();

    builder.switch_to_block(exit);
    builder.build_return(None).unwrap();
    let func = builder.into_function(fid).unwrap();

    let report = analyze_function(&func, &AnalysisConfig::default()).unwrap();
    let sizes = |target: IrId| {
        report
            .assignments
            .iter()
            .find(|f| f.target() == target)
            .map(|f| f.in_sizes.clone())
            .unwrap()
    };

    // a + b and a * b die at `a = 1` and are gone once the back edge is taken
    assert_eq!(sizes(z), vec![2, 0]);
    assert_eq!(sizes(a), vec![3, 1]);
    assert_eq!(sizes(x), vec![0]);
    assert_eq!(sizes(y), vec![1]);

    for facts in &report.assignments {
        assert_eq!(facts.in_sizes.len(), facts.visits as usize);
        assert!(
            facts.in_sizes.windows(2).all(|w| w[1] <= w[0]),
            "|IN| grew at {}: {:?}",
            facts.at(),
            facts.in_sizes
        );
    }
    assert_fixed_point(&func);
}
