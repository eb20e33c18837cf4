// spec.md §8 scenario 2: a counted loop lowers to block/loop with a
// guarded br_if, and loop unrolling duplicates its body under an
// explicit optimization plan.

use neurowasm_core::codegen::optimize::apply_plan;
use neurowasm_core::codegen::wat_ir::WatInstr;
use neurowasm_core::codegen::CodeGenerator;
use neurowasm_core::lexer::Lexer;
use neurowasm_core::parser::Parser;
use neurowasm_core::predictor::OptimizationKind;
use neurowasm_core::type_analyzer::TypeAnalyzer;

const SUM: &str = r#"
function sum(n) {
    var s = 0;
    for (var i = 0; i < n; i = i + 1) {
        s = s + i;
    }
    return s;
}
"#;

fn lower(src: &str) -> neurowasm_core::codegen::wat_ir::WatModule {
    let mut lexer = Lexer::new(src.to_string());
    let mut parser = Parser::new(&mut lexer).unwrap();
    let mut program = parser.parse_program().unwrap();
    TypeAnalyzer::new().analyze(&mut program);
    CodeGenerator::new().generate_program(&program).unwrap()
}

#[test]
fn loop_lowers_to_a_block_wrapping_a_guarded_loop() {
    let module = lower(SUM);
    let f = module.function("sum").unwrap();
    let block = f.body.iter().find(|i| matches!(i, WatInstr::Block { .. })).expect("no block emitted");
    let WatInstr::Block { body, .. } = block else { unreachable!() };
    assert!(matches!(body.first(), Some(WatInstr::Loop { .. })));
    let WatInstr::Loop { body: loop_body, .. } = &body[0] else { unreachable!() };
    assert!(loop_body.iter().any(|i| matches!(i, WatInstr::BrIf(_))));
    assert!(matches!(loop_body.last(), Some(WatInstr::Br(_))));
}

#[test]
fn loop_unrolling_quadruples_the_guarded_body_at_the_default_factor() {
    let module = lower(SUM);
    let mut f = module.function("sum").unwrap().clone();
    let stats = apply_plan(&mut f, &[OptimizationKind::LoopUnrolling], 4);
    assert_eq!(stats.loops_unrolled, 1);

    let WatInstr::Block { body, .. } = &f.body.iter().find(|i| matches!(i, WatInstr::Block { .. })).unwrap() else { unreachable!() };
    let WatInstr::Loop { body: loop_body, .. } = &body[0] else { unreachable!() };
    // `s = s + i;` lowers to four instructions (two gets, an add, a tee) then
    // a drop for the expression statement: the whole guarded region repeats.
    let local_set_count = loop_body.iter().filter(|i| matches!(i, WatInstr::LocalTee(name) if name == "s")).count();
    assert_eq!(local_set_count, 4);
}
