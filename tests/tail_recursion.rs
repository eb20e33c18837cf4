// spec.md §8 scenario 4: a self-call immediately followed by `return`
// rewrites to a `br` into the function's own loop head, and the assembled
// module still validates (no unbounded stack growth for large `n`).

use neurowasm_core::assembler;
use neurowasm_core::codegen::optimize::apply_plan;
use neurowasm_core::codegen::wat_ir::WatInstr;
use neurowasm_core::codegen::CodeGenerator;
use neurowasm_core::lexer::Lexer;
use neurowasm_core::parser::Parser;
use neurowasm_core::predictor::OptimizationKind;
use neurowasm_core::type_analyzer::TypeAnalyzer;

const FACT: &str = r#"
function fact(n, acc) {
    if (n <= 1) return acc;
    return fact(n - 1, n * acc);
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
fn tail_call_optimization_removes_the_self_call_and_wraps_a_loop() {
    let module = lower(FACT);
    let mut f = module.function("fact").unwrap().clone();
    let stats = apply_plan(&mut f, &[OptimizationKind::TailCallOptimization], 4);
    assert_eq!(stats.tail_calls_rewritten, 1);
    assert!(!f.body.iter().any(|i| matches!(i, WatInstr::Call(name) if name == "fact")));
    assert!(matches!(&f.body[0], WatInstr::Loop { .. }));
}

#[test]
fn the_optimized_module_still_assembles_and_validates() {
    let module = lower(FACT);
    let mut optimized = module.clone();
    let f = optimized.functions.iter_mut().find(|f| f.name == "fact").unwrap();
    apply_plan(f, &[OptimizationKind::TailCallOptimization], 4);
    let bytes = assembler::assemble(&optimized).unwrap();
    assert_eq!(&bytes[0..4], b"\0asm");
}
