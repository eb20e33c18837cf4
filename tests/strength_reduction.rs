// spec.md §8 scenario 3: `x * 2` becomes a shift once StrengthReduction is
// selected, leaving the unoptimized multiply for functions that don't pick it.

use neurowasm_core::codegen::optimize::apply_plan;
use neurowasm_core::codegen::wat_ir::{ConstValue, WatInstr};
use neurowasm_core::codegen::CodeGenerator;
use neurowasm_core::lexer::Lexer;
use neurowasm_core::parser::Parser;
use neurowasm_core::predictor::OptimizationKind;
use neurowasm_core::type_analyzer::TypeAnalyzer;

fn lower(src: &str) -> neurowasm_core::codegen::wat_ir::WatModule {
    let mut lexer = Lexer::new(src.to_string());
    let mut parser = Parser::new(&mut lexer).unwrap();
    let mut program = parser.parse_program().unwrap();
    TypeAnalyzer::new().analyze(&mut program);
    CodeGenerator::new().generate_program(&program).unwrap()
}

#[test]
fn without_the_transform_the_multiply_survives() {
    let module = lower("function dbl(x) { return x * 2; }");
    let f = module.function("dbl").unwrap();
    assert!(f.body.contains(&WatInstr::Op("i32.mul")));
}

#[test]
fn with_strength_reduction_selected_the_multiply_becomes_a_shift() {
    let module = lower("function dbl(x) { return x * 2; }");
    let mut f = module.function("dbl").unwrap().clone();
    apply_plan(&mut f, &[OptimizationKind::StrengthReduction], 4);
    assert_eq!(
        f.body,
        vec![
            WatInstr::LocalGet("x".to_string()),
            WatInstr::Const(ConstValue::I32(1)),
            WatInstr::Op("i32.shl"),
            WatInstr::Return,
        ]
    );
}
