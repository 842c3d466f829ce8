use std::collections::HashMap;

use gridfile_formulas::{
    rewrite_row_references, BasicEvaluator, CellAddress, FormulaError, FormulaEvaluator, Value,
    ValueResolver,
};

#[derive(Default)]
struct Sheet {
    cells: HashMap<CellAddress, Value>,
}

impl Sheet {
    fn set(&mut self, a1: &str, value: Value) {
        let addr = CellAddress::parse_a1(a1).expect("valid reference");
        self.cells.insert(addr, value);
    }
}

impl ValueResolver for Sheet {
    fn get_cell(&self, addr: CellAddress) -> Value {
        self.cells.get(&addr).cloned().unwrap_or_default()
    }
}

#[test]
fn test_shared_formula_rows_evaluate_independently() {
    let mut sheet = Sheet::default();
    for (row, (qty, price)) in [(2.0, 5.0), (3.0, 1.5), (10.0, 0.25)].iter().enumerate() {
        let n = row + 1;
        sheet.set(&format!("A{n}"), Value::Number(*qty));
        sheet.set(&format!("B{n}"), Value::Number(*price));
    }

    let evaluator = BasicEvaluator::new();
    let results: Vec<Value> = (1..=3)
        .map(|n| {
            let formula = rewrite_row_references("=A1*B1", n);
            evaluator.evaluate(&formula, &sheet).expect("evaluate")
        })
        .collect();

    assert_eq!(
        results,
        vec![Value::Number(10.0), Value::Number(4.5), Value::Number(2.5)]
    );
}

#[test]
fn test_text_results_display_like_a_spreadsheet() {
    let mut sheet = Sheet::default();
    sheet.set("A1", Value::Text("Widget".to_string()));
    sheet.set("B1", Value::Number(3.0));

    let value = BasicEvaluator::new()
        .evaluate("=UPPER(A1)&\" x\"&B1", &sheet)
        .expect("evaluate");
    assert_eq!(value.to_display(), "WIDGET x3");

    let flag = BasicEvaluator::new()
        .evaluate("=B1>2", &sheet)
        .expect("evaluate");
    assert_eq!(flag.to_display(), "TRUE");
}

#[test]
fn test_evaluator_failures_are_errors_not_values() {
    let sheet = Sheet::default();
    let evaluator = BasicEvaluator::new();

    assert!(matches!(
        evaluator.evaluate("=Other!A1", &sheet),
        Err(FormulaError::Unsupported(_))
    ));
    assert!(matches!(
        evaluator.evaluate("=NOPE()", &sheet),
        Err(FormulaError::UnknownFunction(name)) if name == "NOPE"
    ));
    assert!(matches!(
        evaluator.evaluate("=1+", &sheet),
        Err(FormulaError::ParseError(_))
    ));
}
