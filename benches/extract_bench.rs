use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridfile_extract::{sheet_columns, sheet_records, HeaderPolicy};
use gridfile_formulas::{BasicEvaluator, CellAddress, FormulaEvaluator, Value, ValueResolver};
use gridfile_sheet::{CellValue, Workbook};

struct Column(Vec<f64>);

impl ValueResolver for Column {
    fn get_cell(&self, addr: CellAddress) -> Value {
        match (addr.col, self.0.get(addr.row as usize)) {
            (0, Some(n)) => Value::Number(*n),
            _ => Value::Empty,
        }
    }
}

/// Header plus `rows` data rows: text, number and a formula over both.
fn book_with_rows(rows: u32) -> Workbook {
    let mut book = Workbook::new("bench.xlsx");
    let sheet = book.add_worksheet("Data").unwrap();
    for (col, header) in ["Name", "Amount", "Double"].into_iter().enumerate() {
        sheet.set_value(0, col as u32, header).unwrap();
    }
    for row in 1..=rows {
        sheet.set_value(row, 0, format!("item {row}")).unwrap();
        sheet.set_value(row, 1, f64::from(row) * 1.5).unwrap();
    }
    sheet.set_value(1, 2, CellValue::formula("B2*2")).unwrap();
    sheet.apply_shared_formula(1, rows, 2, 2).unwrap();
    book
}

fn bench_evaluate_formulas(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let evaluator = BasicEvaluator::new();
    let ctx = Column((0..1000).map(|i| f64::from(i) * 1.5).collect());

    for formula in [
        "=1+2",
        "=A1+A2",
        "=SUM(A1:A10)",
        "=SUM(A1:A1000)",
        "=IF(AND(A1>=0,A2<100),SUM(A1:A10)*1.1,MAX(A1:A10)/MIN(A2:A10))",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(formula), formula, |b, f| {
            b.iter(|| evaluator.evaluate(black_box(f), black_box(&ctx)));
        });
    }

    group.finish();
}

fn bench_shared_formula(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_formula");

    for rows in [100u32, 1000, 10000] {
        group.bench_with_input(BenchmarkId::new("propagate", rows), &rows, |b, &rows| {
            b.iter(|| book_with_rows(black_box(rows)));
        });
    }

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    let evaluator = BasicEvaluator::new();

    for rows in [100u32, 1000, 10000] {
        let book = book_with_rows(rows);
        let sheet = book.worksheet("Data").unwrap();

        group.bench_with_input(BenchmarkId::new("records_cached", rows), &rows, |b, _| {
            b.iter(|| sheet_records(&book, sheet, HeaderPolicy::Strict, None));
        });
        group.bench_with_input(BenchmarkId::new("records_evaluated", rows), &rows, |b, _| {
            b.iter(|| sheet_records(&book, sheet, HeaderPolicy::Strict, Some(&evaluator)));
        });
        group.bench_with_input(BenchmarkId::new("columns", rows), &rows, |b, _| {
            b.iter(|| sheet_columns(&book, sheet, HeaderPolicy::Positional, None));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_evaluate_formulas,
    bench_shared_formula,
    bench_extract
);
criterion_main!(benches);
