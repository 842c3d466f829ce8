use gridfile_formulas::BasicEvaluator;
use gridfile_sheet::{
    copy_cell, copy_style, BorderSide, BorderStyle, Borders, CellRef, CellValue, Color,
    FillPattern, Font, Row, SheetError, Style, Workbook,
};
use tempfile::tempdir;

// ===== Row cache =====

#[test]
fn test_get_row_returns_same_row_every_time() {
    let mut book = Workbook::new("bucket/book.xlsx");
    let sheet = book.add_worksheet("Data").unwrap();

    let first: *const Row = sheet.get_row(5).unwrap();
    sheet.get_row(6).unwrap().set_value(0, "later");
    let second: *const Row = sheet.get_row(5).unwrap();

    assert!(std::ptr::eq(first, second));
    assert!(sheet.check_row(4).is_none());
    assert_eq!(sheet.rows().map(Row::index).collect::<Vec<_>>(), vec![5, 6]);
}

// ===== Shared formulas =====

#[test]
fn test_shared_formula_rows_one_two_three() {
    let mut book = Workbook::new("k");
    let sheet = book.add_worksheet("Calc").unwrap();
    sheet.set_value(0, 0, CellValue::formula("=A1")).unwrap();

    sheet.apply_shared_formula(0, 3, 0, 0).unwrap();

    let sources: Vec<String> = (0..3)
        .map(|row| sheet.value(row, 0).formula_source().unwrap().to_string())
        .collect();
    assert_eq!(sources, vec!["A1", "A2", "A3"]);
}

#[test]
fn test_shared_formula_then_recalculate() {
    let mut book = Workbook::new("k");
    let sheet = book.add_worksheet("Calc").unwrap();
    for (row, qty) in [3.0, 4.0, 5.0].into_iter().enumerate() {
        sheet.set_value(row as u32, 0, qty).unwrap();
        sheet.set_value(row as u32, 1, 2.0).unwrap();
    }
    sheet.set_value(0, 2, CellValue::formula("A1*B1")).unwrap();
    sheet.apply_shared_formula(0, 3, 2, 2).unwrap();

    let report = book.calculate_formulas(&BasicEvaluator::new());
    assert_eq!(report.evaluated, 3);

    let sheet = book.worksheet("Calc").unwrap();
    let totals: Vec<Option<f64>> = (0..3).map(|row| sheet.value(row, 2).as_double()).collect();
    assert_eq!(totals, vec![Some(6.0), Some(8.0), Some(10.0)]);
}

// ===== Style cloning =====

#[test]
fn test_copied_style_matches_attribute_for_attribute() {
    let style = Style::default()
        .with_number_format("0.000")
        .with_fill(FillPattern::LightGray, Color(0x33_6699))
        .with_borders(Borders::all(BorderSide::new(BorderStyle::Hair, Color(0x99_0000))))
        .with_font(Font {
            name: "Courier New".to_string(),
            height: 200,
            italic: true,
            ..Font::default()
        });

    let mut source = Workbook::new("src.xlsx");
    let id = source.intern_style(style.clone());
    source.add_worksheet("S").unwrap().set_value(1, 1, 3.14159).unwrap().set_style(id);

    let mut dest = Workbook::new("dest.xlsx");
    dest.add_worksheet("D").unwrap();
    copy_style(&source, CellRef::new("S", 1, 1), &mut dest, CellRef::new("D", 0, 0)).unwrap();

    assert_eq!(dest.style_at(CellRef::new("D", 0, 0)).unwrap(), &style);
}

#[test]
fn test_copy_cell_into_missing_sheet_reports_workbook() {
    let mut source = Workbook::new("src.xlsx");
    source.add_worksheet("S").unwrap().set_value(0, 0, "x").unwrap();
    let mut dest = Workbook::new("dest.xlsx");

    let err = copy_cell(&source, CellRef::new("S", 0, 0), &mut dest, CellRef::new("D", 0, 0))
        .unwrap_err();

    match err {
        SheetError::MissingWorksheet { sheet, workbook } => {
            assert_eq!(sheet, "D");
            assert_eq!(workbook, "dest.xlsx");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ===== Persistence =====

#[test]
fn test_file_round_trip_keeps_sheet_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.xlsx");

    let mut book = Workbook::new("book");
    for name in ["Summary", "Detail", "Notes"] {
        book.add_worksheet(name).unwrap().set_value(0, 0, name).unwrap();
    }
    book.save_as_xlsx(&path).unwrap();

    let loaded = Workbook::open_xlsx(&path).unwrap();
    assert_eq!(loaded.sheet_names(), vec!["Summary", "Detail", "Notes"]);
    assert_eq!(
        loaded.worksheet("Notes").unwrap().value(0, 0),
        &CellValue::from("Notes")
    );
    assert!(loaded.key().ends_with("book.xlsx"));
}
