use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::NaiveDateTime;
use gridfile_formatting::{datetime_to_serial, serial_to_datetime};
use rust_xlsxwriter::{
    Color as XlsxColor, Format, FormatBorder, FormatPattern, FormatScript, FormatUnderline,
    Formula, Workbook as XlsxWorkbook, Worksheet as XlsxWorksheet,
};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::cell::{default_date_format, CellValue};
use crate::error::{Result, SheetError};
use crate::style::{BorderStyle, Color, FillPattern, FontOffset, Style, StyleId, Underline};
use crate::workbook::Workbook;
use crate::worksheet::Worksheet;

/// Convert calamine Data to a cell value. Date-typed cells also report the
/// number format they should display with.
fn data_to_cell_value(data: &Data) -> (CellValue, Option<&'static str>) {
    match data {
        Data::Empty => (CellValue::Empty, None),
        Data::Bool(b) => (CellValue::Boolean(*b), None),
        Data::Int(i) => (CellValue::Number(*i as f64), None),
        Data::Float(f) => (CellValue::Number(*f), None),
        Data::String(s) => (CellValue::Text(s.clone()), None),
        Data::DateTime(dt) if dt.is_duration() => (CellValue::Number(dt.as_f64()), None),
        Data::DateTime(dt) => match serial_to_datetime(dt.as_f64()) {
            Some(value) => (CellValue::Date(value), Some(default_date_format(value))),
            None => (CellValue::Number(dt.as_f64()), None),
        },
        Data::DateTimeIso(s) => match parse_iso_datetime(s) {
            Some(value) => (CellValue::Date(value), Some(default_date_format(value))),
            None => (CellValue::Text(s.clone()), None),
        },
        Data::DurationIso(s) => (CellValue::Text(s.clone()), None),
        Data::Error(e) => (CellValue::Text(e.to_string()), None),
    }
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

impl Workbook {
    /// Load a workbook from xlsx bytes. `key` names the source in errors.
    pub fn from_xlsx_bytes(key: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        Self::from_xlsx_reader(key, Cursor::new(bytes))
    }

    /// Load a workbook from an xlsx file; the path becomes the key.
    pub fn open_xlsx<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::from_xlsx_bytes(path.display().to_string(), &bytes)
    }

    /// Load a workbook from any seekable xlsx stream.
    ///
    /// Values, formulas (with their cached results) and sheet order are
    /// read. Date cells get a default date format.
    pub fn from_xlsx_reader<R: Read + Seek>(key: impl Into<String>, reader: R) -> Result<Self> {
        let mut xlsx: Xlsx<R> = open_workbook_from_rs(reader)?;
        let mut book = Workbook::new(key);
        tracing::debug!(workbook = %book.key(), "Opening xlsx document");

        for name in xlsx.sheet_names() {
            let range = xlsx.worksheet_range(&name)?;
            let formulas = xlsx.worksheet_formula(&name)?;

            let date_styles: Vec<(&'static str, StyleId)> = [
                gridfile_formatting::DEFAULT_DATE_FORMAT,
                gridfile_formatting::DEFAULT_DATETIME_FORMAT,
            ]
            .into_iter()
            .map(|fmt| (fmt, book.intern_style(Style::default().with_number_format(fmt))))
            .collect();

            let sheet = book.add_worksheet(&name)?;

            if let Some((row0, col0)) = range.start() {
                for (r, c, data) in range.used_cells() {
                    let (value, date_format) = data_to_cell_value(data);
                    let cell = sheet.set_value(row0 + r as u32, col0 + c as u32, value)?;
                    if let Some(fmt) = date_format {
                        if let Some((_, id)) = date_styles.iter().find(|(f, _)| *f == fmt) {
                            cell.set_style(*id);
                        }
                    }
                }
            }

            if let Some((row0, col0)) = formulas.start() {
                for (r, c, source) in formulas.used_cells() {
                    if source.trim().is_empty() {
                        continue;
                    }
                    let (row, col) = (row0 + r as u32, col0 + c as u32);
                    let cell = sheet.create_cell(row, col)?;
                    let cached = std::mem::take(cell.value_mut());
                    cell.set_value(CellValue::formula_with_cached(source, cached));
                }
            }

            tracing::debug!(
                sheet = %name,
                rows = sheet.row_span(),
                cols = sheet.col_span(),
                "Loaded worksheet"
            );
        }

        Ok(book)
    }

    /// Serialize the workbook to xlsx bytes.
    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>> {
        let mut xlsx = self.to_xlsx_workbook()?;
        Ok(xlsx.save_to_buffer()?)
    }

    /// Save the workbook to an xlsx file.
    pub fn save_as_xlsx<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut xlsx = self.to_xlsx_workbook()?;
        xlsx.save(path.as_ref())?;
        Ok(())
    }

    fn to_xlsx_workbook(&self) -> Result<XlsxWorkbook> {
        let formats: Vec<Format> = self.styles().iter().map(|(_, style)| to_format(style)).collect();
        let mut xlsx = XlsxWorkbook::new();

        for sheet in self.worksheets() {
            let target = xlsx.add_worksheet();
            target.set_name(sheet.name())?;
            self.write_worksheet(sheet, target, &formats)?;
            if sheet.refresh_on_load() {
                tracing::debug!(
                    sheet = sheet.name(),
                    "Refresh-on-load has no xlsx representation without pivot caches; not written"
                );
            }
        }

        Ok(xlsx)
    }

    fn write_worksheet(
        &self,
        sheet: &Worksheet,
        target: &mut XlsxWorksheet,
        formats: &[Format],
    ) -> Result<()> {
        for row in sheet.rows() {
            for cell in row.cells() {
                let row_num = row.index();
                let col_num =
                    u16::try_from(cell.col()).map_err(|_| SheetError::ColumnOutOfRange(cell.col()))?;
                let style_id = cell.style();
                let style = self.styles().resolve(style_id);
                let format = formats
                    .get(style_id.index() as usize)
                    .ok_or(SheetError::UnknownStyle(style_id.index()))?;

                match cell.value() {
                    CellValue::Empty => {
                        if style_id != StyleId::default() {
                            target.write_blank(row_num, col_num, format)?;
                        }
                    }
                    CellValue::Text(s) => {
                        target.write_string_with_format(row_num, col_num, s, format)?;
                    }
                    CellValue::Number(n) => {
                        target.write_number_with_format(row_num, col_num, *n, format)?;
                    }
                    CellValue::Boolean(b) => {
                        target.write_boolean_with_format(row_num, col_num, *b, format)?;
                    }
                    CellValue::Date(dt) => {
                        let serial = datetime_to_serial(*dt);
                        if style.is_date() {
                            target.write_number_with_format(row_num, col_num, serial, format)?;
                        } else {
                            let dated = to_format(
                                &style.clone().with_number_format(default_date_format(*dt)),
                            );
                            target.write_number_with_format(row_num, col_num, serial, &dated)?;
                        }
                    }
                    CellValue::Formula(formula) => {
                        let mut xlsx_formula = Formula::new(format!("={}", formula.source));
                        if let Some(cached) = &formula.cached {
                            xlsx_formula =
                                xlsx_formula.set_result(cached.display(&style.number_format));
                        }
                        target.write_formula_with_format(row_num, col_num, xlsx_formula, format)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn xlsx_color(color: Color) -> XlsxColor {
    XlsxColor::RGB(color.0)
}

fn border(style: BorderStyle) -> FormatBorder {
    match style {
        BorderStyle::None => FormatBorder::None,
        BorderStyle::Thin => FormatBorder::Thin,
        BorderStyle::Medium => FormatBorder::Medium,
        BorderStyle::Thick => FormatBorder::Thick,
        BorderStyle::Dashed => FormatBorder::Dashed,
        BorderStyle::Dotted => FormatBorder::Dotted,
        BorderStyle::Double => FormatBorder::Double,
        BorderStyle::Hair => FormatBorder::Hair,
    }
}

/// Map a style onto an xlsx cell format.
fn to_format(style: &Style) -> Format {
    let font = &style.font;
    let mut format = Format::new()
        .set_num_format(&style.number_format)
        .set_font_name(&font.name)
        .set_font_size(font.size_points());

    if font.bold {
        format = format.set_bold();
    }
    if font.italic {
        format = format.set_italic();
    }
    if font.strikeout {
        format = format.set_font_strikethrough();
    }
    format = match font.underline {
        Underline::None => format,
        Underline::Single => format.set_underline(FormatUnderline::Single),
        Underline::Double => format.set_underline(FormatUnderline::Double),
    };
    format = match font.offset {
        FontOffset::Normal => format,
        FontOffset::Superscript => format.set_font_script(FormatScript::Superscript),
        FontOffset::Subscript => format.set_font_script(FormatScript::Subscript),
    };
    if let Some(color) = font.color {
        format = format.set_font_color(xlsx_color(color));
    }

    let pattern = match style.fill.pattern {
        FillPattern::None => None,
        FillPattern::Solid => Some(FormatPattern::Solid),
        FillPattern::MediumGray => Some(FormatPattern::MediumGray),
        FillPattern::DarkGray => Some(FormatPattern::DarkGray),
        FillPattern::LightGray => Some(FormatPattern::LightGray),
        FillPattern::Gray125 => Some(FormatPattern::Gray125),
        FillPattern::Gray0625 => Some(FormatPattern::Gray0625),
    };
    if let Some(pattern) = pattern {
        format = format.set_pattern(pattern);
        if let Some(color) = style.fill.color {
            // Solid fills take the background slot; patterns draw in the foreground.
            format = if style.fill.pattern == FillPattern::Solid {
                format.set_background_color(xlsx_color(color))
            } else {
                format.set_foreground_color(xlsx_color(color))
            };
        }
    }

    let sides = &style.borders;
    if sides.left.style != BorderStyle::None {
        format = format.set_border_left(border(sides.left.style));
        if let Some(color) = sides.left.color {
            format = format.set_border_left_color(xlsx_color(color));
        }
    }
    if sides.right.style != BorderStyle::None {
        format = format.set_border_right(border(sides.right.style));
        if let Some(color) = sides.right.color {
            format = format.set_border_right_color(xlsx_color(color));
        }
    }
    if sides.top.style != BorderStyle::None {
        format = format.set_border_top(border(sides.top.style));
        if let Some(color) = sides.top.color {
            format = format.set_border_top_color(xlsx_color(color));
        }
    }
    if sides.bottom.style != BorderStyle::None {
        format = format.set_border_bottom(border(sides.bottom.style));
        if let Some(color) = sides.bottom.color {
            format = format.set_border_bottom_color(xlsx_color(color));
        }
    }

    format
}
