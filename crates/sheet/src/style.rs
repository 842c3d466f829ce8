//! Cell styles and the workbook-scoped style table.
//!
//! A [`Style`] is an immutable bundle of formatting attributes. Cells refer to
//! styles by [`StyleId`]; a [`StyleTable`] hands out one id per distinct
//! style, so two equal styles always share an id within a workbook.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use gridfile_formatting::GENERAL_FORMAT;

/// Index into a workbook's [`StyleTable`]. `StyleId::default()` is the
/// workbook's default style.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct StyleId(pub(crate) u32);

impl StyleId {
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x00_0000);
    pub const WHITE: Color = Color(0xFF_FFFF);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FillPattern {
    #[default]
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    Gray125,
    Gray0625,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Fill {
    pub pattern: FillPattern,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BorderSide {
    pub style: BorderStyle,
    pub color: Option<Color>,
}

impl BorderSide {
    #[must_use]
    pub fn new(style: BorderStyle, color: Color) -> Self {
        Self {
            style,
            color: Some(color),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Borders {
    pub left: BorderSide,
    pub right: BorderSide,
    pub top: BorderSide,
    pub bottom: BorderSide,
}

impl Borders {
    /// The same side on all four edges.
    #[must_use]
    pub fn all(side: BorderSide) -> Self {
        Self {
            left: side,
            right: side,
            top: side,
            bottom: side,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
}

/// Vertical font offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontOffset {
    #[default]
    Normal,
    Superscript,
    Subscript,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Font {
    pub name: String,
    /// Height in twentieths of a point.
    pub height: u16,
    pub bold: bool,
    pub italic: bool,
    pub strikeout: bool,
    pub underline: Underline,
    pub color: Option<Color>,
    pub offset: FontOffset,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Calibri".to_string(),
            height: 220,
            bold: false,
            italic: false,
            strikeout: false,
            underline: Underline::None,
            color: None,
            offset: FontOffset::Normal,
        }
    }
}

impl Font {
    /// Size in points.
    #[must_use]
    pub fn size_points(&self) -> f64 {
        f64::from(self.height) / 20.0
    }
}

/// Formatting attributes of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Style {
    pub number_format: String,
    pub fill: Fill,
    pub borders: Borders,
    pub font: Font,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            number_format: GENERAL_FORMAT.to_string(),
            fill: Fill::default(),
            borders: Borders::default(),
            font: Font::default(),
        }
    }
}

impl Style {
    #[must_use]
    pub fn with_number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = format.into();
        self
    }

    #[must_use]
    pub fn with_fill(mut self, pattern: FillPattern, color: Color) -> Self {
        self.fill = Fill {
            pattern,
            color: Some(color),
        };
        self
    }

    #[must_use]
    pub fn with_borders(mut self, borders: Borders) -> Self {
        self.borders = borders;
        self
    }

    #[must_use]
    pub fn with_font(mut self, font: Font) -> Self {
        self.font = font;
        self
    }

    /// Whether numbers under this style display as dates.
    #[must_use]
    pub fn is_date(&self) -> bool {
        gridfile_formatting::is_date_format(&self.number_format)
    }
}

/// Deduplicating style pool owned by a workbook.
#[derive(Debug, Clone, Serialize)]
pub struct StyleTable {
    styles: Vec<Style>,
    #[serde(skip)]
    index: HashMap<Style, StyleId>,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleTable {
    #[must_use]
    pub fn new() -> Self {
        let default = Style::default();
        let mut index = HashMap::new();
        index.insert(default.clone(), StyleId(0));
        Self {
            styles: vec![default],
            index,
        }
    }

    /// Insert (or reuse) a style, returning its id.
    pub fn intern(&mut self, style: Style) -> StyleId {
        if let Some(id) = self.index.get(&style) {
            return *id;
        }
        let id = StyleId(self.styles.len() as u32);
        self.styles.push(style.clone());
        self.index.insert(style, id);
        id
    }

    /// Look up an existing style without inserting it.
    #[must_use]
    pub fn find(&self, style: &Style) -> Option<StyleId> {
        self.index.get(style).copied()
    }

    #[must_use]
    pub fn get(&self, id: StyleId) -> Option<&Style> {
        self.styles.get(id.0 as usize)
    }

    /// Style for `id`, falling back to the default style for unknown ids.
    #[must_use]
    pub fn resolve(&self, id: StyleId) -> &Style {
        self.get(id).unwrap_or(&self.styles[0])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StyleId, &Style)> {
        self.styles
            .iter()
            .enumerate()
            .map(|(idx, style)| (StyleId(idx as u32), style))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedups_equal_styles() {
        let mut table = StyleTable::new();
        let money = Style::default().with_number_format("$#,##0.00");
        let a = table.intern(money.clone());
        let b = table.intern(money);
        assert_eq!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.intern(Style::default()), StyleId::default());
    }

    #[test]
    fn test_distinct_fonts_get_distinct_ids() {
        let mut table = StyleTable::new();
        let bold = Style::default().with_font(Font {
            bold: true,
            ..Font::default()
        });
        let italic = Style::default().with_font(Font {
            italic: true,
            ..Font::default()
        });
        assert_ne!(table.intern(bold.clone()), table.intern(italic));
        assert_eq!(table.find(&bold), Some(StyleId(1)));
    }

    #[test]
    fn test_resolve_unknown_id_falls_back_to_default() {
        let table = StyleTable::new();
        assert_eq!(table.resolve(StyleId(42)), &Style::default());
        assert!(!Style::default().is_date());
        assert!(Style::default().with_number_format("yyyy-mm-dd").is_date());
    }
}
