use scraper::{ElementRef, Html, Selector};

use crate::models::RawRow;
use crate::session::parse_selector;
use crate::utils::error::Result;
use crate::utils::text::inner_text;

/// Rows read from one rendered table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Cell texts of row 0, when the table has any rows.
    pub header: Option<Vec<String>>,
    pub rows: Vec<RawRow>,
}

/// Reads the results table out of a serialized DOM.
///
/// Row 0 is the header and is never yielded as a data row. Cell text is the
/// element's rendered text, so stacked blocks inside a cell come back as
/// separate lines.
#[derive(Debug, Clone)]
pub struct RowExtractor {
    table: Selector,
    row: Selector,
    cell: Selector,
}

impl RowExtractor {
    pub fn new(table_selector: &str, row_selector: &str, cell_selector: &str) -> Result<Self> {
        Ok(Self {
            table: parse_selector(table_selector)?,
            row: parse_selector(row_selector)?,
            cell: parse_selector(cell_selector)?,
        })
    }

    fn table_rows<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        document
            .select(&self.table)
            .next()
            .into_iter()
            .flat_map(move |table| table.select(&self.row))
    }

    fn cells(&self, row: ElementRef<'_>) -> Vec<String> {
        row.select(&self.cell).map(inner_text).collect()
    }

    pub fn header(&self, document: &Html) -> Option<Vec<String>> {
        self.table_rows(document).next().map(|row| self.cells(row))
    }

    /// Data rows in document order, produced lazily.
    pub fn rows<'a>(
        &'a self,
        document: &'a Html,
        slate_id: &'a str,
    ) -> impl Iterator<Item = RawRow> + 'a {
        self.table_rows(document)
            .enumerate()
            .skip(1)
            .map(move |(index, row)| RawRow::new(slate_id, index, self.cells(row)))
    }

    pub fn extract(&self, html: &str, slate_id: &str) -> TableSnapshot {
        let document = Html::parse_document(html);
        TableSnapshot {
            header: self.header(&document),
            rows: self.rows(&document, slate_id).collect(),
        }
    }
}
