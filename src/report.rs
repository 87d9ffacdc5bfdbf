use std::{
    collections::BTreeMap,
    convert::Infallible,
    io::Write,
    path::{Path, PathBuf},
};

use csv::WriterBuilder;
use log::info;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::ReportError;
use crate::record::PurchaseRecord;
use crate::summary::AggregationStore;

pub const DETAIL_SHEET: &str = "Customer Details";
pub const SUMMARY_SHEET: &str = "Customer and Product Summary";
pub const WISHLIST_SHEET: &str = "Wishlist Product Summary";

pub const DETAIL_HEADERS: [&str; 11] = [
    "Folder",
    "File",
    "Customer Name",
    "Product Name",
    "Product ID",
    "Quantity",
    "Price",
    "Total",
    "Purchased Date",
    "Delivery Status",
    "Wishlist Items",
];
pub const CUSTOMER_SUMMARY_HEADERS: [&str; 4] =
    ["Total Customers", "Delivered Count", "Cancelled Count", "Shipped Count"];
pub const PRODUCT_SUMMARY_HEADERS: [&str; 5] = [
    "Product Name",
    "Delivered Count",
    "Cancelled Count",
    "Shipped Count",
    "Total Count",
];
pub const WISHLIST_HEADERS: [&str; 2] = ["Product Name", "Wishlist Count"];

// Fixed row positions of the summary sheet.
const CUSTOMER_TITLE_ROW: u32 = 0;
const CUSTOMER_HEADER_ROW: u32 = 2;
const PRODUCT_TITLE_ROW: u32 = 6;
const PRODUCT_HEADER_ROW: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Number(value as f64)
    }
}

/// Destination for sheet-structured output.
pub trait TabularSink {
    type Error;

    /// Starts a new sheet; later rows go to it.
    fn begin_sheet(&mut self, name: &str) -> Result<(), Self::Error>;
    fn write_header(&mut self, row: u32, labels: &[&str]) -> Result<(), Self::Error>;
    fn write_row(&mut self, row: u32, cells: &[Cell]) -> Result<(), Self::Error>;
}

fn detail_cells(record: &PurchaseRecord) -> [Cell; 11] {
    [
        Cell::Text(record.folder_name.clone()),
        Cell::Text(record.file_name.clone()),
        Cell::Text(record.customer_name.clone()),
        Cell::Text(record.product_name.clone()),
        Cell::Text(record.product_id.clone()),
        Cell::Number(f64::from(record.quantity)),
        Cell::Number(record.unit_price),
        Cell::Number(record.total),
        Cell::Text(record.delivery_date.clone()),
        Cell::Text(record.delivery_status_text.clone()),
        Cell::Text(record.wishlist.clone()),
    ]
}

/// Writes the detail, summary and wishlist sheets into `sink`.
pub fn render<S: TabularSink>(
    records: &[PurchaseRecord],
    store: &AggregationStore,
    sink: &mut S,
) -> Result<(), S::Error> {
    sink.begin_sheet(DETAIL_SHEET)?;
    sink.write_header(0, &DETAIL_HEADERS)?;
    for (row, record) in (1u32..).zip(records) {
        sink.write_row(row, &detail_cells(record))?;
    }

    sink.begin_sheet(SUMMARY_SHEET)?;
    sink.write_header(CUSTOMER_TITLE_ROW, &["Customer Summary"])?;
    sink.write_header(CUSTOMER_HEADER_ROW, &CUSTOMER_SUMMARY_HEADERS)?;
    sink.write_row(
        CUSTOMER_HEADER_ROW + 1,
        &[
            store.total_records.into(),
            store.delivered_count.into(),
            store.cancelled_count.into(),
            store.shipped_count.into(),
        ],
    )?;
    sink.write_header(PRODUCT_TITLE_ROW, &["Product Summary"])?;
    sink.write_header(PRODUCT_HEADER_ROW, &PRODUCT_SUMMARY_HEADERS)?;
    for (row, product) in (PRODUCT_HEADER_ROW + 1..).zip(store.product_status_rows()) {
        let total = product.total();
        sink.write_row(
            row,
            &[
                Cell::Text(product.product),
                product.delivered.into(),
                product.cancelled.into(),
                product.shipped.into(),
                total.into(),
            ],
        )?;
    }

    sink.begin_sheet(WISHLIST_SHEET)?;
    sink.write_header(0, &WISHLIST_HEADERS)?;
    for (row, (product, count)) in (1u32..).zip(&store.wishlist_product_counts) {
        sink.write_row(row, &[product.as_str().into(), (*count).into()])?;
    }
    Ok(())
}

/// Sink backed by an in-memory `rust_xlsxwriter` workbook.
pub struct XlsxSink {
    workbook: Workbook,
    header_format: Format,
    current: Option<usize>,
    sheet_count: usize,
}

impl Default for XlsxSink {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxSink {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            header_format: Format::new().set_bold(),
            current: None,
            sheet_count: 0,
        }
    }

    pub fn into_bytes(mut self) -> Result<Vec<u8>, XlsxError> {
        self.workbook.save_to_buffer()
    }

    fn current_index(&self) -> Result<usize, XlsxError> {
        self.current.ok_or_else(|| {
            XlsxError::ParameterError("rows written before any sheet was started".to_string())
        })
    }
}

impl TabularSink for XlsxSink {
    type Error = XlsxError;

    fn begin_sheet(&mut self, name: &str) -> Result<(), XlsxError> {
        self.workbook.add_worksheet().set_name(name)?;
        self.current = Some(self.sheet_count);
        self.sheet_count += 1;
        Ok(())
    }

    fn write_header(&mut self, row: u32, labels: &[&str]) -> Result<(), XlsxError> {
        let index = self.current_index()?;
        let sheet = self.workbook.worksheet_from_index(index)?;
        for (col, label) in (0u16..).zip(labels) {
            sheet.write_string_with_format(row, col, *label, &self.header_format)?;
        }
        Ok(())
    }

    fn write_row(&mut self, row: u32, cells: &[Cell]) -> Result<(), XlsxError> {
        let index = self.current_index()?;
        let sheet = self.workbook.worksheet_from_index(index)?;
        for (col, cell) in (0u16..).zip(cells) {
            match cell {
                Cell::Text(text) => sheet.write_string(row, col, text.as_str())?,
                Cell::Number(number) => sheet.write_number(row, col, *number)?,
            };
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: BTreeMap<u32, Vec<Cell>>,
}

impl Sheet {
    pub fn row(&self, index: u32) -> Option<&[Cell]> {
        self.rows.get(&index).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// In-memory sink, handy for inspecting a rendered report.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SheetBuffer {
    pub sheets: Vec<Sheet>,
}

impl SheetBuffer {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn current(&mut self) -> &mut Sheet {
        if self.sheets.is_empty() {
            self.sheets.push(Sheet::default());
        }
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }
}

impl TabularSink for SheetBuffer {
    type Error = Infallible;

    fn begin_sheet(&mut self, name: &str) -> Result<(), Infallible> {
        self.sheets.push(Sheet {
            name: name.to_string(),
            rows: BTreeMap::new(),
        });
        Ok(())
    }

    fn write_header(&mut self, row: u32, labels: &[&str]) -> Result<(), Infallible> {
        let cells = labels.iter().map(|l| Cell::from(*l)).collect();
        self.current().rows.insert(row, cells);
        Ok(())
    }

    fn write_row(&mut self, row: u32, cells: &[Cell]) -> Result<(), Infallible> {
        self.current().rows.insert(row, cells.to_vec());
        Ok(())
    }
}

/// Writes `bytes` next to `path` and renames it into place.
fn publish(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut staged = NamedTempFile::new_in(&dir).map_err(io_err)?;
    staged.write_all(bytes).map_err(io_err)?;
    staged.flush().map_err(io_err)?;
    staged.persist(path).map_err(|source| ReportError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Renders the three-sheet workbook and publishes it at `path`.
pub fn write_report(
    records: &[PurchaseRecord],
    store: &AggregationStore,
    path: &Path,
) -> Result<(), ReportError> {
    let xlsx_err = |source| ReportError::Xlsx {
        path: path.to_path_buf(),
        source,
    };
    let mut sink = XlsxSink::new();
    render(records, store, &mut sink).map_err(xlsx_err)?;
    let bytes = sink.into_bytes().map_err(xlsx_err)?;
    publish(path, &bytes)?;
    info!("Data saved to Excel file: {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct DetailRow<'a> {
    folder: &'a str,
    file: &'a str,
    customer_name: &'a str,
    product_name: &'a str,
    product_id: &'a str,
    quantity: u32,
    price: f64,
    total: f64,
    purchased_date: &'a str,
    delivery_status: &'a str,
    wishlist_items: &'a str,
}

impl<'a> From<&'a PurchaseRecord> for DetailRow<'a> {
    fn from(record: &'a PurchaseRecord) -> Self {
        Self {
            folder: &record.folder_name,
            file: &record.file_name,
            customer_name: &record.customer_name,
            product_name: &record.product_name,
            product_id: &record.product_id,
            quantity: record.quantity,
            price: record.unit_price,
            total: record.total,
            purchased_date: &record.delivery_date,
            delivery_status: &record.delivery_status_text,
            wishlist_items: &record.wishlist,
        }
    }
}

/// Writes the detail rows as CSV to `path`, header included even with no records.
pub fn export_detail_csv(records: &[PurchaseRecord], path: &Path) -> Result<(), ReportError> {
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(DETAIL_HEADERS).map_err(csv_err)?;
    for record in records {
        writer.serialize(DetailRow::from(record)).map_err(csv_err)?;
    }
    let bytes = writer.into_inner().map_err(|e| ReportError::Io {
        path: path.to_path_buf(),
        source: e.into_error(),
    })?;
    publish(path, &bytes)?;
    info!("CSV file saved: {}", path.display());
    Ok(())
}
