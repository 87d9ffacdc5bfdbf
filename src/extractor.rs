use std::{
    fs::File,
    io::{BufRead, BufReader},
    str::FromStr,
};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::{Captures, Regex};

use crate::error::ExtractError;
use crate::record::{DeliveryStatus, InputFile, PurchaseRecord};

lazy_static! {
    static ref PURCHASE_RE: Regex = Regex::new(concat!(
        r"(?P<customer>\w+) (?:bought a|purchased a|bought a pair of|purchased a pair of) ",
        r"(?P<product>\w+) with ID (?P<id>\w+), quantity (?P<quantity>\d+), ",
        r"price \$(?P<price>[\d.]+)(?: each)?, total \$(?P<total>[\d.]+)(?: each)?, ",
        r"delivered on (?P<date>\d{4}-\d{2}-\d{2})\. Delivery Status: (?P<status>[\w, ]+)\. ",
        r".*?added (?P<wishlist>.+?) to (?:his|her) wishlist\.",
    ))
    .unwrap();
    // Only a leading quantifier is removed; the rest of the phrase is kept verbatim.
    static ref WISHLIST_QUANTIFIER_RE: Regex = Regex::new(r"^(?:a pair of |a )").unwrap();
}

/// Records and per-line problems produced from one file.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<PurchaseRecord>,
    pub malformed: Vec<ExtractError>,
    pub lines_read: u64,
}

/// Stateless line matcher turning purchase sentences into records.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    pattern: Regex,
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordExtractor {
    pub fn new() -> Self {
        Self {
            pattern: PURCHASE_RE.clone(),
        }
    }

    /// Reads `input` line by line. An I/O failure discards everything read so far.
    pub fn extract_file(&self, input: &InputFile) -> Result<Extraction, ExtractError> {
        let unreadable = |source| ExtractError::Unreadable {
            path: input.path.clone(),
            source,
        };
        let file = File::open(&input.path).map_err(unreadable)?;
        let mut reader = BufReader::new(file);
        let mut byte_buffer = Vec::with_capacity(8192);
        let mut extraction = Extraction::default();

        loop {
            byte_buffer.clear();
            let bytes_read = reader.read_until(b'\n', &mut byte_buffer).map_err(unreadable)?;
            if bytes_read == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&byte_buffer);
            let line_no = extraction.lines_read as usize + 1;
            self.accept_line(input, line_no, line.trim_end_matches(['\r', '\n']), &mut extraction);
        }

        debug!(
            "Extracted {} records from {} ({} lines)",
            extraction.records.len(),
            input.path.display(),
            extraction.lines_read
        );
        Ok(extraction)
    }

    /// Same as [`extract_file`](Self::extract_file) for text already in memory.
    pub fn extract_lines<I, S>(&self, input: &InputFile, lines: I) -> Extraction
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extraction = Extraction::default();
        for (idx, line) in lines.into_iter().enumerate() {
            self.accept_line(input, idx + 1, line.as_ref(), &mut extraction);
        }
        extraction
    }

    /// Returns `Ok(None)` for lines outside the purchase grammar.
    pub fn extract_line(
        &self,
        input: &InputFile,
        line_no: usize,
        line: &str,
    ) -> Result<Option<PurchaseRecord>, ExtractError> {
        let Some(caps) = self.pattern.captures(line) else {
            return Ok(None);
        };

        let quantity: u32 = parse_group(&caps, "quantity", input, line_no)?;
        let unit_price: f64 = parse_group(&caps, "price", input, line_no)?;
        let total: f64 = parse_group(&caps, "total", input, line_no)?;

        Ok(Some(PurchaseRecord {
            folder_name: input.folder.clone(),
            file_name: input.file.clone(),
            customer_name: caps["customer"].to_string(),
            product_name: caps["product"].to_string(),
            product_id: caps["id"].to_string(),
            quantity,
            unit_price,
            total,
            delivery_date: caps["date"].to_string(),
            delivery_status: DeliveryStatus::parse(&caps["status"]),
            delivery_status_text: caps["status"].to_string(),
            wishlist: normalize_wishlist(&caps["wishlist"]),
        }))
    }

    fn accept_line(&self, input: &InputFile, line_no: usize, line: &str, extraction: &mut Extraction) {
        extraction.lines_read += 1;
        match self.extract_line(input, line_no, line) {
            Ok(Some(record)) => extraction.records.push(record),
            Ok(None) => {}
            Err(e) => {
                warn!("Skipping corrupt record: {}", e);
                extraction.malformed.push(e);
            }
        }
    }
}

/// Strips one leading `a pair of ` or `a ` from a captured wishlist phrase.
pub fn normalize_wishlist(phrase: &str) -> String {
    WISHLIST_QUANTIFIER_RE.replace(phrase, "").into_owned()
}

fn parse_group<T: FromStr>(
    caps: &Captures<'_>,
    field: &'static str,
    input: &InputFile,
    line_no: usize,
) -> Result<T, ExtractError> {
    let raw = &caps[field];
    raw.parse::<T>().map_err(|_| ExtractError::MalformedNumeric {
        path: input.path.clone(),
        line: line_no,
        field,
        value: raw.to_string(),
    })
}
