use std::{fmt, path::PathBuf};

/// Separator between items of a wishlist phrase when it is counted.
pub const WISHLIST_SEPARATOR: &str = ", ";

/// Delivery status of a purchase, decided once when the line is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    Delivered,
    Cancelled,
    Shipped,
    Unknown(String),
}

impl DeliveryStatus {
    /// Case-insensitive exact match against the three known statuses.
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "delivered" => DeliveryStatus::Delivered,
            "cancelled" => DeliveryStatus::Cancelled,
            "shipped" => DeliveryStatus::Shipped,
            _ => DeliveryStatus::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
            DeliveryStatus::Shipped => "shipped",
            DeliveryStatus::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchase event extracted from a single matching log line.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub folder_name: String,
    pub file_name: String,
    pub customer_name: String,
    pub product_name: String,
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
    pub delivery_date: String,
    pub delivery_status: DeliveryStatus,
    /// Status exactly as it appeared in the log line.
    pub delivery_status_text: String,
    /// Normalized wishlist phrase, kept as one field.
    pub wishlist: String,
}

impl PurchaseRecord {
    /// Individual wishlist entries, split on `", "`. Trailing empty entries are
    /// dropped, so `"cap, "` yields only `"cap"`.
    pub fn wishlist_items(&self) -> impl Iterator<Item = &str> {
        let phrase = self.wishlist.trim_end_matches(WISHLIST_SEPARATOR);
        phrase
            .split(WISHLIST_SEPARATOR)
            .filter(move |_| !phrase.is_empty())
    }
}

/// A log file scheduled for extraction, with the folder it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub folder: String,
    pub file: String,
    pub path: PathBuf,
}

impl InputFile {
    pub fn from_path(path: PathBuf) -> Self {
        let folder = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { folder, file, path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(DeliveryStatus::parse("Delivered"), DeliveryStatus::Delivered);
        assert_eq!(DeliveryStatus::parse("CANCELLED"), DeliveryStatus::Cancelled);
        assert_eq!(DeliveryStatus::parse("shipped"), DeliveryStatus::Shipped);
        assert_eq!(
            DeliveryStatus::parse("in transit"),
            DeliveryStatus::Unknown("in transit".to_string())
        );
        assert_eq!(DeliveryStatus::parse("in transit").to_string(), "in transit");
    }

    #[test]
    fn input_file_takes_identity_from_path() {
        let input = InputFile::from_path(Path::new("/logs/north/day1.txt").to_path_buf());
        assert_eq!(input.folder, "north");
        assert_eq!(input.file, "day1.txt");
    }

    #[test]
    fn wishlist_items_split_on_comma_space() {
        let mut record = PurchaseRecord {
            folder_name: "f".into(),
            file_name: "a.txt".into(),
            customer_name: "Bob".into(),
            product_name: "phone".into(),
            product_id: "P1".into(),
            quantity: 1,
            unit_price: 1.0,
            total: 1.0,
            delivery_date: "2024-01-01".into(),
            delivery_status: DeliveryStatus::Shipped,
            delivery_status_text: "Shipped".into(),
            wishlist: "camera, tripod".into(),
        };
        assert_eq!(record.wishlist_items().collect::<Vec<_>>(), vec!["camera", "tripod"]);

        record.wishlist = "cap, ".into();
        assert_eq!(record.wishlist_items().collect::<Vec<_>>(), vec!["cap"]);

        record.wishlist = "cap, , ".into();
        assert_eq!(record.wishlist_items().collect::<Vec<_>>(), vec!["cap"]);

        // Inner empty entries survive, as only trailing ones are dropped.
        record.wishlist = "cap, , hat".into();
        assert_eq!(record.wishlist_items().collect::<Vec<_>>(), vec!["cap", "", "hat"]);

        record.wishlist = ", ".into();
        assert_eq!(record.wishlist_items().count(), 0);

        record.wishlist.clear();
        assert_eq!(record.wishlist_items().count(), 0);
    }
}
