use std::collections::BTreeMap;

use log::info;

use crate::record::{DeliveryStatus, PurchaseRecord};

pub type Counter = BTreeMap<String, u64>;

/// Counters derived from the full record list.
///
/// `product_counts` sums quantity regardless of status, while the three
/// per-status maps only see records with that status. The per-status maps
/// therefore need not add up to `product_counts`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregationStore {
    pub folder_counts: Counter,
    pub file_counts: Counter,
    pub product_counts: Counter,
    pub wishlist_product_counts: Counter,
    pub delivered_product_counts: Counter,
    pub cancelled_product_counts: Counter,
    pub shipped_product_counts: Counter,
    pub delivered_count: u64,
    pub cancelled_count: u64,
    pub shipped_count: u64,
    pub total_records: u64,
    pub total_wishlist_items: u64,
}

/// One line of the per-product status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductStatusRow {
    pub product: String,
    pub delivered: u64,
    pub cancelled: u64,
    pub shipped: u64,
}

impl ProductStatusRow {
    /// Sum of the three status quantities; not the same figure as `product_counts`.
    pub fn total(&self) -> u64 {
        self.delivered + self.cancelled + self.shipped
    }
}

fn bump(counter: &mut Counter, key: &str, by: u64) {
    *counter.entry(key.to_string()).or_insert(0) += by;
}

/// Single sequential pass over the materialized record list.
pub fn summarize(records: &[PurchaseRecord]) -> AggregationStore {
    let mut store = AggregationStore::default();
    for record in records {
        store.add(record);
    }
    store
}

impl AggregationStore {
    pub fn add(&mut self, record: &PurchaseRecord) {
        let quantity = u64::from(record.quantity);
        self.total_records += 1;
        bump(&mut self.folder_counts, &record.folder_name, 1);
        bump(&mut self.file_counts, &record.file_name, 1);
        bump(&mut self.product_counts, &record.product_name, quantity);

        match record.delivery_status {
            DeliveryStatus::Delivered => {
                self.delivered_count += 1;
                bump(&mut self.delivered_product_counts, &record.product_name, quantity);
            }
            DeliveryStatus::Cancelled => {
                self.cancelled_count += 1;
                bump(&mut self.cancelled_product_counts, &record.product_name, quantity);
            }
            DeliveryStatus::Shipped => {
                self.shipped_count += 1;
                bump(&mut self.shipped_product_counts, &record.product_name, quantity);
            }
            DeliveryStatus::Unknown(_) => {}
        }

        for item in record.wishlist_items() {
            self.total_wishlist_items += 1;
            bump(&mut self.wishlist_product_counts, item, 1);
        }
    }

    pub fn total_product_quantity(&self) -> u64 {
        self.product_counts.values().sum()
    }

    /// One row per key of `product_counts`, with zero for missing statuses.
    pub fn product_status_rows(&self) -> Vec<ProductStatusRow> {
        let get = |map: &Counter, key: &str| map.get(key).copied().unwrap_or(0);
        self.product_counts
            .keys()
            .map(|product| ProductStatusRow {
                product: product.clone(),
                delivered: get(&self.delivered_product_counts, product),
                cancelled: get(&self.cancelled_product_counts, product),
                shipped: get(&self.shipped_product_counts, product),
            })
            .collect()
    }

    pub fn log_summary(&self) {
        info!("--- Customer Count Summary ---");
        info!("Per Folder Customer Counts:");
        for (folder, count) in &self.folder_counts {
            info!("  {}: {}", folder, count);
        }
        info!("Total count of all folders: {}", self.folder_counts.values().sum::<u64>());

        info!("Per File Customer Counts:");
        for (file, count) in &self.file_counts {
            info!("  {}: {}", file, count);
        }
        info!("Total count of all files: {}", self.file_counts.values().sum::<u64>());

        info!("Delivered Customer Count: {}", self.delivered_count);
        info!("Cancelled Customer Count: {}", self.cancelled_count);
        info!("Shipped Customer Count: {}", self.shipped_count);

        info!("Delivered Product Count: {:?}", self.delivered_product_counts);
        info!("Cancelled Product Count: {:?}", self.cancelled_product_counts);
        info!("Shipped Product Count: {:?}", self.shipped_product_counts);

        info!("Product Counts:");
        for (product, count) in &self.product_counts {
            info!("  {}: {}", product, count);
        }
        info!("Total Product Count: {}", self.total_product_quantity());
        info!("Added to Wishlist Product Count: {}", self.total_wishlist_items);
        info!("------------------------------");
    }
}
