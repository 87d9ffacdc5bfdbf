use std::fs;

use purchase_log_report::{
    render, report, summarize, write_report, AggregationStore, DeliveryStatus, Notice, RecordExtractor,
    RunConfiguration, SheetBuffer, WorkDispatcher,
};

const LAPTOP: &str = "Alice bought a laptop with ID L123, quantity 1, price $999.99, total $999.99, delivered on 2024-07-10. Delivery Status: delivered. She also added a smartwatch to her wishlist.";
const TABLET: &str = "Alice purchased a tablet with ID T456, quantity 2, price $499.99 each, total $999.98 each, delivered on 2024-07-12. Delivery Status: shipped. She also added a pair of headphones and a smartphone to her wishlist.";
const PHONE: &str = "Carl bought a smartphone with ID S789, quantity 3, price $300.00, total $900.00, delivered on 2024-07-15. Delivery Status: Delivered. He also added a case to his wishlist.";

#[test]
fn end_to_end_over_a_folder_tree() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("logs");
    for folder in ["east", "west", "quiet"] {
        fs::create_dir_all(root.join(folder)).unwrap();
    }
    fs::write(root.join("east/monday.txt"), format!("{LAPTOP}\nheader noise\n{TABLET}\n")).unwrap();
    fs::write(root.join("west/tuesday.txt"), format!("{PHONE}\n")).unwrap();
    fs::write(root.join("west/ignored.csv"), format!("{PHONE}\n")).unwrap();

    let config_path = dir.path().join("config.txt");
    fs::write(
        &config_path,
        format!(
            "folderPath={}\noutputPath={}\nexcelFilePath={}\nfolderCount=2\n",
            root.display(),
            dir.path().join("details.csv").display(),
            dir.path().join("report.xlsx").display(),
        ),
    )
    .unwrap();
    let config = RunConfiguration::load(&config_path).unwrap();

    let dispatch = WorkDispatcher::new(RecordExtractor::new(), config.partition_size, &config.file_extension)
        .run(&config.input_root)
        .unwrap();
    assert_eq!(dispatch.worker_count, 2);
    assert_eq!(dispatch.records.len(), 3);
    assert!(dispatch.errors.is_empty());
    assert_eq!(dispatch.notices, vec![Notice::EmptyFolder(root.join("quiet"))]);

    let store = summarize(&dispatch.records);
    assert_eq!(store.delivered_count, 2);
    assert_eq!(store.shipped_count, 1);
    assert_eq!(store.cancelled_count, 0);
    assert_eq!(store.delivered_product_counts.get("laptop"), Some(&1));
    assert_eq!(store.delivered_product_counts.get("smartphone"), Some(&3));
    assert_eq!(store.shipped_product_counts.get("tablet"), Some(&2));
    assert_eq!(store.folder_counts.get("east"), Some(&2));
    assert_eq!(store.file_counts.get("tuesday.txt"), Some(&1));
    assert_eq!(store.wishlist_product_counts.get("headphones and a smartphone"), Some(&1));

    let tablet = dispatch
        .records
        .iter()
        .find(|r| r.product_name == "tablet")
        .unwrap();
    assert_eq!(tablet.delivery_status, DeliveryStatus::Shipped);
    assert_eq!(tablet.folder_name, "east");

    let mut buffer = SheetBuffer::default();
    render(&dispatch.records, &store, &mut buffer).unwrap();
    assert_eq!(
        buffer.sheet(report::DETAIL_SHEET).unwrap().row_count(),
        dispatch.records.len() + 1
    );
    assert_eq!(buffer.sheet(report::WISHLIST_SHEET).unwrap().row_count(), 4);

    write_report(&dispatch.records, &store, &config.report_path).unwrap();
    assert!(config.report_path.is_file());
    let csv_path = config.output_path.clone().unwrap();
    report::export_detail_csv(&dispatch.records, &csv_path).unwrap();
    assert_eq!(fs::read_to_string(&csv_path).unwrap().lines().count(), 4);
}

#[test]
fn empty_root_produces_header_only_report() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("logs");
    fs::create_dir(&root).unwrap();

    let dispatch = WorkDispatcher::new(RecordExtractor::new(), 3, "txt")
        .run(&root)
        .unwrap();
    assert!(dispatch.records.is_empty());
    assert_eq!(dispatch.notices, vec![Notice::NoFolders(root.clone())]);

    let store = summarize(&dispatch.records);
    assert_eq!(store, AggregationStore::default());

    let mut buffer = SheetBuffer::default();
    render(&dispatch.records, &store, &mut buffer).unwrap();
    assert_eq!(buffer.sheet(report::DETAIL_SHEET).unwrap().row_count(), 1);
    assert_eq!(buffer.sheet(report::WISHLIST_SHEET).unwrap().row_count(), 1);

    let path = dir.path().join("empty.xlsx");
    write_report(&dispatch.records, &store, &path).unwrap();
    assert!(path.is_file());
}
