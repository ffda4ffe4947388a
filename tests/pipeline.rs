use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use product_push::batch::{BatchRunner, ClientOutcome};
use product_push::data::{self, DataPaths, Dataset, OutputFormat};
use product_push::extract::{extract_on, ProductFields};
use product_push::notify::NotificationFormatter;
use product_push::profile::build_profile;
use product_push::scoring::{ScoredBy, ScoringChain};
use product_push::PipelineError;

const CLIENTS: &str = "\
client_code,name,status,age,city,avg_monthly_balance_KZT
1,Rustam,Premium client,45,Astana,7000000
2,Aigerim,Student,21,Almaty,600000
3,Dana,Standard client,33,Shymkent,0
";

const TRANSACTIONS: &str = "\
date,category,amount,currency,client_code,product
2025-08-01 10:00:00,Taxi,90000,KZT,2,
2025-08-05 18:30:00,Taxi,60000,KZT,2,
2025-08-09 09:15:00,Travel,0,KZT,2,
2025-08-10 12:00:00,Groceries,45000,KZT,1,
";

const TRANSFERS: &str = "\
date,type,direction,amount,currency,client_code
2025-08-02 08:00:00,salary_in,in,400000,KZT,2
2025-08-03 08:00:00,fx_buy,out,250000,USD,1
";

fn write_tables(dir: &Path) -> DataPaths {
    let paths = DataPaths::in_dir(dir);
    fs::write(&paths.clients, CLIENTS).unwrap();
    fs::write(&paths.transactions, TRANSACTIONS).unwrap();
    fs::write(&paths.transfers, TRANSFERS).unwrap();
    paths
}

#[tokio::test]
async fn notifications_cover_every_client_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = Dataset::load(&write_tables(dir.path())).unwrap();

    let runner = BatchRunner::new(
        &dataset,
        ScoringChain::rules_only(),
        NotificationFormatter::Template,
        0.5,
        3,
    );
    let (results, summary) = runner.run(&dataset.client_codes()).await;

    let products: Vec<&str> = results.iter().map(|result| result.record.product.as_str()).collect();
    assert_eq!(products, vec!["Premium card", "Travel card", ""]);
    assert_eq!(
        results[0].outcome,
        ClientOutcome::Scored {
            scored_by: ScoredBy::Rules
        }
    );
    assert!(results[0].record.push_notification.starts_with("Rustam, "));
    assert!(results[1].record.push_notification.contains("75 taxi rides"));
    assert_eq!(results[2].record.push_notification, "Notification generation failed");
    assert_eq!((summary.succeeded, summary.failed), (2, 1));

    let out = dir.path().join("notifications.csv");
    let records: Vec<_> = results.iter().map(|result| result.record.clone()).collect();
    data::save_records(&out, &records, OutputFormat::from_path(&out)).unwrap();

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("client_code,product,push_notification\n"));
    let read_back = data::read_records(fs::File::open(&out).unwrap(), OutputFormat::Csv).unwrap();
    assert_eq!(read_back, records);
}

#[test]
fn taxi_spend_becomes_ride_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = Dataset::load(&write_tables(dir.path())).unwrap();
    let profile = build_profile(&dataset, 2).unwrap();

    let today = NaiveDate::from_ymd_opt(2025, 8, 15).unwrap();
    let data = extract_on(&profile, "travel card", today);
    let Some(ProductFields::TravelCard(fields)) = &data.fields else {
        panic!("expected travel card fields, got {:?}", data.fields);
    };
    assert_eq!(fields.taxi_rides_count, 75);
    assert_eq!(fields.month, "August");

    let json = data.to_json().unwrap();
    assert_eq!(json["taxi_rides_count"], 75);
    assert_eq!(json["name"], "Aigerim");
}

#[tokio::test]
async fn classification_snapshot_is_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = Dataset::load(&write_tables(dir.path())).unwrap();

    let runner = BatchRunner::new(
        &dataset,
        ScoringChain::rules_only(),
        NotificationFormatter::Template,
        0.4,
        2,
    );
    let records = runner.classify_all(&[1, 404]).await;
    assert_eq!(records.len(), 1);

    let out = dir.path().join("product_classification.json");
    data::save_classification(&out, &records).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json[0]["product_type"], "Premium card");
    assert_eq!(json[0]["top_5_type_spending"]["fx_buy"], 250000);
    assert_eq!(json[0]["currencies"], serde_json::json!(["KZT", "USD"]));
}

#[test]
fn missing_table_aborts_loading() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::in_dir(dir.path());
    fs::write(&paths.clients, CLIENTS).unwrap();

    let err = Dataset::load(&paths).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
    assert!(err.to_string().contains("all_transactions.csv"));
}
