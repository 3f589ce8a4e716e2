// ==========================================
// 导入任务控制器集成测试
// ==========================================
// 覆盖:
// - 客户/商品/订单端到端导入
// - 已完成行跳过、失败任务重试、日志条数、扫描门控、任务状态汇总
// - 提交策略、跳过行日志、完成态守卫、强制重扫、结构性错误
// ==========================================


use catalog_importer::config::ImportSettings;
use catalog_importer::domain::{ImportJob, ImportState, LogAction, RowCommitPolicy, RowData, RowState};
use catalog_importer::importer::{ImportError, ProcessOptions};
use catalog_importer::repository::{CatalogRepository, CatalogTable, ImportRepository};
use std::sync::Arc;
use test_helpers::*;

fn customer_row(email: &str) -> RowData {
    vec![("email", email)].into_iter().collect()
}

// ==========================================
// 端到端场景
// ==========================================

#[tokio::test]
async fn test_import_customers_completes() {
    let env = TestEnv::new();
    let source = csv_source(CUSTOMERS_CSV);
    let mut job = env.create_job("customers", source.path()).await;

    let report = env
        .controller(ImportSettings::default())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state, ImportState::Completed);
    assert!(report.scanned);
    assert_eq!(report.rows_total, 2);
    assert_eq!(report.rows_completed, 2);
    assert_eq!(env.catalog.count(CatalogTable::Customer).await.unwrap(), 2);
    assert_eq!(env.catalog.count(CatalogTable::CustomerAddress).await.unwrap(), 1);
    assert_eq!(env.log_count(&job.id), 2);

    let stored = env.reload(&job.id).await;
    assert_eq!(stored.state, ImportState::Completed);
    assert!(stored.rows.iter().all(|r| r.state == RowState::Completed));

    let ada = env.catalog.find_customer_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(ada.accepts_marketing);
}

#[tokio::test]
async fn test_import_products_keeps_partial_entities_and_fails() {
    let env = TestEnv::new();
    env.seed_shipping_category("Default").await;
    let source = csv_source(PRODUCTS_CSV);
    let mut job = env.create_job("products", source.path()).await;

    let report = env
        .controller(ImportSettings::default())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state, ImportState::Failed);
    assert_eq!(report.rows_failed, 2);
    assert_eq!(env.catalog.count(CatalogTable::Product).await.unwrap(), 1);
    assert_eq!(env.catalog.count(CatalogTable::Variant).await.unwrap(), 3);
    assert_eq!(env.log_count(&job.id), 2);

    let stored = env.reload(&job.id).await;
    assert_eq!(stored.state, ImportState::Failed);
    assert!(stored.messages.is_none());
    let first = stored.rows[0].messages.as_deref().unwrap_or("");
    assert!(first.contains("shipping_category"), "unexpected message: {}", first);
    let second = stored.rows[1].messages.as_deref().unwrap_or("");
    assert!(second.contains("title"), "unexpected message: {}", second);
}

#[tokio::test]
async fn test_single_product_row_with_missing_shipping_category() {
    let env = TestEnv::new();
    let source = csv_source(TEE_PRODUCT_CSV);
    let mut job = env.create_job("products", source.path()).await;

    let report = env
        .controller(ImportSettings::default())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state, ImportState::Failed);
    assert_eq!(report.rows_total, 1);
    assert_eq!(report.rows_failed, 1);
    assert_eq!(env.catalog.count(CatalogTable::Product).await.unwrap(), 1);
    assert_eq!(env.catalog.count(CatalogTable::Variant).await.unwrap(), 3);
    assert_eq!(env.log_count(&job.id), 1);

    let stored = env.reload(&job.id).await;
    assert_eq!(stored.rows.len(), 1);
    let message = stored.rows[0].messages.as_deref().unwrap_or("");
    assert!(message.contains("shipping_category"), "unexpected message: {}", message);
}

#[tokio::test]
async fn test_import_orders_completes() {
    let env = TestEnv::new();
    env.seed_store("main").await;
    let source = csv_source(ORDERS_CSV);
    let mut job = env.create_job("orders", source.path()).await;

    let report = env
        .controller(ImportSettings::default())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state, ImportState::Completed);
    assert_eq!(env.catalog.count(CatalogTable::Order).await.unwrap(), 2);
    assert_eq!(env.log_count(&job.id), 2);
}

#[tokio::test]
async fn test_orders_use_default_store_and_line_items() {
    let env = TestEnv::new();
    env.seed_store("main").await;
    env.seed_shipping_category("Default").await;

    let products = csv_source("handle,title,price,variant_skus,shipping_category\ntee,Tee,15.00,TEE-S,Default\n");
    let mut product_job = env.create_job("products", products.path()).await;
    let controller = env.controller(ImportSettings::default().with_default_store("main"));
    controller
        .process(&mut product_job, ProcessOptions::default())
        .await
        .unwrap();

    let orders = csv_source("number,email,sku,quantity\nR200,ada@example.com,TEE-S,3\nR201,bob@example.com,NOPE,1\n");
    let mut order_job = env.create_job("order", orders.path()).await;
    let report = controller
        .process(&mut order_job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state, ImportState::Failed);
    assert_eq!(report.rows_completed, 1);
    let order = env.catalog.find_order_by_number("R200").await.unwrap().unwrap();
    assert_eq!(order.item_total_cents, 4500);

    // 分阶段提交: 明细失败时订单本身保留
    assert!(env.catalog.find_order_by_number("R201").await.unwrap().is_some());
    assert_eq!(env.catalog.count(CatalogTable::LineItem).await.unwrap(), 1);
}

// ==========================================
// 行跳过 / 重试 / 日志 / 扫描门控 / 汇总
// ==========================================

#[tokio::test]
async fn test_completed_rows_are_not_processed_again() {
    let env = TestEnv::new();
    let mut job = ImportJob::new("customers", "/nonexistent/customers.csv")
        .with_row(customer_row("a@example.com"))
        .with_row(customer_row("b@example.com"))
        .with_row(customer_row("c@example.com"));
    job.rows[0].state = RowState::Completed;
    env.import_repo.insert_job(&job).await.unwrap();

    let processor = Arc::new(CountingProcessor::default());
    let report = env
        .controller(ImportSettings::default())
        .with_row_processor(processor.clone())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(processor.count(), 2);
    assert!(!report.scanned);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(report.rows_visited, 2);
    assert_eq!(report.state, ImportState::Completed);
    assert_eq!(env.log_count(&job.id), 2);
}

#[tokio::test]
async fn test_failed_job_retries_only_unfinished_rows() {
    let env = TestEnv::new();
    env.seed_shipping_category("Default").await;
    let source = csv_source(PRODUCTS_CSV);
    let mut job = env.create_job("products", source.path()).await;
    let controller = env.controller(ImportSettings::default());

    controller.process(&mut job, ProcessOptions::default()).await.unwrap();
    assert_eq!(job.state, ImportState::Failed);

    // 补齐引用数据后重试
    env.seed_shipping_category("Oversized").await;
    let report = controller.process(&mut job, ProcessOptions::default()).await.unwrap();

    assert!(!report.scanned);
    assert_eq!(report.rows_visited, 2);
    assert_eq!(report.rows_completed, 1);
    assert_eq!(report.state, ImportState::Failed);
    assert_eq!(env.catalog.count(CatalogTable::Product).await.unwrap(), 1);
    assert_eq!(env.catalog.count(CatalogTable::Variant).await.unwrap(), 3);

    // 第三次: 只剩第二行被访问
    let report = controller.process(&mut job, ProcessOptions::default()).await.unwrap();
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(report.rows_visited, 1);

    // 每次访问恰好一条日志: 2 + 2 + 1
    assert_eq!(env.log_count(&job.id), 5);
}

#[tokio::test]
async fn test_scan_only_when_required_or_forced() {
    let env = TestEnv::new();
    let source = csv_source("email\nnot-an-email\n");
    let mut job = env.create_job("customers", source.path()).await;

    let reader = Arc::new(CountingReader::default());
    let controller = env
        .controller(ImportSettings::default())
        .with_row_reader(reader.clone());

    controller.process(&mut job, ProcessOptions::default()).await.unwrap();
    assert_eq!(reader.count(), 1);

    controller.process(&mut job, ProcessOptions::default()).await.unwrap();
    assert_eq!(reader.count(), 1);

    let report = controller.process(&mut job, ProcessOptions::force_scan()).await.unwrap();
    assert_eq!(reader.count(), 2);
    assert!(report.scanned);
}

#[tokio::test]
async fn test_job_state_is_aggregate_of_rows() {
    let env = TestEnv::new();
    let source = csv_source("email\nok@example.com\nbroken\n");
    let mut job = env.create_job("customers", source.path()).await;

    let report = env
        .controller(ImportSettings::default())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state, ImportState::Failed);
    assert_eq!(report.rows_completed, 1);
    assert_eq!(report.rows_failed, 1);

    let stored = env.reload(&job.id).await;
    assert_eq!(stored.rows[1].state, RowState::Failed);
    assert!(stored.rows[1].messages.as_deref().unwrap_or("").contains("email"));
}

#[tokio::test]
async fn test_empty_source_completes() {
    let env = TestEnv::new();
    let source = csv_source("email,first_name\n");
    let mut job = env.create_job("customers", source.path()).await;

    let report = env
        .controller(ImportSettings::default())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state, ImportState::Completed);
    assert_eq!(report.rows_total, 0);
    assert_eq!(env.log_count(&job.id), 0);
}

// ==========================================
// 提交策略 / 日志选项 / 守卫 / 强制重扫
// ==========================================

#[tokio::test]
async fn test_atomic_policy_rolls_back_failed_rows() {
    let env = TestEnv::new();
    env.seed_shipping_category("Default").await;
    let source = csv_source(PRODUCTS_CSV);
    let mut job = env.create_job("products", source.path()).await;

    let report = env
        .controller(ImportSettings::default().with_commit_policy(RowCommitPolicy::Atomic))
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state, ImportState::Failed);
    assert_eq!(env.catalog.count(CatalogTable::Product).await.unwrap(), 0);
    assert_eq!(env.catalog.count(CatalogTable::Variant).await.unwrap(), 0);
}

#[tokio::test]
async fn test_skipped_rows_logged_when_enabled() {
    let env = TestEnv::new();
    let source = csv_source("email\nok@example.com\nbroken\n");
    let mut job = env.create_job("customers", source.path()).await;
    let controller = env.controller(ImportSettings::default().with_log_skipped_rows(true));

    controller.process(&mut job, ProcessOptions::default()).await.unwrap();
    controller.process(&mut job, ProcessOptions::default()).await.unwrap();

    let entries = env.log_repo.find_by_import(&job.id).unwrap();
    assert_eq!(entries.len(), 4);
    let skipped: Vec<_> = entries.iter().filter(|e| e.action == LogAction::Skipped).collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].ordinal, 0);
}

#[tokio::test]
async fn test_completed_job_is_left_untouched() {
    let env = TestEnv::new();
    let source = csv_source(CUSTOMERS_CSV);
    let mut job = env.create_job("customers", source.path()).await;
    let reader = Arc::new(CountingReader::default());
    let processor = Arc::new(CountingProcessor::default());
    let controller = env
        .controller(ImportSettings::default())
        .with_row_reader(reader.clone())
        .with_row_processor(processor.clone());

    controller.process(&mut job, ProcessOptions::default()).await.unwrap();
    assert_eq!(job.state, ImportState::Completed);

    let report = controller.process(&mut job, ProcessOptions::force_scan()).await.unwrap();

    assert_eq!(report.state, ImportState::Completed);
    assert_eq!(report.rows_visited, 0);
    assert_eq!(reader.count(), 1);
    assert_eq!(processor.count(), 2);
    assert_eq!(env.log_count(&job.id), 2);
}

#[tokio::test]
async fn test_force_scan_keeps_unchanged_completed_rows() {
    let env = TestEnv::new();
    let source = csv_source("email,first_name\nok@example.com,Ok\nbroken,Broken\n");
    let mut job = env.create_job("customers", source.path()).await;
    let controller = env.controller(ImportSettings::default());

    controller.process(&mut job, ProcessOptions::default()).await.unwrap();
    assert_eq!(job.state, ImportState::Failed);
    let kept_id = job.rows[0].id.clone();

    rewrite_source(&source, "email,first_name\nok@example.com,Ok\nfixed@example.com,Fixed\n");
    let report = controller.process(&mut job, ProcessOptions::force_scan()).await.unwrap();

    assert!(report.scanned);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(report.rows_visited, 1);
    assert_eq!(report.state, ImportState::Completed);

    let stored = env.reload(&job.id).await;
    assert_eq!(stored.rows.len(), 2);
    assert_eq!(stored.rows[0].id, kept_id);
    assert_eq!(stored.rows[1].data.get("email"), Some("fixed@example.com"));
    assert_eq!(env.catalog.count(CatalogTable::Customer).await.unwrap(), 2);
}

#[tokio::test]
async fn test_log_sink_failure_does_not_abort() {
    let env = TestEnv::new();
    let source = csv_source(CUSTOMERS_CSV);
    let mut job = env.create_job("customers", source.path()).await;

    let report = env
        .controller_with_logger(ImportSettings::default(), Arc::new(FailingLogger))
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state, ImportState::Completed);
}

// ==========================================
// 结构性错误
// ==========================================

#[tokio::test]
async fn test_missing_required_column_fails_job() {
    let env = TestEnv::new();
    let source = csv_source("first_name\nAda\n");
    let mut job = env.create_job("customers", source.path()).await;

    let err = env
        .controller(ImportSettings::default())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::MissingColumns(ref cols) if cols == &vec!["email".to_string()]));
    let stored = env.reload(&job.id).await;
    assert_eq!(stored.state, ImportState::Failed);
    assert!(stored.messages.unwrap().contains("email"));
    assert!(stored.rows.is_empty());
    assert_eq!(env.log_count(&job.id), 0);
}

#[tokio::test]
async fn test_ragged_source_fails_job() {
    let env = TestEnv::new();
    let source = csv_source("email,first_name\na@example.com,Ada,extra\n");
    let mut job = env.create_job("customers", source.path()).await;

    let err = env
        .controller(ImportSettings::default())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::CsvParseError(_)));
    assert_eq!(env.reload(&job.id).await.state, ImportState::Failed);
    assert_eq!(env.catalog.count(CatalogTable::Customer).await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_source_file_fails_job() {
    let env = TestEnv::new();
    let mut job = env
        .create_job("customers", std::path::Path::new("/nonexistent/customers.csv"))
        .await;

    let err = env
        .controller(ImportSettings::default())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::FileNotFound(_)));
    assert_eq!(job.state, ImportState::Failed);
}

#[tokio::test]
async fn test_unsupported_kind_fails_before_rows() {
    let env = TestEnv::new();
    let source = csv_source(CUSTOMERS_CSV);
    let mut job = env.create_job("coupons", source.path()).await;
    let reader = Arc::new(CountingReader::default());

    let err = env
        .controller(ImportSettings::default())
        .with_row_reader(reader.clone())
        .process(&mut job, ProcessOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::UnsupportedKind(_)));
    assert_eq!(reader.count(), 0);
    let stored = env.reload(&job.id).await;
    assert_eq!(stored.state, ImportState::Failed);
    assert!(stored.rows.is_empty());
}

#[tokio::test]
async fn test_process_by_id() {
    let env = TestEnv::new();
    let source = csv_source(CUSTOMERS_CSV);
    let job = env.create_job("customers", source.path()).await;
    let controller = env.controller(ImportSettings::default());

    let report = controller
        .process_by_id(&job.id, ProcessOptions::default())
        .await
        .unwrap();
    assert_eq!(report.job_id, job.id);
    assert_eq!(report.state, ImportState::Completed);

    let err = controller
        .process_by_id("missing", ProcessOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::JobNotFound(_)));
}
