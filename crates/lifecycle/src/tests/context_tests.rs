use super::*;
use crate::{
    grid::MemoryGrid,
    test_support::{cell, fixture_grid, BackendCall, FakeBackend, FIRST_OP, JOB_CARD_ID, OPERATOR},
};

fn resolver(grid: MemoryGrid, backend: Arc<FakeBackend>) -> OperationContextResolver {
    OperationContextResolver::new(Arc::new(grid), backend)
}

#[test]
fn job_card_id_requires_hyperlink_formula() {
    assert_eq!(
        job_card_id_from_formula("=HYPERLINK(\"https://x/spreadsheets/d/ab_C-9/edit\"; \"JC\")")
            .as_deref(),
        Some("ab_C-9")
    );
    assert_eq!(job_card_id_from_formula("https://x/spreadsheets/d/abc/edit"), None);
    assert_eq!(job_card_id_from_formula("=HYPERLINK(\"https://x/edit\")"), None);
    assert_eq!(job_card_id_from_formula("=HYPERLINK(\"https://x/d/\")"), None);
}

#[tokio::test]
async fn resolves_row_context_with_enrichment() {
    let backend = FakeBackend::new();
    backend.with_times("123_ABC", Some("2024-05-13T08:00"), None);
    let context = resolver(fixture_grid(OPERATOR), backend.clone())
        .resolve(Some(cell(2, FIRST_OP)), true, None)
        .await
        .expect("context");

    assert_eq!(context.email, OPERATOR);
    assert_eq!(context.cell, Some(cell(2, FIRST_OP)));
    assert_eq!(context.project.as_deref(), Some("PRJ-1"));
    assert_eq!(context.job_card_name.as_deref(), Some("JC-1"));
    assert_eq!(context.job_card_code.as_deref(), Some(JOB_CARD_ID));
    assert_eq!(context.operation.as_deref(), Some("123_ABC"));
    assert_eq!(
        context.start_date_time.as_ref().map(|t| t.as_str()),
        Some("2024-05-13T08:00")
    );
    assert!(context.end_date_time.is_none());
    assert_eq!(
        backend.calls(),
        vec![BackendCall::Lookup(JOB_CARD_ID.into(), "123_ABC".into())]
    );
}

#[tokio::test]
async fn skips_lookup_without_enrichment() {
    let backend = FakeBackend::new();
    let context = resolver(fixture_grid(OPERATOR), backend.clone())
        .resolve(Some(cell(2, FIRST_OP)), false, None)
        .await
        .expect("context");

    assert_eq!(context.operation.as_deref(), Some("123_ABC"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn override_column_replaces_active_column() {
    let backend = FakeBackend::new();
    let context = resolver(fixture_grid(OPERATOR), backend)
        .resolve(Some(cell(2, 7)), false, Some(8))
        .await
        .expect("context");
    assert_eq!(context.operation.as_deref(), Some("PPK"));
    assert_eq!(context.cell, Some(cell(2, 8)));
}

#[tokio::test]
async fn missing_coordinate_only_carries_email() {
    let context = resolver(fixture_grid(OPERATOR), FakeBackend::new())
        .resolve(None, true, None)
        .await
        .expect("context");
    assert_eq!(
        context,
        OperationContext {
            email: OPERATOR.into(),
            ..Default::default()
        }
    );
}

#[tokio::test]
async fn lookup_failure_leaves_fields_unset() {
    let backend = FakeBackend::new();
    backend.fail_lookups();
    let context = resolver(fixture_grid(OPERATOR), backend)
        .resolve(Some(cell(2, FIRST_OP)), true, None)
        .await
        .expect("enrichment errors are swallowed");

    assert_eq!(context.job_card_code.as_deref(), Some(JOB_CARD_ID));
    assert!(context.start_date_time.is_none());
    assert!(context.end_date_time.is_none());
    assert!(context.comment.is_none());
}

#[tokio::test]
async fn headers_are_optional_and_exact() {
    let grid = MemoryGrid::new("master", OPERATOR)
        .with_rows(vec![vec!["Project", "operations"], vec!["PRJ-1", "123_ABC"]]);
    let backend = FakeBackend::new();
    let context = resolver(grid, backend.clone())
        .resolve(Some(cell(2, 2)), true, None)
        .await
        .expect("context");

    assert!(context.project.is_none());
    assert!(context.job_card_name.is_none());
    assert!(context.job_card_code.is_none());
    assert_eq!(context.operation.as_deref(), Some("123_ABC"));
    assert!(backend.calls().is_empty(), "no id means no lookup");
}

#[tokio::test]
async fn invalid_codes_are_resolved_verbatim() {
    let grid = fixture_grid(OPERATOR);
    grid.set_value(cell(2, FIRST_OP), "12_abc").await.expect("write");
    let context = resolver(grid, FakeBackend::new())
        .resolve(Some(cell(2, FIRST_OP)), false, None)
        .await
        .expect("context");
    assert_eq!(context.operation.as_deref(), Some("12_abc"));
}
