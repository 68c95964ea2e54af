//! PostgreSQL case store tests. Each test gets an isolated database from
//! `#[sqlx::test]`; run with `DATABASE_URL` set and `--ignored`.

mod common;

use caseflow_core::{
    CaseQuery, CaseService, CaseState, CaseStore, CaseflowConfig, CaseflowError, NewDocument,
    PgCaseStore, SequenceSource, StepState,
};
use common::*;
use sqlx::PgPool;
use std::sync::Arc;

fn service(pool: PgPool) -> (Arc<PgCaseStore>, CaseService) {
    let store = Arc::new(PgCaseStore::new(pool));
    let service = CaseService::new(store.clone(), store.clone(), &CaseflowConfig::default());
    (store, service)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL via DATABASE_URL"]
async fn test_sequence_advances(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgCaseStore::new(pool);

    let first = store.next_value().await?;
    let second = store.next_value().await?;

    assert_eq!(second, first + 1);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL via DATABASE_URL"]
async fn test_lifecycle_round_trip(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let (_, service) = service(pool);
    let (first, second) = (Assignee::new(), Assignee::new());

    let case = service
        .create_case(
            &clerk(),
            CaseRequestBuilder::new().with_route(&[first, second]).build(),
        )
        .await?;

    service
        .attach_document(
            &clerk(),
            case.case_id,
            NewDocument::new("s3://case-docs/survey.pdf", "application/pdf"),
        )
        .await?;
    service
        .complete_active_step(&first.actor(), case.case_id, Some("surveyed".into()))
        .await?;
    service
        .complete_active_step(&second.actor(), case.case_id, None)
        .await?;

    let details = service.get_case(&clerk(), case.case_id).await?;
    let workflow = details.workflow.expect("workflow stored with case");

    assert_eq!(details.case.status, CaseState::Completed);
    assert_eq!(details.case.current_step, 2);
    assert_eq!(details.case.documents.len(), 1);
    assert_eq!(workflow.steps[0].notes.as_deref(), Some("surveyed"));
    assert!(workflow
        .steps
        .iter()
        .all(|step| step.status == StepState::Completed));
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL via DATABASE_URL"]
async fn test_stale_commit_rejected(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let (store, service) = service(pool);
    let case = service
        .create_case(
            &clerk(),
            CaseRequestBuilder::new().with_route(&[Assignee::new()]).build(),
        )
        .await?;

    let mut winner = store.load_unit(case.case_id).await?.expect("unit");
    let mut loser = winner.clone();

    winner.case.status = CaseState::Archived;
    assert!(store.commit_unit(&winner).await?);

    loser.case.status = CaseState::InProgress;
    assert!(!store.commit_unit(&loser).await?);

    let stored = store.find_case(case.case_id).await?.expect("case");
    assert_eq!(stored.status, CaseState::Archived);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL via DATABASE_URL"]
async fn test_duplicate_case_number_rejected(
    pool: PgPool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (store, service) = service(pool);
    let case = service
        .create_case(&clerk(), CaseRequestBuilder::new().build())
        .await?;

    let mut copy = case.clone();
    copy.case_id = uuid::Uuid::new_v4();
    let err = store.insert_case(&copy, None).await.unwrap_err();

    assert_eq!(err, CaseflowError::DuplicateCaseNumber(case.case_number));
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL via DATABASE_URL"]
async fn test_listing_filters(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let (_, service) = service(pool);
    let audit = Assignee::new();

    service
        .create_case(
            &clerk(),
            CaseRequestBuilder::new()
                .with_title("Audit 100%_match")
                .with_route(&[audit])
                .build(),
        )
        .await?;
    service
        .create_case(&clerk(), CaseRequestBuilder::new().with_title("Audit other").build())
        .await?;

    let by_department = service
        .list_cases(
            &clerk(),
            CaseQuery {
                department_id: Some(audit.department_id),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(by_department.total, 1);

    // LIKE metacharacters in the search text match literally
    let literal = service
        .list_cases(
            &clerk(),
            CaseQuery {
                search: Some("100%_".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(literal.total, 1);

    let all = service
        .list_cases(
            &clerk(),
            CaseQuery {
                search: Some("AUDIT".into()),
                limit: 1,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(all.total, 2);
    assert_eq!(all.total_pages, 2);
    assert_eq!(all.cases.len(), 1);
    assert_eq!(all.cases[0].title, "Audit other");
    Ok(())
}
