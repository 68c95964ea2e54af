//! Race behaviour of completion and numbering under concurrent requests

mod common;

use caseflow_core::{CaseService, CaseState, CaseflowError, StepState};
use common::*;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

const RACERS: usize = 16;

/// Fire `RACERS` identical completion requests for the same officer at once
async fn race_completions(
    service: &Arc<CaseService>,
    case_id: uuid::Uuid,
    officer: &Assignee,
) -> Vec<Result<caseflow_core::CompletionOutcome, CaseflowError>> {
    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let service = Arc::clone(service);
            let actor = officer.actor();
            tokio::spawn(async move {
                service
                    .complete_active_step(&actor, case_id, Some("retry".into()))
                    .await
            })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("completion task panicked"))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_completions_advance_once() {
    let service = Arc::new(in_memory_service());
    let (first, second) = (Assignee::new(), Assignee::new());
    let case = service
        .create_case(
            &clerk(),
            CaseRequestBuilder::new().with_route(&[first, second]).build(),
        )
        .await
        .unwrap();

    let results = race_completions(&service, case.case_id, &first).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| err.is_no_op()));

    let details = service.get_case(&clerk(), case.case_id).await.unwrap();
    let workflow = details.workflow.unwrap();
    assert_eq!(workflow.steps[0].status, StepState::Completed);
    assert_eq!(workflow.steps[1].status, StepState::InProgress);
    assert_eq!(details.case.current_step, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_completions_do_not_spill_into_same_officers_next_step() {
    let service = Arc::new(in_memory_service());
    let officer = Assignee::new();
    let next_desk = Assignee::with_officer(officer.officer_id);
    let case = service
        .create_case(
            &clerk(),
            CaseRequestBuilder::new()
                .with_route(&[officer, next_desk, Assignee::new()])
                .build(),
        )
        .await
        .unwrap();

    let results = race_completions(&service, case.case_id, &officer).await;

    // each request pins the step it first saw, so only step 1 closes even
    // though the same officer also owns step 2
    let completed_steps: Vec<u32> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|outcome| outcome.advancement.completed_step)
        .collect();
    let step_two_pinned = completed_steps.iter().filter(|n| **n == 2).count();

    let details = service.get_case(&clerk(), case.case_id).await.unwrap();
    let workflow = details.workflow.unwrap();
    let completed = workflow
        .steps
        .iter()
        .filter(|step| step.status == StepState::Completed)
        .count();

    // a racer that only started after step 1 committed legitimately sees
    // step 2 as its own active step; no single request closes two steps
    assert_eq!(completed, completed_steps.len());
    assert_eq!(completed_steps.iter().filter(|n| **n == 1).count(), 1);
    assert!(step_two_pinned <= 1);
    assert_eq!(
        workflow.active_step().map(|s| s.step_number),
        Some(1 + completed as u32)
    );
    assert_eq!(details.case.current_step, 1 + completed as u32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_final_step_race_completes_case_once() {
    let service = Arc::new(in_memory_service());
    let owner = Assignee::new();
    let case = service
        .create_case(&clerk(), CaseRequestBuilder::new().with_route(&[owner]).build())
        .await
        .unwrap();
    let mut receiver = service.event_publisher().subscribe();

    let results = race_completions(&service, case.case_id, &owner).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let mut case_completed_events = 0;
    while let Ok(event) = receiver.try_recv() {
        if event.name == caseflow_core::constants::events::CASE_COMPLETED {
            case_completed_events += 1;
        }
    }
    assert_eq!(case_completed_events, 1);

    let details = service.get_case(&clerk(), case.case_id).await.unwrap();
    assert_eq!(details.case.status, CaseState::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_assigns_unique_numbers() {
    let service = Arc::new(in_memory_service());

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .create_case(&clerk(), CaseRequestBuilder::new().build())
                    .await
            })
        })
        .collect();

    let numbers: HashSet<String> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("creation task panicked").unwrap().case_number)
        .collect();

    assert_eq!(numbers.len(), 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cases_progress_independently() {
    let service = Arc::new(in_memory_service());
    let mut routes = Vec::new();
    for _ in 0..8 {
        let route = [Assignee::new(), Assignee::new()];
        let case = service
            .create_case(&clerk(), CaseRequestBuilder::new().with_route(&route).build())
            .await
            .unwrap();
        routes.push((case.case_id, route));
    }

    let handles: Vec<_> = routes
        .iter()
        .map(|(case_id, route)| {
            let service = Arc::clone(&service);
            let (case_id, route) = (*case_id, *route);
            tokio::spawn(async move {
                for assignee in route {
                    service
                        .complete_active_step(&assignee.actor(), case_id, None)
                        .await?;
                }
                Ok::<_, CaseflowError>(())
            })
        })
        .collect();

    for joined in join_all(handles).await {
        joined.expect("case task panicked").unwrap();
    }

    for (case_id, _) in routes {
        let details = service.get_case(&clerk(), case_id).await.unwrap();
        assert_eq!(details.case.status, CaseState::Completed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_detail_reads_never_see_pointer_out_of_step() {
    const STEPS: usize = 300;

    let service = Arc::new(in_memory_service());
    let officer = Assignee::new();
    let route: Vec<Assignee> = (0..STEPS)
        .map(|_| Assignee::with_officer(officer.officer_id))
        .collect();
    let case = service
        .create_case(&clerk(), CaseRequestBuilder::new().with_route(&route).build())
        .await
        .unwrap();
    let case_id = case.case_id;

    let completer = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for _ in 0..STEPS {
                service
                    .complete_active_step(&officer.actor(), case_id, None)
                    .await?;
            }
            Ok::<_, CaseflowError>(())
        })
    };

    let reader = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let mut reads = 0usize;
            loop {
                let details = service.get_case(&clerk(), case_id).await.unwrap();
                let workflow = details.workflow.expect("workflow stored with case");
                reads += 1;
                match workflow.active_step() {
                    Some(active) => assert_eq!(active.step_number, details.case.current_step),
                    None => {
                        assert_eq!(details.case.status, CaseState::Completed);
                        return reads;
                    }
                }
                tokio::task::yield_now().await;
            }
        })
    };

    completer.await.expect("completer panicked").unwrap();
    let reads = reader.await.expect("reader saw a torn case/workflow pair");
    assert!(reads > 0);
}
