mod common;

use common::{FakeBackend, FakeProvider, PageBehavior, orchestrator};
use research_harvest::{
    ResearchRequest, ResearchService, ResearchStatus, ResponsePayload, SearchBackend,
    SearchRequest, SearchSource,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

const WIKI_A: &str = "https://en.wikipedia.org/wiki/Machine_learning";
const SHARED: &str = "https://www.ibm.com/topics/machine-learning";
const DDG_B: &str = "https://developers.google.com/machine-learning/crash-course";

const BODY: &str = "Machine learning is a field of study in artificial intelligence";

fn backends(wiki: &[&str], ddg: &[&str]) -> Vec<Arc<dyn SearchBackend>> {
    let wikipedia: Arc<dyn SearchBackend> = FakeBackend::returning(SearchSource::Wikipedia, wiki);
    let duckduckgo: Arc<dyn SearchBackend> = FakeBackend::returning(SearchSource::DuckDuckGo, ddg);
    vec![wikipedia, duckduckgo]
}

fn request(query: &str, budget: usize) -> SearchRequest {
    SearchRequest::new(query, "req-1", budget)
}

fn source_urls(result: &research_harvest::SearchResult) -> Vec<&str> {
    result.sources.iter().map(|s| s.url.as_str()).collect()
}

#[tokio::test]
async fn overlapping_backends_merge_and_harvest_each_url_once() {
    let provider = FakeProvider::new(PageBehavior::loads(BODY))
        .with(WIKI_A, PageBehavior::loads_after(BODY, Duration::from_millis(60)))
        .with(SHARED, PageBehavior::loads_after(BODY, Duration::from_millis(30)));
    let (orchestrator, counters) = orchestrator(
        backends(&[WIKI_A, SHARED], &[SHARED, DDG_B]),
        provider,
        Duration::from_secs(5),
    );

    let result = orchestrator
        .run(request("machine learning fundamentals", 3))
        .await;

    assert_eq!(result.status, ResearchStatus::Completed);
    assert!(result.completed_at.is_some());
    // Reported in discovery order even though the pages finished in reverse
    assert_eq!(source_urls(&result), vec![WIKI_A, SHARED, DDG_B]);

    let mut opened = counters.opened_urls();
    opened.sort();
    let mut expected = vec![WIKI_A.to_string(), SHARED.to_string(), DDG_B.to_string()];
    expected.sort();
    assert_eq!(opened, expected);
    assert_eq!(counters.closed(), 3);
}

#[tokio::test]
async fn page_budget_caps_harvests_and_sources() {
    let (orchestrator, counters) = orchestrator(
        backends(
            &["https://a.example/", "https://b.example/", "https://c.example/"],
            &["https://d.example/", "https://e.example/"],
        ),
        FakeProvider::new(PageBehavior::loads(BODY)),
        Duration::from_secs(5),
    );

    let result = orchestrator.run(request("rust", 2)).await;

    assert_eq!(source_urls(&result), vec!["https://a.example/", "https://b.example/"]);
    assert_eq!(counters.opened(), 2);
    assert_eq!(counters.closed(), 2);
}

#[tokio::test]
async fn failed_harvests_leave_fewer_sources_but_run_completes() {
    let hangs = "https://slow.example/";
    let broken = "https://broken.example/";
    let provider = FakeProvider::new(PageBehavior::loads(BODY))
        .with(hangs, PageBehavior::Hangs)
        .with(broken, PageBehavior::NavigationFails);
    let (orchestrator, counters) = orchestrator(
        backends(&[WIKI_A, hangs], &[broken]),
        provider,
        Duration::from_millis(100),
    );

    let result = orchestrator.run(request("rust", 3)).await;

    assert_eq!(result.status, ResearchStatus::Completed);
    assert_eq!(source_urls(&result), vec![WIKI_A]);
    assert_eq!(counters.opened(), 3);
    assert_eq!(counters.closed(), 3);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(counters.cancelled(), 1);
}

#[tokio::test]
async fn open_failure_is_contained_and_nothing_leaks() {
    let crashes = "https://crash.example/";
    let provider =
        FakeProvider::new(PageBehavior::loads(BODY)).with(crashes, PageBehavior::OpenFails);
    let (orchestrator, counters) = orchestrator(
        backends(&[crashes], &[DDG_B]),
        provider,
        Duration::from_secs(5),
    );

    let result = orchestrator.run(request("rust", 3)).await;

    assert_eq!(result.status, ResearchStatus::Completed);
    assert_eq!(source_urls(&result), vec![DDG_B]);
    assert_eq!(counters.opened(), counters.closed());
    assert_eq!(counters.opened(), 2);
}

#[tokio::test]
async fn sources_carry_consistent_word_counts() {
    let (orchestrator, _) = orchestrator(
        backends(&[WIKI_A], &[DDG_B]),
        FakeProvider::new(PageBehavior::loads("  Hello\n\nworld  \t!  ")),
        Duration::from_secs(5),
    );

    let result = orchestrator.run(request("hello", 3)).await;

    assert_eq!(result.sources.len(), 2);
    for source in &result.sources {
        assert_eq!(source.content, "Hello world !");
        assert_eq!(source.word_count, 3);
        assert_eq!(source.word_count, source.content.split_whitespace().count());
        assert!(source.title.starts_with("Page at "));
    }
}

#[tokio::test]
async fn no_candidates_is_a_completed_empty_run() {
    let (orchestrator, counters) = orchestrator(
        backends(&[], &[]),
        FakeProvider::new(PageBehavior::loads(BODY)),
        Duration::from_secs(5),
    );

    let result = orchestrator.run(request("zxqv nothing", 3)).await;

    assert_eq!(result.status, ResearchStatus::Completed);
    assert!(result.sources.is_empty());
    assert_eq!(counters.opened(), 0);
}

#[tokio::test]
async fn one_unreachable_backend_is_tolerated() {
    let wikipedia: Arc<dyn SearchBackend> = FakeBackend::unreachable(SearchSource::Wikipedia);
    let duckduckgo: Arc<dyn SearchBackend> =
        FakeBackend::returning(SearchSource::DuckDuckGo, &[DDG_B]);
    let (orchestrator, _) = orchestrator(
        vec![wikipedia, duckduckgo],
        FakeProvider::new(PageBehavior::loads(BODY)),
        Duration::from_secs(5),
    );

    let result = orchestrator.run(request("rust", 3)).await;

    assert_eq!(result.status, ResearchStatus::Completed);
    assert_eq!(source_urls(&result), vec![DDG_B]);
}

#[tokio::test]
async fn all_backends_unreachable_fails_the_run() {
    let wiki = FakeBackend::unreachable(SearchSource::Wikipedia);
    let ddg = FakeBackend::unreachable(SearchSource::DuckDuckGo);
    let wiki_dyn: Arc<dyn SearchBackend> = wiki.clone();
    let ddg_dyn: Arc<dyn SearchBackend> = ddg.clone();
    let (orchestrator, counters) = orchestrator(
        vec![wiki_dyn, ddg_dyn],
        FakeProvider::new(PageBehavior::loads(BODY)),
        Duration::from_secs(5),
    );

    let result = orchestrator.run(request("rust", 3)).await;

    assert_eq!(result.status, ResearchStatus::Failed);
    assert!(result.error.is_some());
    assert_eq!(wiki.calls.load(Ordering::SeqCst), 1);
    assert_eq!(ddg.calls.load(Ordering::SeqCst), 1);
    assert_eq!(counters.opened(), 0);
}

#[tokio::test]
async fn runs_are_stored_for_polling() {
    let (orchestrator, _) = orchestrator(
        backends(&[WIKI_A], &[]),
        FakeProvider::new(PageBehavior::loads(BODY)),
        Duration::from_secs(5),
    );

    let result = orchestrator.run(request("rust", 3)).await;
    let stored = orchestrator.store().snapshot("req-1").await.unwrap();

    assert_eq!(stored.status, ResearchStatus::Completed);
    assert_eq!(stored.sources, result.sources);
}

mod service {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn service(
        wiki: &[&str],
        ddg: &[&str],
        provider: FakeProvider,
    ) -> (ResearchService, Arc<common::Counters>) {
        let (orchestrator, counters) =
            orchestrator(backends(wiki, ddg), provider, Duration::from_secs(5));
        (ResearchService::new(Arc::new(orchestrator), 3), counters)
    }

    #[tokio::test]
    async fn search_and_extract_reports_sources() {
        let (service, _) = service(
            &[WIKI_A, SHARED],
            &[SHARED, DDG_B],
            FakeProvider::new(PageBehavior::loads(BODY)),
        );

        let response = service
            .handle_json(
                r#"{"type":"SEARCH_AND_EXTRACT","query":"machine learning","requestId":"abc"}"#,
            )
            .await;

        assert!(response.success);
        assert_eq!(response.request_id, "abc");
        assert_eq!(response.result_count, Some(3));
        assert!(response.error.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"]["status"], "completed");
        assert_eq!(json["results"]["sources"][0]["url"], WIKI_A);
        assert!(json["results"]["sources"][0]["wordCount"].is_u64());
    }

    #[tokio::test]
    async fn zero_results_is_still_success() {
        let (service, _) = service(&[], &[], FakeProvider::new(PageBehavior::loads(BODY)));

        let response = service
            .handle(ResearchRequest::SearchAndExtract {
                query: "nothing matches".to_string(),
                request_id: "r0".to_string(),
                page_budget: None,
            })
            .await;

        assert!(response.success);
        assert_eq!(response.result_count, Some(0));
    }

    #[tokio::test]
    async fn search_only_returns_provenance_without_harvesting() {
        let (service, counters) = service(
            &[WIKI_A, SHARED],
            &[SHARED, DDG_B],
            FakeProvider::new(PageBehavior::loads(BODY)),
        );

        let response = service
            .handle(ResearchRequest::SearchOnly {
                query: "machine learning".to_string(),
                request_id: "d1".to_string(),
                page_budget: None,
            })
            .await;

        assert!(response.success);
        assert_eq!(counters.opened(), 0);
        let Some(ResponsePayload::Candidates(candidates)) = response.results.clone() else {
            panic!("expected candidate list");
        };
        let labels: Vec<_> = candidates
            .iter()
            .map(|c| (c.url.as_str(), c.source.label()))
            .collect();
        assert_eq!(
            labels,
            vec![
                (WIKI_A, "wikipedia"),
                (SHARED, "wikipedia"),
                (DDG_B, "duckduckgo")
            ]
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"][2]["source"], "duckduckgo");
    }

    #[tokio::test]
    async fn extract_urls_dedups_and_skips_discovery() {
        let (service, counters) = service(&[], &[], FakeProvider::new(PageBehavior::loads(BODY)));

        let response = service
            .handle(ResearchRequest::ExtractUrls {
                urls: vec![WIKI_A.to_string(), DDG_B.to_string(), WIKI_A.to_string()],
                request_id: "x1".to_string(),
            })
            .await;

        assert!(response.success);
        assert_eq!(response.result_count, Some(2));
        assert_eq!(counters.opened(), 2);
        assert_eq!(counters.closed(), 2);
    }

    #[tokio::test]
    async fn get_result_reads_the_store() {
        let (service, _) = service(&[WIKI_A], &[], FakeProvider::new(PageBehavior::loads(BODY)));

        service
            .handle(ResearchRequest::SearchAndExtract {
                query: "rust".to_string(),
                request_id: "g1".to_string(),
                page_budget: Some(1),
            })
            .await;

        let found = service
            .handle_json(r#"{"type":"GET_RESULT","requestId":"g1"}"#)
            .await;
        assert!(found.success);
        assert_eq!(found.result_count, Some(1));

        let missing = service
            .handle(ResearchRequest::GetResult {
                request_id: "nope".to_string(),
            })
            .await;
        assert!(!missing.success);
        assert_eq!(missing.request_id, "nope");
        assert!(missing.error.is_some());
    }

    #[tokio::test]
    async fn invalid_requests_fail_without_side_effects() {
        let (service, counters) =
            service(&[WIKI_A], &[], FakeProvider::new(PageBehavior::loads(BODY)));

        let empty_query = service
            .handle(ResearchRequest::SearchAndExtract {
                query: "   ".to_string(),
                request_id: "v1".to_string(),
                page_budget: None,
            })
            .await;
        assert!(!empty_query.success);

        let zero_budget = service
            .handle(ResearchRequest::SearchOnly {
                query: "rust".to_string(),
                request_id: "v2".to_string(),
                page_budget: Some(0),
            })
            .await;
        assert!(!zero_budget.success);

        let bad_url = service
            .handle(ResearchRequest::ExtractUrls {
                urls: vec![WIKI_A.to_string(), "javascript:alert(1)".to_string()],
                request_id: "v3".to_string(),
            })
            .await;
        assert!(!bad_url.success);

        let malformed = service.handle_json("{not json").await;
        assert!(!malformed.success);

        let unknown = service
            .handle_json(r#"{"type":"CRAWL","requestId":"v4"}"#)
            .await;
        assert!(!unknown.success);
        assert_eq!(unknown.request_id, "v4");

        assert_eq!(counters.opened(), 0);
    }

    #[tokio::test]
    async fn oversized_page_budget_is_rejected() {
        let (service, counters) = service(
            &[WIKI_A, SHARED],
            &[DDG_B],
            FakeProvider::new(PageBehavior::loads(BODY)),
        );

        for kind in ["SEARCH_ONLY", "SEARCH_AND_EXTRACT"] {
            let response = service
                .handle_json(&format!(
                    r#"{{"type":"{kind}","query":"rust","requestId":"big","pageBudget":18446744073709551615}}"#
                ))
                .await;
            assert!(!response.success, "{kind}");
            assert_eq!(response.request_id, "big");
            assert!(response.error.unwrap().contains("pageBudget"));
        }

        let largest = service
            .handle(ResearchRequest::SearchOnly {
                query: "rust".to_string(),
                request_id: "max".to_string(),
                page_budget: Some(20),
            })
            .await;
        assert!(largest.success);
        assert_eq!(largest.result_count, Some(3));

        assert_eq!(counters.opened(), 0);
    }

    #[tokio::test]
    async fn serve_answers_get_result_while_run_is_in_flight() {
        let (service, counters) = service(
            &[WIKI_A],
            &[],
            FakeProvider::new(PageBehavior::loads_after(BODY, Duration::from_millis(500))),
        );

        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let serving = tokio::spawn({
            let service = service.clone();
            async move { service.serve(BufReader::new(server_read), server_write).await }
        });

        let (client_read, mut client_write) = tokio::io::split(client);
        let mut replies = BufReader::new(client_read).lines();

        client_write
            .write_all(b"{\"type\":\"SEARCH_AND_EXTRACT\",\"query\":\"ml\",\"requestId\":\"live\"}\n")
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while counters.opened() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        client_write
            .write_all(b"{\"type\":\"GET_RESULT\",\"requestId\":\"live\"}\n")
            .await
            .unwrap();

        let line = replies.next_line().await.unwrap().unwrap();
        let polled: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(polled["requestId"], "live");
        assert_eq!(polled["results"]["status"], "processing");
        assert_eq!(polled["resultCount"], 0);

        let line = replies.next_line().await.unwrap().unwrap();
        let finished: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(finished["results"]["status"], "completed");
        assert_eq!(finished["resultCount"], 1);

        client_write.shutdown().await.unwrap();
        serving.await.unwrap().unwrap();
        assert!(replies.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreachable_backends_report_failure() {
        let wikipedia: Arc<dyn SearchBackend> = FakeBackend::unreachable(SearchSource::Wikipedia);
        let duckduckgo: Arc<dyn SearchBackend> =
            FakeBackend::unreachable(SearchSource::DuckDuckGo);
        let (orchestrator, _) = orchestrator(
            vec![wikipedia, duckduckgo],
            FakeProvider::new(PageBehavior::loads(BODY)),
            Duration::from_secs(5),
        );
        let service = ResearchService::new(Arc::new(orchestrator), 3);

        let extract = service
            .handle(ResearchRequest::SearchAndExtract {
                query: "rust".to_string(),
                request_id: "u1".to_string(),
                page_budget: None,
            })
            .await;
        assert!(!extract.success);
        assert!(extract.error.is_some());

        let discover = service
            .handle(ResearchRequest::SearchOnly {
                query: "rust".to_string(),
                request_id: "u2".to_string(),
                page_budget: None,
            })
            .await;
        assert!(!discover.success);
    }
}
