//! Full batch scenario against a mock Solr endpoint: the compiled binary
//! splits a concatenated GRANTS master file, converts both units, submits
//! both records, and records them in the directory ledger — then a re-run
//! does nothing but skip.

use assert_cmd::Command;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

fn grant_doc(number: &str, date: &str) -> String {
    format!(
        "{DECL}<us-patent-grant lang=\"EN\" file=\"US{number}-{date}.XML\">\n\
         <us-bibliographic-data-grant>\n\
         <publication-reference>\n\
         <document-id><country>US</country><doc-number>{number}</doc-number>\
         <kind>B2</kind><date>{date}</date></document-id>\n\
         </publication-reference>\n\
         </us-bibliographic-data-grant>\n\
         </us-patent-grant>\n"
    )
}

fn run_batch(files_root: &Path, solr_url: &str) {
    let files_root = files_root.to_path_buf();
    let solr_url = solr_url.to_string();
    Command::cargo_bin("patsolr")
        .unwrap()
        .args([
            "run",
            "-t",
            "g",
            "-d",
            "2016",
            "--files-root",
            files_root.to_str().unwrap(),
            "--solr-url",
            &solr_url,
        ])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_two_document_grants_batch_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/solr/grants/update"))
        .and(body_partial_json(json!({
            "add": {"boost": 1.0, "overwrite": true, "commitWithin": 1000}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"responseHeader": {"status": 0}})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let year_dir = dir.path().join("GRANTS/2016");
    fs::create_dir_all(&year_dir).unwrap();
    let master = [
        grant_doc("08888881", "20160105"),
        grant_doc("08888882", "20160105"),
    ]
    .concat();
    fs::write(year_dir.join("ipg160105.xml"), master).unwrap();

    let files_root = dir.path().to_path_buf();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || run_batch(&files_root, &uri))
        .await
        .unwrap();

    // Both units split, both converted with normalized fields
    let unit_dir = year_dir.join("ipg160105");
    for (key, number) in [
        ("US08888881-20160105", "08888881"),
        ("US08888882-20160105", "08888882"),
    ] {
        assert!(unit_dir.join(format!("{key}.XML")).exists());
        let converted: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(unit_dir.join(format!("{key}.json"))).unwrap())
                .unwrap();
        let doc_id = converted
            .pointer("/us-patent-grant/us-bibliographic-data-grant/publication-reference/document-id")
            .unwrap();
        assert_eq!(doc_id["appid"], json!(number));
        assert_eq!(doc_id["doc_date"], json!("2016-01-05T00:00:00Z"));
        assert!(doc_id.get("doc-number").is_none());
        assert!(doc_id.get("date").is_none());
    }

    // Ledger contains exactly the two keys, in submission order
    let ledger = fs::read_to_string(unit_dir.join("solrcomplete.txt")).unwrap();
    assert_eq!(ledger, "08888881\n08888882\n");

    // Re-run: the mock's expect(2) fails the test if the endpoint is hit
    // again, and the ledger is unchanged
    let files_root = dir.path().to_path_buf();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || run_batch(&files_root, &uri))
        .await
        .unwrap();
    let ledger_after = fs::read_to_string(unit_dir.join("solrcomplete.txt")).unwrap();
    assert_eq!(ledger_after, "08888881\n08888882\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_index_failure_is_retried_on_next_run() {
    let server = MockServer::start().await;
    // First run: Solr reports a non-zero status
    let failing = Mock::given(method("POST"))
        .and(path("/solr/grants/update"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                json!({"responseHeader": {"status": 1}, "error": {"msg": "schema mismatch"}}),
            ),
        )
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let dir = tempdir().unwrap();
    let year_dir = dir.path().join("GRANTS/2016");
    fs::create_dir_all(&year_dir).unwrap();
    fs::write(
        year_dir.join("ipg160105.xml"),
        grant_doc("08888881", "20160105"),
    )
    .unwrap();

    let files_root = dir.path().to_path_buf();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || run_batch(&files_root, &uri))
        .await
        .unwrap();

    // Failure left no ledger entry behind
    let ledger_path = year_dir.join("ipg160105/solrcomplete.txt");
    assert!(!ledger_path.exists() || fs::read_to_string(&ledger_path).unwrap().is_empty());
    drop(failing);

    // Second run: Solr is healthy again and the same document is retried
    Mock::given(method("POST"))
        .and(path("/solr/grants/update"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"responseHeader": {"status": 0}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let files_root = dir.path().to_path_buf();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || run_batch(&files_root, &uri))
        .await
        .unwrap();
    assert_eq!(
        fs::read_to_string(&ledger_path).unwrap(),
        "08888881\n"
    );
}
