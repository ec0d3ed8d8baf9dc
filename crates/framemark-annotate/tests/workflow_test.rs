//! Navigation and submission against in-memory and file-backed stores.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;

use framemark_annotate::{render_view, AnnotationWorkflow, FormState, View};
use framemark_core::{
    AnnotationLedger, AnnotationRecord, Article, ArticleSource, Error, FrameSuggestion, Result,
    SessionRepository, SessionState, TaskConfig,
};
use framemark_store::{CsvDatasets, CsvLedger, FileSessionStore};

struct FixedArticles(Vec<Article>);

impl ArticleSource for FixedArticles {
    fn articles(&self, user_id: &str) -> Result<Vec<Article>> {
        if user_id == "stranger" {
            return Err(Error::NotFound(user_id.to_string()));
        }
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct MemorySessions {
    states: RefCell<HashMap<String, SessionState>>,
    saves: Cell<usize>,
}

impl SessionRepository for MemorySessions {
    fn load(&self, user_id: &str) -> Result<SessionState> {
        Ok(self
            .states
            .borrow()
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| SessionState::new(user_id)))
    }

    fn save(&self, user_id: &str, state: &SessionState) -> Result<()> {
        self.saves.set(self.saves.get() + 1);
        self.states
            .borrow_mut()
            .insert(user_id.to_string(), state.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryLedger {
    rows: RefCell<Vec<AnnotationRecord>>,
    fail: Cell<bool>,
}

impl AnnotationLedger for MemoryLedger {
    fn upsert(&self, record: &AnnotationRecord) -> Result<()> {
        if self.fail.get() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "share offline",
            )));
        }
        let mut rows = self.rows.borrow_mut();
        rows.retain(|r| r.key() != record.key());
        rows.push(record.clone());
        Ok(())
    }

    fn records(&self) -> Vec<AnnotationRecord> {
        self.rows.borrow().clone()
    }
}

fn articles(n: usize) -> Vec<Article> {
    (0..n)
        .map(|i| Article {
            index: i,
            uri: format!("https://example.org/{}", i),
            original_text: format!("Origineel {}", i),
            translated_text: format!("The minister took a kickback in case {}.", i),
            frames: vec![FrameSuggestion {
                number: 3,
                name: "Elite collusion".to_string(),
                evidence: "took a kickback".to_string(),
                rationale: "Minister and donor".to_string(),
                confidence: "80".to_string(),
            }],
            ..Default::default()
        })
        .collect()
}

type MemoryWorkflow = AnnotationWorkflow<FixedArticles, MemorySessions, MemoryLedger>;

fn workflow(n: usize) -> MemoryWorkflow {
    AnnotationWorkflow::new(
        TaskConfig::default(),
        FixedArticles(articles(n)),
        MemorySessions::default(),
        MemoryLedger::default(),
    )
}

fn form(config: &TaskConfig, primary: &str) -> FormState {
    let mut form = FormState::defaults(config).with_present_frames(&["Elite collusion"]);
    form.primary_label = primary.to_string();
    form
}

fn article_index(view: &View) -> Option<usize> {
    match view {
        View::Article(v) => Some(v.index),
        View::Completed(_) => None,
    }
}

#[test]
fn test_fresh_user_sees_first_article_with_defaults() {
    let wf = workflow(3);
    let view = wf.view("alice").unwrap();
    let View::Article(v) = view else {
        panic!("expected article view");
    };
    assert_eq!(v.position_text(), "Article 1 of 3");
    assert_eq!(v.form, FormState::defaults(wf.config()));
    assert!(!v.previously_annotated);
    assert!(v.highlighted_html.contains("data-tag=\"frame_3_evidence\""));
    assert_eq!(v.cards.len(), 1);
    assert!(v.cards[0].low_confidence);
}

#[test]
fn test_submit_advances_and_records() {
    let wf = workflow(3);
    let config = wf.config().clone();
    let view = wf.submit("alice", form(&config, "No")).unwrap();
    assert_eq!(article_index(&view), Some(1));

    let records = wf.ledger().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key(), ("alice", 0));
    assert_eq!(records[0].uri, "https://example.org/0");
    assert!(records[0].is_frame_present("Elite collusion"));
}

#[test]
fn test_failed_ledger_write_does_not_advance() {
    let wf = workflow(3);
    let config = wf.config().clone();
    wf.ledger().fail.set(true);

    assert!(wf.submit("alice", form(&config, "Yes")).is_err());
    assert_eq!(wf.status("alice").unwrap().current_index, 0);
    assert_eq!(wf.status("alice").unwrap().annotated, 0);
}

#[test]
fn test_resubmission_replaces_record() {
    let wf = workflow(3);
    let config = wf.config().clone();
    wf.submit("alice", form(&config, "Yes")).unwrap();
    let back = wf.previous("alice").unwrap();

    let View::Article(v) = back else {
        panic!("expected article view");
    };
    assert_eq!(v.index, 0);
    assert!(v.previously_annotated);
    assert_eq!(v.form.primary_label, "Yes");
    assert!(v.form.frames["Elite collusion"]);

    wf.submit("alice", form(&config, "No")).unwrap();
    let records = wf.ledger().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].primary_label, "No");
    assert_eq!(wf.status("alice").unwrap().annotated, 1);
}

#[test]
fn test_status_counts_ledger_rows_for_user() {
    let wf = workflow(3);
    let config = wf.config().clone();
    wf.ledger()
        .upsert(&AnnotationRecord {
            user_id: "bob".to_string(),
            article_index: 0,
            ..Default::default()
        })
        .unwrap();
    wf.ledger()
        .upsert(&AnnotationRecord {
            user_id: "alice".to_string(),
            article_index: 2,
            ..Default::default()
        })
        .unwrap();
    wf.submit("alice", form(&config, "Yes")).unwrap();

    let status = wf.status("alice").unwrap();
    assert_eq!(status.annotated, 1);
    // the row for article 2 exists only in the ledger
    assert_eq!(status.ledgered, 2);
    assert!(!status.completed);
}

#[test]
fn test_completion_and_back() {
    let wf = workflow(2);
    let config = wf.config().clone();
    wf.submit("alice", form(&config, "Yes")).unwrap();
    let done = wf.submit("alice", form(&config, "Yes")).unwrap();
    assert!(done.is_completed());
    assert!(render_view(&done).contains("2 of 2"));

    assert!(matches!(
        wf.submit("alice", form(&config, "Yes")),
        Err(Error::InvalidInput(_))
    ));

    let back = wf.back_from_completion("alice").unwrap();
    assert_eq!(article_index(&back), Some(1));
    assert!(matches!(
        wf.back_from_completion("alice"),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_previous_at_start_is_noop() {
    let wf = workflow(2);
    let view = wf.previous("alice").unwrap();
    assert_eq!(article_index(&view), Some(0));
    assert_eq!(wf.sessions().saves.get(), 0);
}

#[test]
fn test_jump_bounds() {
    let wf = workflow(5);
    assert_eq!(article_index(&wf.jump("alice", 4).unwrap()), Some(4));
    assert!(matches!(wf.jump("alice", 5), Err(Error::InvalidInput(_))));
    assert_eq!(wf.status("alice").unwrap().current_index, 4);
}

#[test]
fn test_invalid_form_rejected_before_any_write() {
    let wf = workflow(2);
    let config = wf.config().clone();
    assert!(matches!(
        wf.submit("alice", form(&config, "Perhaps")),
        Err(Error::InvalidInput(_))
    ));
    assert!(wf.ledger().records().is_empty());
}

#[test]
fn test_unknown_user_not_found() {
    let wf = workflow(2);
    assert!(matches!(wf.view("stranger"), Err(Error::NotFound(_))));
}

#[test]
fn test_file_backed_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("sample.csv");
    fs::write(
        &dataset,
        "uri,original_text,translated_text,frame_1_name,frame_1_evidence\n\
         u0,o0,Foreign money funded the campaign.,Foreign influence threat,Foreign money\n\
         u1,o1,Nothing to see.,,\n",
    )
    .unwrap();

    let mut config = TaskConfig {
        session_dir: dir.path().join("sessions"),
        ledger_path: dir.path().join("annotations_final.csv"),
        ..Default::default()
    };
    config.datasets.insert("alice".to_string(), dataset);

    let wf = AnnotationWorkflow::new(
        config.clone(),
        CsvDatasets::from_config(&config),
        FileSessionStore::from_config(&config),
        CsvLedger::from_config(&config),
    );

    let mut first = FormState::defaults(&config).with_present_frames(&["Foreign influence threat"]);
    first.notes = "clear case".to_string();
    wf.submit("alice", first).unwrap();

    // a new workflow over the same files resumes where the first stopped
    let resumed = AnnotationWorkflow::new(
        config.clone(),
        CsvDatasets::from_config(&config),
        FileSessionStore::from_config(&config),
        CsvLedger::from_config(&config),
    );
    assert_eq!(article_index(&resumed.view("alice").unwrap()), Some(1));
    let records = resumed.ledger().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].notes, "clear case");
    assert!(records[0].is_frame_present("Foreign influence threat"));
    assert!(dir.path().join("sessions/alice_session.json").exists());
    assert_eq!(resumed.status("alice").unwrap().ledgered, 1);
}

#[test]
fn test_session_from_earlier_tool_version_restores_form() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("sample.csv");
    fs::write(&dataset, "uri,translated_text\nu0,First.\nu1,Second.\n").unwrap();
    let sessions = dir.path().join("sessions");
    fs::create_dir(&sessions).unwrap();
    fs::write(
        sessions.join("Assia_session.json"),
        r#"{"user_id": "Assia", "current_index": 0, "annotations": [
            {"user_id": "Assia", "article_index": 0, "political_corruption": "No",
             "notes": NaN, "flagged": "True", "uri": NaN,
             "Elite collusion_present": "Present",
             "Foreign influence threat_present": "Not Present"}]}"#,
    )
    .unwrap();

    let mut config = TaskConfig {
        session_dir: sessions,
        ledger_path: dir.path().join("annotations_final.csv"),
        ..Default::default()
    };
    config.datasets.insert("Assia".to_string(), dataset);
    let wf = AnnotationWorkflow::new(
        config.clone(),
        CsvDatasets::from_config(&config),
        FileSessionStore::from_config(&config),
        CsvLedger::from_config(&config),
    );

    let View::Article(v) = wf.view("Assia").unwrap() else {
        panic!("expected article view");
    };
    assert!(v.previously_annotated);
    assert_eq!(v.form.primary_label, "No");
    assert!(v.form.frames["Elite collusion"]);
    assert!(!v.form.frames["Foreign influence threat"]);
    assert!(v.form.flagged);
}
