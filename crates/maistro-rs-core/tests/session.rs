//! Artist session tests: config-driven open, compose, generate, publish.

use maistro_rs_config::{ArtistConfig, ContextConfig, MaistroConfig};
use maistro_rs_core::{ArtistSession, CoreError, GenerationTask, persona_block};
use maistro_rs_memory::RecordKind;
use maistro_rs_protocol::{BlockRole, BudgetUnit, CollaboratorError};
use maistro_rs_test_utils::{
    FailingGenerator, FixedGenerator, RecordingGenerator, RecordingPublisher, RejectingPublisher,
    feedback, song, write_persona_dir,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn config(budget: usize) -> MaistroConfig {
    MaistroConfig::builder()
        .artist(ArtistConfig {
            name: None,
            persona_path: Some("artists/nova".into()),
        })
        .context(ContextConfig {
            budget,
            unit: BudgetUnit::Chars,
        })
        .build()
}

fn open(base: &Path, budget: usize) -> ArtistSession {
    write_persona_dir(&base.join("artists/nova"), "Nova");
    ArtistSession::open(&config(budget), base).expect("session")
}

fn seed(session: &ArtistSession) {
    let memory = session.memory();
    memory
        .ingest(song("Porch Light", "folk-pop", "love songs on the porch at dusk", 0))
        .expect("song");
    memory
        .ingest(song("Velvet", "pop/r&b", "velvet love in a slow jam", 1))
        .expect("song");
    memory
        .ingest(feedback("Velvet", "fan mail", "the love in velvet feels honest", 2))
        .expect("feedback");
}

#[test]
fn open_loads_persona_and_persists_memory() {
    let temp = tempdir().expect("tempdir");
    {
        let session = open(temp.path(), 6000);
        assert_eq!(session.persona().name, "Nova");
        assert_eq!(session.budget().limit, 6000);
        seed(&session);
    }
    let session = open(temp.path(), 6000);
    assert_eq!(session.memory().store().len(), 3);
    assert!(temp.path().join(".maistro/memory").is_dir());
}

#[test]
fn artist_name_overrides_persona_name() {
    let temp = tempdir().expect("tempdir");
    write_persona_dir(&temp.path().join("artists/nova"), "Nova");
    let mut config = config(6000);
    config.artist.name = Some("Nova Lux".to_string());
    let session = ArtistSession::open(&config, temp.path()).expect("session");
    assert_eq!(session.persona().name, "Nova Lux");
}

#[test]
fn open_without_persona_path_fails() {
    let temp = tempdir().expect("tempdir");
    match ArtistSession::open(&MaistroConfig::default(), temp.path()) {
        Err(err) => assert!(matches!(err, CoreError::Persona(_))),
        Ok(_) => panic!("session opened without a persona path"),
    }
}

#[test]
fn compose_orders_persona_task_then_records() {
    let temp = tempdir().expect("tempdir");
    let session = open(temp.path(), 6000);
    seed(&session);

    let composition = session
        .compose("love", Some(GenerationTask::Chat))
        .expect("compose");
    let roles = composition
        .context
        .blocks
        .iter()
        .map(|block| block.role)
        .collect::<Vec<_>>();
    assert_eq!(&roles[..2], &[BlockRole::Persona, BlockRole::Task]);
    assert_eq!(composition.context.record_blocks().count(), 3);
    assert_eq!(composition.records.len(), 3);
    assert!(composition.context.blocks[0].text.starts_with("You are Nova."));
    assert!(composition.context.blocks[1].text.contains("Keep replies short."));
}

#[test]
fn compose_with_tight_budget_drops_records() {
    let temp = tempdir().expect("tempdir");
    let persona_cost =
        persona_block(open(temp.path(), 6000).persona()).cost(BudgetUnit::Chars);
    let session = open(temp.path(), persona_cost);
    seed(&session);

    let composition = session.compose("love", None).expect("compose");
    assert_eq!(composition.context.blocks.len(), 1);
    assert_eq!(composition.context.dropped, 3);
    assert_eq!(composition.context.used, persona_cost);
    assert_eq!(composition.context.render().chars().count(), persona_cost);
}

#[tokio::test]
async fn generate_passes_assembled_context() {
    let temp = tempdir().expect("tempdir");
    let (generator, seen) = RecordingGenerator::new("new verse");
    let session = open(temp.path(), 6000).with_generator(Arc::new(generator));
    seed(&session);

    let output = session
        .generate("velvet", GenerationTask::Song)
        .await
        .expect("generate");
    assert_eq!(output, "new verse");

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].blocks[1].role, BlockRole::Task);
    assert!(seen[0].used <= seen[0].budget.limit);
    assert!(seen[0].render().chars().count() <= seen[0].budget.limit);
}

#[tokio::test]
async fn generate_without_generator_is_unavailable() {
    let temp = tempdir().expect("tempdir");
    let session = open(temp.path(), 6000);
    let err = session
        .generate("love", GenerationTask::Chat)
        .await
        .expect_err("unavailable");
    assert!(matches!(
        err,
        CoreError::Collaborator(CollaboratorError::Unavailable(_))
    ));
}

#[tokio::test]
async fn generator_failures_propagate() {
    let temp = tempdir().expect("tempdir");
    let session = open(temp.path(), 6000).with_generator(Arc::new(FailingGenerator));
    let err = session
        .generate("love", GenerationTask::Post)
        .await
        .expect_err("failed");
    assert!(matches!(
        err,
        CoreError::Collaborator(CollaboratorError::Failed(_))
    ));
}

#[tokio::test]
async fn publish_hands_text_to_publisher() {
    let temp = tempdir().expect("tempdir");
    let (publisher, posts) = RecordingPublisher::new();
    let session = open(temp.path(), 6000)
        .with_generator(Arc::new(FixedGenerator::new("out now")))
        .with_publisher(Arc::new(publisher));

    let text = session
        .generate("love", GenerationTask::Post)
        .await
        .expect("generate");
    let post_id = session.publish(&text).await.expect("publish");
    assert_eq!(post_id, "post-1");
    assert_eq!(posts.lock().as_slice(), &["out now".to_string()]);

    let err = session.publish("   ").await.expect_err("empty");
    assert!(matches!(
        err,
        CoreError::Collaborator(CollaboratorError::Rejected(_))
    ));
    assert_eq!(posts.lock().len(), 1);
}

#[tokio::test]
async fn publisher_rejection_propagates() {
    let temp = tempdir().expect("tempdir");
    let session = open(temp.path(), 6000).with_publisher(Arc::new(RejectingPublisher));
    let err = session.publish("hello").await.expect_err("rejected");
    assert!(matches!(
        err,
        CoreError::Collaborator(CollaboratorError::Rejected(_))
    ));
}

#[test]
fn ingest_dir_infers_kind_and_reports_failures() {
    let temp = tempdir().expect("tempdir");
    let session = open(temp.path(), 6000);
    let corpus = temp.path().join("corpus");
    fs::create_dir_all(corpus.join("songs")).expect("songs");
    fs::create_dir_all(corpus.join("feedback")).expect("feedback");
    fs::write(
        corpus.join("songs/porch-light.md"),
        "---\ntitle: Porch Light\ngenre: folk-pop\n---\nlove songs on the porch at dusk\n",
    )
    .expect("song");
    fs::write(
        corpus.join("feedback/velvet.md"),
        "---\ntitle: Velvet\nsource: fan mail\n---\nthe love in velvet feels honest\n",
    )
    .expect("feedback");
    fs::write(corpus.join("songs/untitled.md"), "no frontmatter here\n").expect("bad");
    fs::write(corpus.join("songs/cover.png"), "not text").expect("skip");

    let report = session.ingest_dir(&corpus).expect("ingest");
    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].path.ends_with("untitled.md"));

    let stats = session.stats();
    assert_eq!(stats.total_records, 2);
    assert_eq!(stats.indexed, 2);
    assert_eq!(stats.by_kind.get(&RecordKind::Song), Some(&1));
    assert_eq!(stats.by_kind.get(&RecordKind::Feedback), Some(&1));
}

#[test]
fn ingest_dir_missing_root_is_an_error() {
    let temp = tempdir().expect("tempdir");
    let session = open(temp.path(), 6000);
    assert!(session.ingest_dir(temp.path().join("missing")).is_err());
}
