use presentation::cli::{execute, Action};
use tests::{fake_context, reopen, FakeContext, FakeEmbeddings, FakeModel};

async fn run(context: &FakeContext, action: Action) -> String {
    let mut out = Vec::new();
    execute(context, action, &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn asking_twice_hits_the_cache() {
    let question = "what's the difference between a duck";
    let (_dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::streaming("one quacks"));

    let first = run(&context, Action::Ask(question.into())).await;
    assert!(first.contains(question));
    assert!(first.contains("cache miss; asking fake-model"));
    assert!(first.contains("one quacks"));
    assert_eq!(context.model().calls(), 1);

    let second = run(&context, Action::Ask(question.into())).await;
    assert!(second.contains(question));
    assert!(second.contains("Cached Answer 1"));
    assert!(second.contains("one quacks"));
    assert!(second.contains("questioncache send"));
    assert_eq!(context.model().calls(), 1);
}

#[tokio::test]
async fn ask_remembers_the_question_for_last() {
    let (_dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::answering("a"));
    run(&context, Action::Ask("why is the sky blue".into())).await;

    let out = run(&context, Action::Last).await;
    assert_eq!(out, "why is the sky blue\n");
}

#[tokio::test]
async fn send_forces_a_fuzzy_hit_through_to_the_model() {
    let (dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::answering("dogs bark"));
    context.questions().unwrap().record("ducks vs dogs", "ducks quack").await.unwrap();

    // An anagram is a fuzzy hit but not an exact one.
    let ask = run(&context, Action::Ask("dogs vs ducks".into())).await;
    assert!(ask.contains("Cached Answer 1"));
    assert_eq!(context.model().calls(), 0);
    context.close().unwrap();

    let context = reopen(&dir, FakeEmbeddings::default(), FakeModel::answering("dogs bark"));
    let send = run(&context, Action::Send).await;
    assert!(send.contains("Posing question to fake-model..."));
    assert!(send.contains("dogs bark"));
    assert_eq!(context.model().calls(), 1);

    let again = run(&context, Action::Send).await;
    assert!(again.contains("Already Sent"));
    assert!(again.contains("dogs bark"));
    assert_eq!(context.model().calls(), 1);
}

#[tokio::test]
async fn send_without_history_says_so() {
    let (_dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::answering("a"));
    let out = run(&context, Action::Send).await;
    assert!(out.contains("You haven't asked any questions yet"));
    assert_eq!(context.model().calls(), 0);
}

#[tokio::test]
async fn last_without_history_says_so() {
    let (_dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::answering("a"));
    let out = run(&context, Action::Last).await;
    assert!(out.contains("You haven't asked any questions yet"));
}

#[tokio::test]
async fn import_then_ask_uses_imported_answer() {
    let (_dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::answering("live"));
    let payload = serde_json::json!([
        {"question": "ducks vs dogs", "answer": "ducks quack"},
        {"question": "cats vs mice", "answer": "cats chase"}
    ])
    .to_string();

    let out = run(&context, Action::Import(payload)).await;
    assert!(out.contains("Importing 2 answers... done (2 new)"));

    let ask = run(&context, Action::Ask("ducks vs dogs".into())).await;
    assert!(ask.contains("ducks quack"));
    assert_eq!(context.model().calls(), 0);
}

#[tokio::test]
async fn malformed_import_is_an_error() {
    let (_dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::answering("a"));
    let mut out = Vec::new();
    let err = execute(&context, Action::Import(r#"[{"question":"a"}]"#.into()), &mut out)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing field 'answer'"));
    assert!(context.questions().unwrap().is_empty().unwrap());
}

#[tokio::test]
async fn clearcache_with_yes_empties_the_store() {
    let (_dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::answering("a"));
    context.questions().unwrap().record("q", "a").await.unwrap();

    let out = run(&context, Action::ClearCache { assume_yes: true }).await;
    assert!(out.contains("Cache cleared (1 answers removed)"));
    assert!(context.questions().unwrap().search_exact("q").unwrap().is_none());
}

#[tokio::test]
async fn clearcache_works_after_switching_embedding_models() {
    let (dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::answering("a"));
    context.questions().unwrap().record("q", "a").await.unwrap();
    context.close().unwrap();

    let switched = reopen(&dir, FakeEmbeddings::with_model_id("other-embed"), FakeModel::answering("a"));
    let err = switched.questions().err().unwrap();
    assert!(err.to_string().contains("clear the cache"));

    let out = run(&switched, Action::ClearCache { assume_yes: true }).await;
    assert!(out.contains("Cache cleared (1 answers removed)"));

    let cache = switched.questions().unwrap();
    assert!(cache.is_empty().unwrap());
    cache.record("q", "b").await.unwrap();
    assert_eq!(cache.search_exact("q").unwrap().unwrap().answer, "b");
}

#[tokio::test]
async fn db_prints_the_store_path() {
    let (dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::answering("a"));
    let out = run(&context, Action::Db).await;
    assert_eq!(
        out.trim(),
        dir.path().join("questioncache.sqlite3").display().to_string()
    );
}

#[tokio::test]
async fn model_failure_surfaces_from_ask() {
    let (_dir, context) = fake_context(FakeEmbeddings::default(), FakeModel::failing());
    let mut out = Vec::new();
    let result = execute(&context, Action::Ask("anything".into()), &mut out).await;
    assert!(result.is_err());
    assert_eq!(context.last_question().load().unwrap().as_deref(), Some("anything"));
}
