use std::sync::Arc;

use anyhow::Context;

use fraudcheck::config::{self, Command, GenerateArgs, ScoreArgs};
use fraudcheck::message::Submission;
use fraudcheck::{FeatureEncoder, Scorer, Vocabularies, json_faker, load_model, logging, reader, reporter, scorer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::config();
    logging::init(config.verbose);
    tracing::info!("fraudcheck v{}", env!("CARGO_PKG_VERSION"));

    match config.command {
        Command::Score(args) => score(args, config.verbose).await,
        Command::Generate(args) => generate(args),
    }
}

async fn score(args: ScoreArgs, verbose: bool) -> anyhow::Result<()> {
    // vocabularies, schema and model are fixed for the life of the process
    let schema = args.schema.form_schema()?;
    let vocab = Arc::new(Vocabularies::fitted());
    let model = load_model(&args.model).context("classifier is required to score")?;
    let encoder = FeatureEncoder::new(vocab, schema);
    let scorer = Scorer::new(encoder, Arc::new(model), args.extra_feature_policy())
        .context("form schema is incompatible with the classifier")?;

    let (submission_tx, submission_rx) = tokio::sync::mpsc::channel::<Submission>(32);
    let (record_tx, record_rx) = tokio::sync::mpsc::channel(32);

    let scorer_task = tokio::spawn(scorer::run_scorer(Arc::new(scorer), submission_rx, record_tx, verbose));
    let reporter_task = tokio::spawn(reporter::run_reporter(record_rx, args.json));

    let read = reader::stream_submissions(&args.file_path, submission_tx).await?;
    let scored = scorer_task.await??;
    let summary = reporter_task.await??;
    tracing::info!(read, scored, rejected = summary.rejected, "done");
    Ok(())
}

fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let schema = args.schema.form_schema()?;
    json_faker::write_fake_submissions_jsonl(&args.file_path, args.count, &schema)?;
    tracing::info!(path = %args.file_path.display(), count = args.count, "wrote fake submissions");
    Ok(())
}
