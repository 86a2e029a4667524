use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::features::ExtraFeaturePolicy;
use crate::schema::FormSchema;

/// Score healthcare claim submissions for likely fraud.
#[derive(Debug, Clone, Parser)]
#[command(name = "fraudcheck", version)]
pub struct Config {
    /// Enable detailed logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Score every submission in a JSONL file
    Score(ScoreArgs),
    /// Write random valid submissions to a JSONL file
    Generate(GenerateArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    /// Built-in form schema: basic, extended or full
    #[arg(long, default_value = "basic", conflicts_with = "schema")]
    pub preset: String,

    /// Form schema JSON file
    #[arg(long)]
    pub schema: Option<PathBuf>,
}

impl SchemaArgs {
    pub fn form_schema(&self) -> anyhow::Result<FormSchema> {
        match &self.schema {
            Some(path) => FormSchema::from_json_file(path),
            None => FormSchema::preset(&self.preset)
                .with_context(|| format!("unknown form schema preset {:?}", self.preset)),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ScoreArgs {
    /// JSONL file with one submission per line
    pub file_path: PathBuf,

    /// Serialized classifier (random forest JSON)
    #[arg(short, long)]
    pub model: PathBuf,

    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Drop features the classifier does not know instead of failing
    #[arg(long)]
    pub drop_extra_features: bool,

    /// Print one JSON record per submission instead of the table
    #[arg(long)]
    pub json: bool,
}

impl ScoreArgs {
    pub fn extra_feature_policy(&self) -> ExtraFeaturePolicy {
        if self.drop_extra_features {
            ExtraFeaturePolicy::Drop
        } else {
            ExtraFeaturePolicy::Reject
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Output JSONL path
    pub file_path: PathBuf,

    /// Number of submissions
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: usize,

    #[command(flatten)]
    pub schema: SchemaArgs,
}

/// Parse command line arguments to create application configuration
pub fn config() -> Config {
    Config::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score() {
        let config = Config::try_parse_from([
            "fraudcheck",
            "score",
            "claims.jsonl",
            "--model",
            "forest.json",
            "--preset",
            "full",
            "--drop-extra-features",
            "-v",
        ])
        .unwrap();
        assert!(config.verbose);
        match config.command {
            Command::Score(args) => {
                assert_eq!(args.file_path, PathBuf::from("claims.jsonl"));
                assert_eq!(args.model, PathBuf::from("forest.json"));
                assert_eq!(args.schema.form_schema().unwrap(), FormSchema::full());
                assert_eq!(args.extra_feature_policy(), ExtraFeaturePolicy::Drop);
                assert!(!args.json);
            }
            other => panic!("expected score command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_generate_defaults() {
        let config = Config::try_parse_from(["fraudcheck", "generate", "out.jsonl"]).unwrap();
        assert!(!config.verbose);
        match config.command {
            Command::Generate(args) => {
                assert_eq!(args.count, 10);
                assert_eq!(args.schema.form_schema().unwrap(), FormSchema::basic());
            }
            other => panic!("expected generate command, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_preset() {
        let config = Config::try_parse_from([
            "fraudcheck", "generate", "out.jsonl", "--preset", "deluxe",
        ])
        .unwrap();
        let Command::Generate(args) = config.command else {
            panic!("expected generate command");
        };
        assert!(args.schema.form_schema().is_err());
    }

    #[test]
    fn test_score_requires_model() {
        assert!(Config::try_parse_from(["fraudcheck", "score", "claims.jsonl"]).is_err());
    }
}
