pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod invoker;
pub mod json_faker;
pub mod logging;
pub mod message;
pub mod model;
pub mod reader;
pub mod reporter;
pub mod schema;
pub mod scorer;
pub mod vocab;

pub use encoder::FeatureEncoder;
pub use error::FraudError;
pub use features::{CanonicalFeatureVector, ExtraFeaturePolicy, reconcile};
pub use invoker::{InferenceInvoker, Label, PredictionResult};
pub use model::{Classifier, ForestModel, load_model};
pub use schema::{FormSchema, RawClaimInput};
pub use scorer::Scorer;
pub use vocab::Vocabularies;
