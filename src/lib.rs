/// veritext: ontology-driven compliance verification for LLM output
///
/// The pipeline runs per request in four strictly sequenced phases:
/// extraction (pattern/keyword extractors over the text), built-in
/// derivations, computed-field settlement (a small formula DSL with
/// load-time dependency ordering), and constraint evaluation producing a
/// verdict plus violations with citations.

pub mod config;
pub mod derive;
pub mod errors;
pub mod extract;
pub mod facts;
pub mod formula;
pub mod logging;
pub mod ontology;
pub mod server;
pub mod verify;

pub use errors::VeritextError;
pub use facts::{ExtractionRecord, Fact, Facts, Value};
pub use ontology::{Constraint, Extractor, Ontology};
pub use verify::{VerificationOutcome, Violation};
