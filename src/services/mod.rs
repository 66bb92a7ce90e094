pub mod annotation_client;
pub mod csv_sink;
pub mod human_input;
pub mod prompt_builder;
pub mod response_parser;

pub use annotation_client::{AnnotationClient, CallOutcome};
pub use csv_sink::AnnotationSink;
pub use human_input::{AutoReply, HumanInput, StdinInput};
pub use prompt_builder::BatchPromptBuilder;
pub use response_parser::{parse_response, ParsedFragment};
