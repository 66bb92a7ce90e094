pub mod batch_processor;
pub mod participants;
pub mod roster;
pub mod round_robin;

pub use batch_processor::{BatchOutcome, BatchProcessor, BatchResult};
pub use participants::{Participant, ParticipantReply};
pub use roster::{AgentRoster, RosterFactory};
pub use round_robin::{RoundRobinSession, SessionOutcome, SessionTranscript};
