pub mod audio_store;
pub mod email;
pub mod llm;
pub mod project;
pub mod scrape;
pub mod segment;
pub mod store;
pub mod tts;

// Re-export commonly used types for convenience
pub use audio_store::{AudioStore, AudioStoreError, audio_hash, audio_key};
pub use email::{EmailError, EmailService, EmailTokenSigner, TokenError};
pub use llm::{Critique, LlmError, OpenAiScriptWriter, ScriptRequest, ScriptWriter};
pub use project::{Project, ProjectService, Segment, SegmentCondition, Tone};
pub use scrape::{PageCopy, PageScraper, ScrapeError};
pub use segment::{SelectionReason, VisitorContext, select_playable_segment, select_segment};
pub use store::{DocumentStore, FirestoreStore, MemoryStore, StoreError};
pub use tts::{DEFAULT_VOICE_ID, ElevenLabsTTS, SpeechSynthesizer, TTSError, VoiceCatalog};
